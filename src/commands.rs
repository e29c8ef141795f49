use crate::api::{DiagramKind, OrchestratorClient};
use crate::cli::{cli_help_lines, parse_cli_verb, CliVerb};
use crate::config::{default_state_root, load_settings, resolve_settings_path, Settings};
use crate::review::aggregate::write_section_export;
use crate::review::cache::ContentCache;
use crate::review::{group_sections, raw_json};
use crate::tui::run_review_tui;
use std::path::PathBuf;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let settings = load_cli_settings()?;
    match parse_cli_verb(&args)? {
        CliVerb::Help => Ok(cli_help_lines().join("\n")),
        CliVerb::Runs => cmd_runs(&settings),
        CliVerb::New { brief } => cmd_new(&settings, &brief),
        CliVerb::Status { run_id } => cmd_status(&settings, &run_id),
        CliVerb::Export { run_id, dir } => cmd_export(&settings, &run_id, dir),
        CliVerb::Diagram { run_id, kind } => cmd_diagram(&settings, &run_id, &kind),
        CliVerb::View { run_id } => {
            run_review_tui(&settings, &run_id)?;
            Ok(format!("closed review console for run {run_id}"))
        }
    }
}

fn load_cli_settings() -> Result<Settings, String> {
    let path = resolve_settings_path().map_err(|e| e.to_string())?;
    load_settings(&path).map_err(|e| e.to_string())
}

fn client_for(settings: &Settings) -> OrchestratorClient {
    OrchestratorClient::new(&settings.orchestrator_url)
}

fn cmd_runs(settings: &Settings) -> Result<String, String> {
    let runs = client_for(settings).list_runs().map_err(|e| e.to_string())?;
    if runs.is_empty() {
        return Ok("no runs yet".to_string());
    }
    let lines = runs
        .iter()
        .map(|run| {
            format!(
                "{}  [{}]  stage={}  {}",
                run.id, run.status, run.current_stage, run.created_at
            )
        })
        .collect::<Vec<_>>();
    Ok(lines.join("\n"))
}

fn cmd_new(settings: &Settings, brief: &str) -> Result<String, String> {
    let run = client_for(settings)
        .create_run(brief)
        .map_err(|e| e.to_string())?;
    Ok(format!("started run {} at stage {}", run.id, run.current_stage))
}

fn cmd_status(settings: &Settings, run_id: &str) -> Result<String, String> {
    let status = client_for(settings)
        .get_run_status(run_id)
        .map_err(|e| e.to_string())?;
    Ok(format!(
        "run {}: {} (stage {})",
        status.id, status.status, status.current_stage
    ))
}

// Scripted export works from list summaries only; full content is a property
// of an interactive viewing session, and this path never forces the fetches.
fn cmd_export(settings: &Settings, run_id: &str, dir: Option<String>) -> Result<String, String> {
    let artifacts = client_for(settings)
        .list_artifacts(run_id)
        .map_err(|e| e.to_string())?;
    if artifacts.is_empty() {
        return Ok(format!("run {run_id} has no artifacts to export"));
    }

    let target: PathBuf = match dir {
        Some(dir) => PathBuf::from(dir),
        None => match &settings.export_dir {
            Some(dir) => dir.join(run_id),
            None => default_state_root()
                .map_err(|e| e.to_string())?
                .join("exports")
                .join(run_id),
        },
    };

    let cache = ContentCache::new(run_id);
    let grouped = group_sections(&artifacts);
    let mut written = Vec::new();
    for (key, entries) in &grouped {
        let path = write_section_export(&target, *key, entries, &cache)
            .map_err(|e| e.to_string())?;
        written.push(format!("wrote {}", path.display()));
    }
    Ok(written.join("\n"))
}

fn cmd_diagram(settings: &Settings, run_id: &str, kind: &str) -> Result<String, String> {
    let kind = DiagramKind::parse(kind)?;
    let artifact = client_for(settings)
        .get_diagram(run_id, kind)
        .map_err(|e| e.to_string())?;
    Ok(format!(
        "{} {} by {}\n{}",
        artifact.id,
        artifact.artifact_type,
        artifact.agent,
        raw_json(&artifact.content)
    ))
}
