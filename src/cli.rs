#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliVerb {
    Help,
    Runs,
    New { brief: String },
    Status { run_id: String },
    Export { run_id: String, dir: Option<String> },
    Diagram { run_id: String, kind: String },
    View { run_id: String },
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "usage: specboard <command> [args]".to_string(),
        "  runs                           list pipeline runs".to_string(),
        "  new <brief...>                 start a run from a project brief".to_string(),
        "  status <run-id>                show run status and current stage".to_string(),
        "  export <run-id> [dir]          export classified sections to JSON files".to_string(),
        "  diagram <run-id> <er|sequence> fetch a generated diagram artifact".to_string(),
        "  view <run-id>                  open the interactive review console".to_string(),
        "  help                           show this message".to_string(),
    ]
}

pub fn parse_cli_verb(args: &[String]) -> Result<CliVerb, String> {
    let Some(verb) = args.first() else {
        return Ok(CliVerb::Help);
    };
    match verb.as_str() {
        "help" | "--help" | "-h" => Ok(CliVerb::Help),
        "runs" => Ok(CliVerb::Runs),
        "new" => {
            let brief = args[1..].join(" ").trim().to_string();
            if brief.is_empty() {
                return Err("usage: specboard new <brief...>".to_string());
            }
            Ok(CliVerb::New { brief })
        }
        "status" => match args.get(1) {
            Some(run_id) => Ok(CliVerb::Status {
                run_id: run_id.clone(),
            }),
            None => Err("usage: specboard status <run-id>".to_string()),
        },
        "export" => match args.get(1) {
            Some(run_id) => Ok(CliVerb::Export {
                run_id: run_id.clone(),
                dir: args.get(2).cloned(),
            }),
            None => Err("usage: specboard export <run-id> [dir]".to_string()),
        },
        "diagram" => match (args.get(1), args.get(2)) {
            (Some(run_id), Some(kind)) => Ok(CliVerb::Diagram {
                run_id: run_id.clone(),
                kind: kind.clone(),
            }),
            _ => Err("usage: specboard diagram <run-id> <er|sequence>".to_string()),
        },
        "view" => match args.get(1) {
            Some(run_id) => Ok(CliVerb::View {
                run_id: run_id.clone(),
            }),
            None => Err("usage: specboard view <run-id>".to_string()),
        },
        unknown => Err(format!(
            "unknown command `{unknown}`; run `specboard help` for usage"
        )),
    }
}
