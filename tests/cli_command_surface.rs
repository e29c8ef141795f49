use specboard::cli::{cli_help_lines, parse_cli_verb, CliVerb};
use specboard::commands::run_cli;

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn help_covers_every_verb() {
    let help = cli_help_lines().join("\n");
    for verb in ["runs", "new", "status", "export", "diagram", "view", "help"] {
        assert!(help.contains(verb), "help missing verb {verb}");
    }
}

#[test]
fn verb_parsing_accepts_the_documented_surface() {
    assert_eq!(parse_cli_verb(&args(&["help"])), Ok(CliVerb::Help));
    assert_eq!(
        parse_cli_verb(&args(&["view", "run-1"])),
        Ok(CliVerb::View {
            run_id: "run-1".to_string()
        })
    );
    assert_eq!(
        parse_cli_verb(&args(&["diagram", "run-1", "er"])),
        Ok(CliVerb::Diagram {
            run_id: "run-1".to_string(),
            kind: "er".to_string()
        })
    );
    assert_eq!(
        parse_cli_verb(&args(&["new", "a", "short", "brief"])),
        Ok(CliVerb::New {
            brief: "a short brief".to_string()
        })
    );
}

#[test]
fn engine_returns_help_text_without_touching_the_network() {
    let output = run_cli(args(&["help"])).expect("help output");
    assert!(output.contains("usage: specboard"));
    let output = run_cli(args(&[])).expect("default to help");
    assert!(output.contains("usage: specboard"));
}

#[test]
fn unknown_and_incomplete_commands_fail_with_usage_messages() {
    assert!(run_cli(args(&["bogus"]))
        .expect_err("unknown verb")
        .contains("unknown command"));
    assert!(run_cli(args(&["export"]))
        .expect_err("missing run id")
        .contains("usage:"));
    assert!(parse_cli_verb(&args(&["new"])).is_err());
}
