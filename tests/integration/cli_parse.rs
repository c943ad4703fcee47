use super::support::Fixture;
use clap::{CommandFactory, Parser};
use treemirror::strategy::ChangeKind;
use treemirror::tooling::cli::{Cli, CliContext, Commands, OutputFormat};

#[test]
fn parse_valid_command_matrix() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["treemirror", "run", "/src", "/dst"],
        vec!["treemirror", "run", "/src", "/dst", "--period", "30"],
        vec!["treemirror", "once", "/src", "/dst", "--format", "json"],
        vec!["treemirror", "once", "--identity", "content"],
        vec![
            "treemirror",
            "run",
            "/src",
            "/dst",
            "--change-detection",
            "modifiedhash",
            "--overlap",
            "skip",
            "--prune-unchanged",
        ],
        vec![
            "treemirror",
            "--log-file",
            "/tmp/logs/",
            "--log-output",
            "file",
            "run",
        ],
        vec!["treemirror", "run", "--config", "mirror.toml"],
    ];

    for args in cases {
        let parsed = Cli::try_parse_from(args.clone());
        assert!(parsed.is_ok(), "expected valid parse for args: {args:?}");
    }
}

#[test]
fn parse_rejects_unknown_strategy() {
    let parsed = Cli::try_parse_from([
        "treemirror",
        "once",
        "/src",
        "/dst",
        "--change-detection",
        "sha1",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn parse_legacy_strategy_names() {
    let cli = Cli::try_parse_from([
        "treemirror",
        "run",
        "--change-detection",
        "modifiedtime",
    ])
    .unwrap();
    assert_eq!(
        cli.command.mirror_args().change_detection,
        Some(ChangeKind::ModifiedTime)
    );
}

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn context_requires_roots() {
    let cli = Cli::try_parse_from(["treemirror", "once"]).unwrap();
    let err = CliContext::new(&cli).err().unwrap();
    assert!(err.to_string().contains("not set"));
}

#[test]
fn once_mirrors_and_renders_json() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "hello");
    let source = fx.source.to_string_lossy().into_owned();
    let replica = fx.replica.to_string_lossy().into_owned();

    let cli = Cli::try_parse_from([
        "treemirror",
        "once",
        source.as_str(),
        replica.as_str(),
        "--format",
        "json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Once {
            format: OutputFormat::Json,
            ..
        }
    ));

    let context = CliContext::new(&cli).unwrap();
    let outcome = context.execute(&cli.command).unwrap();
    assert!(outcome.success);

    let report: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
    assert_eq!(report["files_created"], 1);
    assert_eq!(report["failures"], 0);
    assert_eq!(fx.replica_content("a.txt").as_deref(), Some("hello"));
}
