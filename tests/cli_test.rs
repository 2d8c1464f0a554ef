//! Tests for command dispatch against a temporary storage directory

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tempfile::TempDir;

use outliner::cli::args::Cli;
use outliner::cli::commands::run;
use outliner::cli::CliError;
use outliner::config::Settings;
use outliner::exitcode;
use outliner::infrastructure::di::ServiceContainer;
use outliner::infrastructure::traits::RealFileSystem;
use outliner::util::testing;

fn container(storage: &Path) -> ServiceContainer {
    testing::init_test_setup();
    let settings = Settings {
        storage_dir: storage.to_path_buf(),
        ..Settings::default()
    };
    ServiceContainer::with_deps(settings, Arc::new(RealFileSystem))
}

fn exec(container: &ServiceContainer, args: &[&str]) -> Result<String, CliError> {
    let cli = Cli::try_parse_from(std::iter::once("outliner").chain(args.iter().copied()))
        .expect("valid arguments");
    let mut out = Vec::new();
    run(&cli, container, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn given_added_and_attached_entries_when_show_then_prints_indented_tree() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());

    // Act
    exec(&container, &["add", "Root"]).unwrap();
    exec(&container, &["attach", "Root", "Entry 1"]).unwrap();
    exec(&container, &["attach", "Root", "Subentry 1", "--under", "Entry 1"]).unwrap();
    exec(&container, &["attach", "Root", "Entry 2"]).unwrap();
    let output = exec(&container, &["show", "Root"]).unwrap();

    // Assert
    assert_eq!(output, "Root\n\tEntry 1\n\t\tSubentry 1\n\tEntry 2\n");
}

#[test]
fn given_stored_tree_when_show_fancy_then_draws_branches() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());
    exec(&container, &["add", "Root"]).unwrap();
    exec(&container, &["attach", "Root", "A"]).unwrap();
    exec(&container, &["attach", "Root", "B"]).unwrap();

    let output = exec(&container, &["show", "Root", "--fancy"]).unwrap();

    assert_eq!(output, "Root\n├── A\n└── B\n");
}

#[test]
fn given_two_trees_when_list_then_prints_both() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());
    exec(&container, &["add", "One"]).unwrap();
    exec(&container, &["add", "Two"]).unwrap();

    let output = exec(&container, &["list"]).unwrap();

    let mut lines: Vec<_> = output.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["One", "Two"]);
}

#[test]
fn given_existing_title_when_add_then_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());
    exec(&container, &["add", "Root"]).unwrap();
    exec(&container, &["attach", "Root", "keep me"]).unwrap();

    let err = exec(&container, &["add", "Root"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
    let content = fs::read_to_string(temp.path().join("Root.json")).unwrap();
    assert!(content.contains("keep me"));
}

#[test]
fn given_unknown_title_when_show_then_invalid_args() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());

    let err = exec(&container, &["show", "Nope"]).unwrap_err();

    assert!(matches!(err, CliError::InvalidArgs(_)));
}

#[test]
fn given_malformed_file_when_list_then_data_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Bad.json"), r#"{"entries": []}"#).unwrap();
    let container = container(temp.path());

    let err = exec(&container, &["list"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::DATAERR);
}

#[test]
fn given_non_utf8_file_when_show_then_data_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Bad.json"), b"\xff\xfe").unwrap();
    let container = container(temp.path());

    let err = exec(&container, &["show", "Bad"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::DATAERR);
}

#[test]
fn given_external_file_when_import_then_saved_under_its_title() {
    let temp = TempDir::new().unwrap();
    let storage = temp.path().join("storage");
    let source = temp.path().join("export.json");
    fs::write(
        &source,
        r#"{"title": "Trip", "entries": [{"title": "Pack"}, {"title": "Go"}]}"#,
    )
    .unwrap();
    let container = container(&storage);

    exec(&container, &["import", source.to_str().unwrap()]).unwrap();
    let output = exec(&container, &["show", "Trip"]).unwrap();

    assert_eq!(output, "Trip\n\tPack\n\tGo\n");
}

#[test]
fn given_missing_under_target_when_attach_then_invalid_args() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());
    exec(&container, &["add", "Root"]).unwrap();

    let err = exec(&container, &["attach", "Root", "x", "--under", "ghost"]).unwrap_err();

    assert!(matches!(err, CliError::InvalidArgs(_)));
}

#[test]
fn given_no_command_when_run_then_usage_error() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());

    let err = exec(&container, &[]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[test]
fn given_info_when_run_then_prints_settings_toml() {
    let temp = TempDir::new().unwrap();
    let container = container(temp.path());

    let output = exec(&container, &["info"]).unwrap();

    assert!(output.contains("json_indent = 4"));
    assert!(output.contains("load_policy = \"fail-fast\""));
}

#[test]
fn given_global_flags_when_parsing_then_accepted_after_subcommand() {
    let cli = Cli::try_parse_from(["outliner", "list", "-C", "/tmp/x", "--skip-malformed", "-dd"])
        .unwrap();
    assert_eq!(cli.storage_dir.as_deref(), Some(Path::new("/tmp/x")));
    assert!(cli.skip_malformed);
    assert_eq!(cli.debug, 2);
}
