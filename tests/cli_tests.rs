use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;
use pretty_assertions::assert_eq;
use seriorch::cli::commands::{cmd_build, cmd_inject, cmd_unravel};
use seriorch::cli::config::{
    Cli, Commands, Config, DbConfig, init_logging, load_config, log_level, resolve_config,
};
use seriorch::error::Error;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_init() {
    let cli = Cli::parse_from(["seriorch", "init"]);
    assert!(matches!(cli.command, Commands::Init));
    assert_eq!(cli.verbose, 0);
    assert_eq!(cli.config, None);
}

#[test]
fn cli_parse_unravel() {
    let cli = Cli::parse_from(["seriorch", "unravel", "data/data_scn.xml"]);
    match cli.command {
        Commands::Unravel { file, watch } => {
            assert_eq!(file, PathBuf::from("data/data_scn.xml"));
            assert!(!watch);
        }
        _ => panic!("Expected Unravel command"),
    }
}

#[test]
fn cli_parse_unravel_requires_file() {
    assert!(Cli::try_parse_from(["seriorch", "unravel"]).is_err());
}

#[test]
fn cli_parse_build_watch_with_global_flags() {
    let cli = Cli::parse_from(["seriorch", "build", "--watch", "-vv", "--config", "/tmp/c.yaml"]);
    match cli.command {
        Commands::Build { watch } => assert!(watch),
        _ => panic!("Expected Build command"),
    }
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
}

#[test]
fn cli_parse_inject_output() {
    let cli = Cli::parse_from(["seriorch", "inject", "-o", "update.sql"]);
    match cli.command {
        Commands::Inject { output } => assert_eq!(output, Some(PathBuf::from("update.sql"))),
        _ => panic!("Expected Inject command"),
    }
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["seriorch", "lint"]).is_err());
}

// ============================================================================
// Logging Tests
// ============================================================================

#[test]
fn log_level_follows_verbosity() {
    assert_eq!(log_level(0), LevelFilter::Warn);
    assert_eq!(log_level(1), LevelFilter::Info);
    assert_eq!(log_level(2), LevelFilter::Debug);
    assert_eq!(log_level(5), LevelFilter::Debug);
}

#[test]
fn second_logger_install_is_reported() {
    // only this test installs a logger in this binary
    init_logging(0).unwrap();
    assert!(matches!(init_logging(1).unwrap_err(), Error::Logger(_)));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.build_name, "build.xml");
    assert!(!config.keep_build);
    assert_eq!(config.surrounding_tag, "odoo");
    assert_eq!(config.default_destination, ".");
    assert!(!config.unravel_commit);
    assert!(config.git);
    assert!(!config.watch);
    assert_eq!(config.db, DbConfig::default());
}

#[test]
fn config_partial_yaml_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "keep_build: true\nsurrounding_tag: openerp\ndb:\n  host: db.local\n  port: 5433\n",
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert!(config.keep_build);
    assert_eq!(config.surrounding_tag, "openerp");
    assert_eq!(config.build_name, "build.xml");
    assert!(config.git);
    assert_eq!(
        config.db,
        DbConfig {
            host: Some("db.local".into()),
            port: Some(5433),
            user: None,
        }
    );
}

#[test]
fn config_empty_file_is_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "").unwrap();
    assert_eq!(load_config(Some(&path)).unwrap(), Config::default());
}

#[test]
fn config_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "keep_build: [not, a, bool]\n").unwrap();
    assert!(matches!(load_config(Some(&path)).unwrap_err(), Error::Yaml(_)));
}

#[test]
fn config_explicit_missing_file_is_an_error() {
    let err = load_config(Some(Path::new("/nonexistent/seriorch.yaml"))).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn manifest_config_overrides_user_config() {
    let dir = tempfile::tempdir().unwrap();
    let user = dir.path().join("user.yaml");
    std::fs::write(&user, "build_name: user.xml\nunravel_commit: true\n").unwrap();
    std::fs::write(
        dir.path().join("skeleton.yaml"),
        "prefix: p\nconfig:\n  build_name: project.xml\n  db:\n    user: odoo\n",
    )
    .unwrap();

    let config = resolve_config(Some(&user), dir.path()).unwrap();
    assert_eq!(config.build_name, "project.xml");
    assert!(config.unravel_commit);
    assert_eq!(config.db.user.as_deref(), Some("odoo"));
}

#[test]
fn manifest_config_must_be_a_mapping() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("skeleton.yaml"), "config: yes\n").unwrap();
    let err = Config::default().with_manifest_overrides(dir.path()).unwrap_err();
    assert!(matches!(err, Error::ManifestShape { .. }));
}

#[test]
fn no_manifest_means_no_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_manifest_overrides(dir.path()).unwrap();
    assert_eq!(config, Config::default());
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn commands_unravel_build_inject() {
    let project = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let data_file = data_dir.path().join("data_scn_stock.xml");
    std::fs::copy(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample.xml"),
        &data_file,
    )
    .unwrap();
    let config = Config {
        git: false,
        ..Config::default()
    };

    cmd_unravel(project.path(), &data_file, &config, false).unwrap();
    cmd_build(project.path(), &config, false).unwrap();
    assert!(data_file.is_file());

    let skeleton = project.path().join("skeleton.yaml");
    let manifest = std::fs::read_to_string(&skeleton).unwrap();
    std::fs::write(&skeleton, manifest.replacen("db: null", "db: stock", 1)).unwrap();

    let output = project.path().join("update.sql");
    cmd_inject(project.path(), &config, Some(&output)).unwrap();
    let script = std::fs::read_to_string(&output).unwrap();
    assert!(script.starts_with("\\connect stock "));
    assert!(script.ends_with("COMMIT;\n"));
}
