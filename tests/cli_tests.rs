use std::fs;
use std::time::Duration;

use clap::Parser;
use formpilot::cli::config::{AppConfig, Cli, Commands, JobsConfig, RunConfig, load_config};

// =========================================================================
// Argument parsing
// =========================================================================

#[test]
fn apply_takes_url_and_profile() {
    let cli = Cli::parse_from([
        "formpilot",
        "apply",
        "--url",
        "https://jobs.example.com/posting/1",
        "--profile",
        "ada.json",
        "-vv",
    ]);
    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Apply { url, profile, verifier_dir } => {
            assert_eq!(url, "https://jobs.example.com/posting/1");
            assert_eq!(profile.as_deref(), Some("ada.json"));
            assert_eq!(verifier_dir, None);
        }
        other => panic!("expected apply, got {:?}", other),
    }
}

#[test]
fn worker_flags() {
    let cli = Cli::parse_from(["formpilot", "--server", "http://jobs:9000", "worker", "--workers", "3", "--once"]);
    assert_eq!(cli.server.as_deref(), Some("http://jobs:9000"));
    match cli.command {
        Commands::Worker { workers, once } => {
            assert_eq!(workers, Some(3));
            assert!(once);
        }
        other => panic!("expected worker, got {:?}", other),
    }
}

#[test]
fn parse_defaults_url() {
    let cli = Cli::parse_from(["formpilot", "parse", "--snapshot", "page.html"]);
    match cli.command {
        Commands::Parse { snapshot, url } => {
            assert_eq!(snapshot, "page.html");
            assert_eq!(url, "about:blank");
        }
        other => panic!("expected parse, got {:?}", other),
    }
}

#[test]
fn apply_requires_url() {
    assert!(Cli::try_parse_from(["formpilot", "apply"]).is_err());
}

// =========================================================================
// Config file
// =========================================================================

#[test]
fn missing_config_gives_defaults() {
    let config = load_config(Some("/nonexistent/formpilot.yaml"));
    assert_eq!(config.run.max_iterations, 18);
    assert_eq!(config.jobs.workers, 1);
    assert!(config.browser.headless);
    assert_eq!(config.thresholds.select_all, 90);
    assert!(config.keywords.is_none());
}

#[test]
fn partial_config_keeps_other_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("formpilot.yaml");
    fs::write(
        &path,
        "run:\n  max_iterations: 5\n  profile: ada.json\njobs:\n  server: http://jobs:9000\nthresholds:\n  select_best: 70\n",
    )
    .expect("write config");

    let config = load_config(path.to_str());
    assert_eq!(config.run.max_iterations, 5);
    assert_eq!(config.run.max_minutes, 30);
    assert_eq!(config.run.profile.as_deref(), Some("ada.json"));
    assert_eq!(config.jobs.server, "http://jobs:9000");
    assert_eq!(config.jobs.poll_seconds, 60);
    assert_eq!(config.thresholds.select_best, 70);
    assert_eq!(config.thresholds.select_all, 90);
}

#[test]
fn malformed_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("formpilot.yaml");
    fs::write(&path, "run: [not, a, map").expect("write config");

    let config = load_config(path.to_str());
    assert_eq!(config.run.max_iterations, AppConfig::default().run.max_iterations);
}

#[test]
fn run_limits_from_config() {
    let run = RunConfig { max_iterations: 7, max_minutes: 2, max_form_depth: 3, ..RunConfig::default() };
    let limits = run.limits();
    assert_eq!(limits.max_iterations, 7);
    assert_eq!(limits.max_duration, Duration::from_secs(120));
    assert_eq!(limits.max_form_depth, 3);
}

#[test]
fn pool_options_prefer_cli_workers() {
    let jobs = JobsConfig { workers: 4, poll_seconds: 5, ..JobsConfig::default() };
    let options = jobs.pool(Some(2), true);
    assert_eq!(options.workers, 2);
    assert_eq!(options.poll_interval, Duration::from_secs(5));
    assert!(options.once);
    assert_eq!(jobs.pool(None, false).workers, 4);
}
