use std::time::Duration;

use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::cli::config::AppConfig;
use crate::config::keywords::KeywordTables;
use crate::dom::document::Document;
use crate::error::{FormError, FormResult};
use crate::extract::context::SectionLimits;
use crate::extract::parser::PageParser;
use crate::jobs::{HttpJobQueue, run_pool};
use crate::navigation::{FileVerifier, Navigator, NoVerifier, RunReport, Verifier};
use crate::oracle::ollama::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::oracle::{OllamaOracle, Oracle};
use crate::profile::Profile;
use crate::resolve::AnswerEngine;
use crate::trace::TraceLogger;

/// Everything a job needs besides its browser.
pub struct Resources {
    pub config: AppConfig,
    pub tables: KeywordTables,
    pub profile: Profile,
    pub oracle: OllamaOracle,
    pub tracer: TraceLogger,
}

impl Resources {
    /// Load keyword tables and the profile, and connect the oracle. CLI
    /// values win over the config file.
    pub fn load(
        config: AppConfig,
        profile_path: Option<&str>,
        ollama_endpoint: Option<&str>,
        ollama_model: Option<&str>,
    ) -> FormResult<Self> {
        let tables = KeywordTables::load(config.keywords.as_deref())?;

        let profile_path = profile_path
            .or(config.run.profile.as_deref())
            .ok_or_else(|| FormError::Profile("no profile given (--profile or run.profile)".to_string()))?;
        let profile = Profile::load(profile_path)?;

        let endpoint = ollama_endpoint.or(config.ollama.endpoint.as_deref()).unwrap_or(DEFAULT_ENDPOINT);
        let model = ollama_model.or(config.ollama.model.as_deref()).unwrap_or(DEFAULT_MODEL);
        let oracle = OllamaOracle::new(endpoint, model, Duration::from_secs(config.ollama.timeout_seconds))?;

        let tracer = match &config.run.trace {
            Some(path) => TraceLogger::new(path),
            None => TraceLogger::disabled(),
        };
        Ok(Self { config, tables, profile, oracle, tracer })
    }

    /// Run one application in a fresh browser session.
    pub fn apply(&self, url: &str, verifier: &dyn Verifier) -> FormResult<RunReport> {
        let oracle: &dyn Oracle = &self.oracle;
        let engine = AnswerEngine::new(&self.tables, &self.config.thresholds, &self.profile, oracle);
        let mut navigator = Navigator::new(&engine, verifier, &self.tracer).with_limits(self.config.run.limits());

        let mut session = BrowserSession::launch(&self.config.browser.session_options())?;
        let result = navigator.run(&mut session, url);
        if let Err(e) = session.quit() {
            warn!(error = %e, "browser did not shut down cleanly");
        }
        result
    }
}

fn build_verifier(dir: Option<&str>) -> Box<dyn Verifier + Sync> {
    match dir {
        Some(dir) => Box::new(FileVerifier::new(dir)),
        None => Box::new(NoVerifier),
    }
}

// ============================================================================
// apply subcommand
// ============================================================================

pub fn cmd_apply(
    resources: &Resources,
    url: &str,
    verifier_dir: Option<&str>,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let verifier = build_verifier(verifier_dir.or(resources.config.run.verifier_dir.as_deref()));
    if verbose > 0 {
        eprintln!("Applying to {}...", url);
    }

    let report = resources.apply(url, verifier.as_ref())?;
    println!(
        "Submitted after {} iterations in {:.1}s",
        report.iterations,
        report.elapsed.as_secs_f64()
    );
    if verbose > 0 {
        println!("States: {:?}", report.states);
    }
    Ok(())
}

// ============================================================================
// worker subcommand
// ============================================================================

pub fn cmd_worker(
    resources: &Resources,
    server: Option<&str>,
    workers: Option<usize>,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = &resources.config.jobs;
    let server = server.unwrap_or(&jobs.server);
    let queue = HttpJobQueue::new(server, Duration::from_secs(jobs.timeout_seconds))?;
    let options = jobs.pool(workers, once);
    let verifier = build_verifier(resources.config.run.verifier_dir.as_deref());

    info!(server = queue.server(), workers = options.workers, "worker pool starting");
    let summary = run_pool(&queue, &options, |url| resources.apply(url, verifier.as_ref()).map(|_| ()));

    println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
    Ok(())
}

// ============================================================================
// parse subcommand
// ============================================================================

pub fn cmd_parse(config: &AppConfig, snapshot: &str, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let html = std::fs::read_to_string(snapshot)?;
    let tables = KeywordTables::load(config.keywords.as_deref())?;
    // Without a profile, repeated sections are kept uncapped.
    let limits = match &config.run.profile {
        Some(path) => Profile::load(path)?.limits(),
        None => SectionLimits { work_experience: usize::MAX, education: usize::MAX },
    };

    let parser = PageParser::new(&tables, &config.thresholds, limits);
    let model = parser.parse(&Document::parse(&html), url);
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}
