use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::SessionOptions;
use crate::config::thresholds::Thresholds;
use crate::jobs::PoolOptions;
use crate::navigation::RunLimits;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "formpilot",
    version,
    about = "Fills out and submits online job applications"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: formpilot.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Job server base URL
    #[arg(long, global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply to a single job posting
    Apply {
        /// Job posting URL
        #[arg(long)]
        url: String,

        /// Applicant profile JSON
        #[arg(long)]
        profile: Option<String>,

        /// Directory an external mail fetcher drops code.txt / link.txt into
        #[arg(long)]
        verifier_dir: Option<String>,
    },

    /// Pull job URLs from the job server and apply to each
    Worker {
        /// Number of worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Exit once the queue is empty instead of polling
        #[arg(long, default_value_t = false)]
        once: bool,
    },

    /// Print the page model of a saved HTML snapshot as JSON
    Parse {
        /// Path to the HTML file
        #[arg(long)]
        snapshot: String,

        /// URL recorded as the page's address
        #[arg(long, default_value = "about:blank")]
        url: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `formpilot.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Keyword tables replacing the built-in ones.
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_max_minutes")]
    pub max_minutes: u64,

    #[serde(default = "default_max_form_depth")]
    pub max_form_depth: usize,

    /// Default applicant profile.
    pub profile: Option<String>,

    pub verifier_dir: Option<String>,

    /// JSONL trace output; no tracing when unset.
    pub trace: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_minutes: default_max_minutes(),
            max_form_depth: default_max_form_depth(),
            profile: None,
            verifier_dir: None,
            trace: None,
        }
    }
}

impl RunConfig {
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            max_iterations: self.max_iterations,
            max_duration: Duration::from_secs(self.max_minutes * 60),
            max_form_depth: self.max_form_depth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            workers: default_workers(),
            poll_seconds: default_poll_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl JobsConfig {
    pub fn pool(&self, workers: Option<usize>, once: bool) -> PoolOptions {
        PoolOptions {
            workers: workers.unwrap_or(self.workers),
            poll_interval: Duration::from_secs(self.poll_seconds),
            once,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,

    #[serde(default = "default_oracle_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { endpoint: None, model: None, timeout_seconds: default_oracle_timeout() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_script")]
    pub script: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            script: default_script(),
            headless: true,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl BrowserConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            command: self.command.clone(),
            script: self.script.clone(),
            headless: self.headless,
            timeout: Duration::from_secs(self.timeout_seconds),
            ..SessionOptions::default()
        }
    }
}

// Serde default helpers
fn default_max_iterations() -> u32 { 18 }
fn default_max_minutes() -> u64 { 30 }
fn default_max_form_depth() -> usize { 4 }
fn default_server() -> String { "http://127.0.0.1:8080".to_string() }
fn default_workers() -> usize { 1 }
fn default_poll_seconds() -> u64 { 60 }
fn default_timeout_seconds() -> u64 { 10 }
fn default_oracle_timeout() -> u64 { 60 }
fn default_command() -> String { "node".to_string() }
fn default_script() -> String { "driver/browser_server.js".to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("formpilot.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}
