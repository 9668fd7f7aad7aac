use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FormError, FormResult};
use crate::oracle::oracle::Oracle;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "qwen2.5:1.5b";

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaOracle {
    pub endpoint: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaOracle {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> FormResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FormError::Http { context: "building oracle client".into(), source: e })?;
        Ok(Self { endpoint: endpoint.to_string(), model: model.to_string(), client })
    }

    fn generate(&self, prompt: &str) -> FormResult<String> {
        let request = OllamaRequest { model: &self.model, prompt, stream: false };
        debug!(model = %self.model, chars = prompt.len(), "oracle request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FormError::Http { context: format!("POST {}", self.endpoint), source: e })?;

        let body: OllamaResponse = response
            .json()
            .map_err(|e| FormError::Http { context: "oracle response body".into(), source: e })?;

        let answer = body.response.trim().to_string();
        if answer.is_empty() {
            return Err(FormError::Oracle("empty response".into()));
        }
        info!(answer = %answer, "oracle answered");
        Ok(answer)
    }
}

fn options_prompt(question: &str, options: &[String], multi_select: bool) -> String {
    let listed = options
        .iter()
        .map(|o| format!("- {}", o))
        .collect::<Vec<_>>()
        .join("\n");
    let instruction = if multi_select {
        "Pick every option that applies. Respond with the exact option texts, one per line."
    } else {
        "Pick the single best option. Respond with the exact option text only."
    };
    format!(
r#"You are filling out a job application on behalf of the applicant.

QUESTION:
{}

OPTIONS:
{}

{}"#,
        question, listed, instruction
    )
}

impl Oracle for OllamaOracle {
    fn resolve(&self, prompt: &str) -> FormResult<String> {
        self.generate(prompt)
    }

    fn resolve_options(&self, question: &str, options: &[String], multi_select: bool, top_k: usize)
    -> FormResult<String> {
        let shown: Vec<String> = options.iter().take(top_k).cloned().collect();
        self.generate(&options_prompt(question, &shown, multi_select))
    }
}
