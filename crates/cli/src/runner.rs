//! Run pipeline.
//!
//! A run resolves a stored prompt version, renders it with the caller's
//! variables, dispatches it to a provider, and records the exchange:
//!
//! ```text
//! Resolving -> Rendering -> Dispatching -> Recording -> Done
//! ```
//!
//! Any failure before `Recording` aborts the run and nothing is written.
//! A failure while recording is not fatal: the response is still returned
//! together with a warning.

use promptvault_core::AppResult;
use promptvault_llm::{LlmRequest, ProviderRouter};
use promptvault_prompt::{parse_vars, render, Variables};
use promptvault_store::Store;
use serde::Serialize;
use std::fmt;

/// Sampling temperature used when the caller does not pick one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Resolving,
    Rendering,
    Dispatching,
    Recording,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Rendering => "rendering",
            Self::Dispatching => "dispatching",
            Self::Recording => "recording",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What to run and how.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub vault: String,
    pub prompt: String,
    pub provider: String,
    pub model: String,
    /// Raw variable string, in either accepted syntax.
    pub vars: String,
    /// Explicit version; latest when `None`.
    pub version: Option<u32>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl RunRequest {
    pub fn new(
        vault: impl Into<String>,
        prompt: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            vault: vault.into(),
            prompt: prompt.into(),
            provider: provider.into(),
            model: model.into(),
            vars: String::new(),
            version: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_vars(mut self, vars: impl Into<String>) -> Self {
        self.vars = vars.into();
        self
    }

    pub fn with_version(mut self, version: Option<u32>) -> Self {
        self.version = version;
        self
    }
}

/// A prompt version rendered and ready to dispatch.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub version_id: i64,
    pub version: u32,
    pub vars: Variables,
    pub rendered: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub rendered: String,
    pub response: String,
    pub version: u32,
    /// Ledger id, absent when recording failed.
    pub run_id: Option<i64>,
    /// Set when the run succeeded but could not be recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Parameters stored alongside each run.
#[derive(Debug, Serialize)]
struct RunParams<'a> {
    provider: &'a str,
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    vars: &'a Variables,
}

pub struct RunPipeline<'a> {
    store: &'a Store,
    router: &'a ProviderRouter,
}

impl<'a> RunPipeline<'a> {
    pub fn new(store: &'a Store, router: &'a ProviderRouter) -> Self {
        Self { store, router }
    }

    /// Resolve and render without contacting a provider.
    pub fn prepare(&self, request: &RunRequest) -> AppResult<PreparedRun> {
        enter(RunStage::Resolving, request);
        let prompts = self.store.prompts();
        let content = match request.version {
            Some(version) => prompts.content_at(&request.vault, &request.prompt, version)?,
            None => {
                let prompt = prompts.latest(&request.vault, &request.prompt)?;
                prompts.content_latest(prompt.id)?
            }
        };

        enter(RunStage::Rendering, request);
        let vars = parse_vars(&request.vars)?;
        let rendered = render(&content.content, &vars)?;

        Ok(PreparedRun {
            version_id: content.version_id,
            version: content.version,
            vars,
            rendered,
        })
    }

    /// Run a prompt end to end.
    pub async fn execute(&self, request: &RunRequest) -> AppResult<RunOutcome> {
        let prepared = self.prepare(request)?;

        enter(RunStage::Dispatching, request);
        let client = self.router.get(&request.provider)?;
        let mut llm_request = LlmRequest::new(prepared.rendered.clone(), &request.model)
            .with_temperature(request.temperature);
        if let Some(max_tokens) = request.max_tokens {
            llm_request = llm_request.with_max_tokens(max_tokens);
        }
        let response = client.complete(&llm_request).await?;

        enter(RunStage::Recording, request);
        let (run_id, warning) = match self.record(
            request,
            client.provider_name(),
            &prepared,
            &response.content,
        ) {
            Ok(id) => (Some(id), None),
            Err(e) => {
                tracing::warn!("Failed to record run: {}", e);
                (None, Some(format!("run was not recorded: {}", e)))
            }
        };

        enter(RunStage::Done, request);
        Ok(RunOutcome {
            rendered: prepared.rendered,
            response: response.content,
            version: prepared.version,
            run_id,
            warning,
        })
    }

    /// `provider` is the client's own name, so aliases are stored canonically.
    fn record(
        &self,
        request: &RunRequest,
        provider: &str,
        prepared: &PreparedRun,
        response: &str,
    ) -> AppResult<i64> {
        let params = RunParams {
            provider,
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            vars: &prepared.vars,
        };
        let params_json = serde_json::to_string(&params)?;

        let run = self
            .store
            .runs()
            .append(prepared.version_id, provider, &params_json, response)?;
        Ok(run.id)
    }
}

fn enter(stage: RunStage, request: &RunRequest) {
    tracing::debug!(
        stage = %stage,
        vault = %request.vault,
        prompt = %request.prompt,
        "Run stage"
    );
}
