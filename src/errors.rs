// Error taxonomy
//
// Typed errors for the places where callers branch on the failure kind.
// Plumbing (HTTP bodies, file I/O, config loading) stays on anyhow.

use thiserror::Error;

use crate::config::{ModelRole, ProviderKind};

/// Failure to turn a role into a usable model handle.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Provider or model name missing for the role.
    #[error("Configuration for '{role}' model ({provider_var}, {model_var}) is incomplete")]
    Configuration {
        role: ModelRole,
        provider_var: &'static str,
        model_var: &'static str,
    },

    #[error("Unsupported model provider for '{role}': {provider}")]
    UnsupportedProvider { role: ModelRole, provider: String },

    #[error("'{key_var}' is required for provider '{provider}' ('{role}' model) but is not set")]
    MissingCredential {
        role: ModelRole,
        provider: ProviderKind,
        key_var: &'static str,
    },

    #[error("Failed to initialize '{role}' model from provider '{provider}': {source}")]
    Construction {
        role: ModelRole,
        provider: ProviderKind,
        #[source]
        source: anyhow::Error,
    },

    /// Neither main nor spare could be resolved.
    #[error("Could not initialize any model: main: {main}; spare: {spare}")]
    NoModelAvailable {
        main: Box<RouterError>,
        spare: Box<RouterError>,
    },
}

impl RouterError {
    pub fn role(&self) -> Option<ModelRole> {
        match self {
            Self::Configuration { role, .. }
            | Self::UnsupportedProvider { role, .. }
            | Self::MissingCredential { role, .. }
            | Self::Construction { role, .. } => Some(*role),
            Self::NoModelAvailable { .. } => None,
        }
    }
}

/// Per-attempt failure inside a generate step.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The model answered but the answer is not a well-formed artifact.
    #[error("Malformed {kind} response: {detail}")]
    MalformedResponse { kind: &'static str, detail: String },

    /// The model could not be reached (after provider-level retries and fallbacks).
    #[error("Model invocation failed: {0:#}")]
    Model(#[source] anyhow::Error),
}

impl WorkflowError {
    pub fn malformed(kind: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}

/// A run aborted before reaching ACCEPTED or EXHAUSTED.
#[derive(Debug, Error)]
#[error("Retry loop aborted at attempt {attempt}: {source}")]
pub struct LoopError {
    pub attempt: usize,
    #[source]
    pub source: WorkflowError,
}

/// Downstream media side-effect failures.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request to {service} failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} task failed with status {status}: {message}")]
    TaskFailed {
        service: &'static str,
        status: String,
        message: String,
    },

    #[error("{service} task did not finish after {attempts} polls")]
    PollTimeout { service: &'static str, attempts: u32 },

    #[error("Record is missing field '{0}'")]
    MissingField(&'static str),

    #[error("{service} produced no files")]
    NoOutput { service: &'static str },

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}
