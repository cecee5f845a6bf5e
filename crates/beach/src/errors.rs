use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::AdapterError;

/// Failures surfaced while executing a tool on behalf of the language model.
///
/// These are carried as values inside tool requests and tool results so the
/// model can read the error text on its next turn.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

impl From<AdapterError> for AgentError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotConfigured(what) => AgentError::Unavailable(what),
            other => AgentError::ExecutionError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Internal(format!("Could not serialize tool result: {}", err))
    }
}
