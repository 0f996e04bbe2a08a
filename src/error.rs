//! Error taxonomy for change pack generation.

use crate::types::AgentRole;
use thiserror::Error;

/// Result type alias for change pack operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing credentials, invalid repo path, unreadable context file
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A git command failed or the path is not a repository
    #[error("Git error: {0}")]
    Git(String),

    /// Network failure or non-2xx status from the model endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// Model output is not JSON after unwrapping code fences
    #[error("Response format error: {0}")]
    ResponseFormat(String),

    /// Model output parsed but does not match the expected shape
    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    /// An agent invocation failed; the run was aborted
    #[error("{role} agent failed: {source}")]
    Agent {
        role: AgentRole,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    pub(crate) fn agent(role: AgentRole, source: Error) -> Self {
        Error::Agent {
            role,
            source: Box::new(source),
        }
    }

    /// Short category name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Git(_) => "git",
            Error::Transport(_) => "transport",
            Error::ResponseFormat(_) => "response_format",
            Error::SchemaValidation(_) => "schema_validation",
            Error::Agent { source, .. } => source.kind(),
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Pattern(_) => "pattern",
        }
    }

    /// Role of the agent whose invocation aborted the run, if any.
    pub fn failed_role(&self) -> Option<AgentRole> {
        match self {
            Error::Agent { role, .. } => Some(*role),
            _ => None,
        }
    }
}
