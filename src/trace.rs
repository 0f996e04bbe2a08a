//! Append-only audit trail of agent calls and results.

use crate::error::{Error, Result};
use crate::redaction::Redactor;
use crate::types::AgentRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub const TRACE_FILE_NAME: &str = "agent-trace.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEventKind {
    Call,
    Result,
}

/// One line of `agent-trace.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,
    pub agent: AgentRole,
    pub event: TraceEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl TraceEvent {
    pub fn call(agent: AgentRole) -> Self {
        Self {
            ts: None,
            agent,
            event: TraceEventKind::Call,
            prompt: None,
            response: None,
        }
    }

    pub fn result(agent: AgentRole, response: impl Into<String>) -> Self {
        Self {
            ts: None,
            agent,
            event: TraceEventKind::Result,
            prompt: None,
            response: Some(response.into()),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Writes one JSON object per line to a run-scoped log. Single writer per run.
#[derive(Debug, Clone)]
pub struct TraceWriter {
    path: PathBuf,
    redactor: Redactor,
}

impl TraceWriter {
    pub fn new(path: impl Into<PathBuf>, redactor: Redactor) -> Self {
        Self {
            path: path.into(),
            redactor,
        }
    }

    /// Trace writer for the standard file name inside a run directory.
    pub fn in_run_dir(run_dir: &Path, redactor: Redactor) -> Self {
        Self::new(run_dir.join(TRACE_FILE_NAME), redactor)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, mut event: TraceEvent) -> Result<()> {
        if event.ts.is_none() {
            event.ts = Some(Utc::now());
        }
        event.prompt = event.prompt.map(|text| self.redactor.redact(&text));
        event.response = event.response.map(|text| self.redactor.redact(&text));

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(agent = %event.agent, event = ?event.event, "Trace event recorded");
        Ok(())
    }
}

/// Read a trace file back. Used by tests and diagnostics, never by the pipeline.
pub async fn read_trace(path: &Path) -> Result<Vec<TraceEvent>> {
    let content = tokio::fs::read_to_string(path).await?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<TraceEvent>(line).map_err(Error::from))
        .collect()
}
