use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// Core types for the change pack agent system

/// The three agent roles driven by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Impact,
    Risk,
    Review,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Impact => "impact",
            AgentRole::Risk => "risk",
            AgentRole::Review => "review",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    ChangedFiles,
    DiffSnippet,
    UserContext,
    ReviewFeedback,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::ChangedFiles => "changed_files",
            EvidenceKind::DiffSnippet => "diff_snippet",
            EvidenceKind::UserContext => "user_context",
            EvidenceKind::ReviewFeedback => "review_feedback",
        }
    }
}

/// A typed, citable fact fed into a model prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Evidence {
    pub fn new(kind: EvidenceKind, value: impl Into<String>, note: Option<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            note,
        }
    }
}

/// Optional human-supplied metadata about the change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub environment: Option<String>,
    pub service_hints: Vec<String>,
    pub links: BTreeMap<String, String>,
}

impl UserContext {
    /// Blank strings count as absent.
    pub fn is_empty(&self) -> bool {
        !has_text(&self.title)
            && !has_text(&self.summary)
            && !has_text(&self.environment)
            && self.service_hints.is_empty()
            && self.links.is_empty()
    }

    /// CLI-level fields take precedence over whatever the context file said.
    /// Blank CLI values leave the file's values in place.
    pub fn with_overrides(mut self, title: Option<String>, summary: Option<String>) -> Self {
        if let Some(title) = title.filter(|s| !s.trim().is_empty()) {
            self.title = Some(title);
        }
        if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
            self.summary = Some(summary);
        }
        self
    }

    /// Build the context for one run from an optional YAML file plus CLI fields.
    ///
    /// A path that does not exist is ignored with a warning; a file that exists
    /// but does not parse is a configuration error.
    pub async fn from_optional_yaml(
        path: Option<&Path>,
        title: Option<String>,
        summary: Option<String>,
    ) -> Result<Self> {
        let base = match path {
            Some(path) if path.exists() => {
                debug!("Loading user context from: {:?}", path);
                let content = tokio::fs::read_to_string(path).await?;
                if content.trim().is_empty() {
                    UserContext::default()
                } else {
                    serde_yaml::from_str(&content).map_err(|e| {
                        Error::Configuration(format!(
                            "Failed to parse context file {}: {}",
                            path.display(),
                            e
                        ))
                    })?
                }
            }
            Some(path) => {
                warn!("Context file not found: {:?}. Ignoring.", path);
                UserContext::default()
            }
            None => UserContext::default(),
        };

        Ok(base.with_overrides(title, summary))
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub summary: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub change_types: Vec<String>,
    #[serde(default)]
    pub key_files: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub mitigations: Vec<String>,
    #[serde(default)]
    pub monitoring: Vec<String>,
    #[serde(default)]
    pub rollback: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Which upstream agent a reviewer issue should be sent back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteTo {
    Impact,
    Risk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub severity: Severity,
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    pub route_to: RouteTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pass,
    NeedsFix,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pass => f.write_str("PASS"),
            ReviewStatus::NeedsFix => f.write_str("NEEDS_FIX"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub status: ReviewStatus,
    #[serde(default)]
    pub issues: Vec<ReviewIssue>,
}

impl ReviewResult {
    pub fn passed(&self) -> bool {
        self.status == ReviewStatus::Pass
    }

    pub fn routes_to(&self, target: RouteTo) -> bool {
        self.issues.iter().any(|issue| issue.route_to == target)
    }
}

/// Test guidance derived from the repository layout, not from agent output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    #[serde(default)]
    pub recommended_commands: Vec<String>,
    #[serde(default)]
    pub evidence_available: Vec<String>,
    #[serde(default)]
    pub missing_evidence: Vec<String>,
}

/// How the reviewer loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewOutcome {
    Passed,
    /// Revision budget exhausted while the reviewer still reported NEEDS_FIX.
    Incomplete { unresolved_issues: Vec<ReviewIssue> },
}

impl ReviewOutcome {
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ReviewOutcome::Incomplete { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePackResult {
    pub run_dir: PathBuf,
    pub files_written: Vec<PathBuf>,
    pub review_outcome: ReviewOutcome,
    pub revision_passes: u32,
    pub risk_level: RiskLevel,
}
