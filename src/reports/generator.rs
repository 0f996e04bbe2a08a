use super::formatters::*;
use crate::error::Result;
use crate::types::{ImpactAnalysis, ReviewOutcome, RiskAssessment, TestPlan, UserContext};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything the documents are rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ChangePack<'a> {
    pub user_ctx: &'a UserContext,
    pub changed_files: &'a [String],
    pub impact: &'a ImpactAnalysis,
    pub risk: &'a RiskAssessment,
    pub test_plan: &'a TestPlan,
    pub outcome: &'a ReviewOutcome,
}

/// Report generator writing the markdown documents of a change pack
pub struct ReportGenerator {
    formatters: Vec<Box<dyn ReportFormatter>>,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            formatters: vec![
                Box::new(ChangeBriefFormatter),
                Box::new(ImpactFormatter),
                Box::new(RiskFormatter),
                Box::new(TestPlanFormatter),
                Box::new(RollbackFormatter),
            ],
        }
    }

    /// Render every document into `out_dir` and return the written paths in order.
    pub async fn write_all(&self, out_dir: &Path, pack: &ChangePack<'_>) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;

        let mut written = Vec::with_capacity(self.formatters.len());
        for formatter in &self.formatters {
            let path = out_dir.join(formatter.file_name());
            tokio::fs::write(&path, formatter.format(pack)).await?;
            debug!(path = %path.display(), "Wrote document");
            written.push(path);
        }

        info!(count = written.len(), out_dir = %out_dir.display(), "Change pack documents written");
        Ok(written)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_all_creates_five_documents() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("run");
        let impact = ImpactAnalysis {
            summary: "Updates docs.".to_string(),
            scope: vec![],
            change_types: vec!["docs".to_string()],
            key_files: vec![],
            assumptions: vec![],
            evidence: vec![],
        };
        let risk = RiskAssessment {
            risk_level: RiskLevel::Low,
            reasons: vec![],
            mitigations: vec![],
            monitoring: vec![],
            rollback: vec![],
            evidence: vec![],
        };
        let pack = ChangePack {
            user_ctx: &UserContext::default(),
            changed_files: &[],
            impact: &impact,
            risk: &risk,
            test_plan: &TestPlan::default(),
            outcome: &ReviewOutcome::Passed,
        };

        let written = ReportGenerator::new().write_all(&out_dir, &pack).await.unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "change-brief.md",
                "impact-analysis.md",
                "risk-assessment.md",
                "test-plan.md",
                "rollback-plan.md"
            ]
        );
        assert!(written.iter().all(|p| p.exists()));
        let risk_doc = std::fs::read_to_string(out_dir.join("risk-assessment.md")).unwrap();
        assert!(risk_doc.contains("## Risk Level: LOW"));
    }
}
