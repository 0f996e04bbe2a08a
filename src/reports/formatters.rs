use super::generator::ChangePack;
use crate::types::ReviewOutcome;

/// Trait for report formatters. One formatter renders one document.
pub trait ReportFormatter: Send + Sync {
    fn file_name(&self) -> &'static str;
    fn format(&self, pack: &ChangePack<'_>) -> String;
}

fn bullets(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        return format!("- {}", fallback);
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_bullets(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        return format!("- {}", fallback);
    }
    items
        .iter()
        .map(|item| format!("- `{}`", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// CAB-facing one-page summary
pub struct ChangeBriefFormatter;

impl ReportFormatter for ChangeBriefFormatter {
    fn file_name(&self) -> &'static str {
        "change-brief.md"
    }

    fn format(&self, pack: &ChangePack<'_>) -> String {
        let title = pack.user_ctx.title.as_deref().unwrap_or("Change Brief");
        let summary = pack
            .user_ctx
            .summary
            .as_deref()
            .unwrap_or(&pack.impact.summary);
        let environment = pack.user_ctx.environment.as_deref().unwrap_or("UNKNOWN");
        let change_types = if pack.impact.change_types.is_empty() {
            "UNKNOWN".to_string()
        } else {
            pack.impact.change_types.join(", ")
        };

        let banner = match pack.outcome {
            ReviewOutcome::Passed => String::new(),
            ReviewOutcome::Incomplete { unresolved_issues } => {
                let issues = unresolved_issues
                    .iter()
                    .map(|issue| format!("> - [{}] {}: {}", issue.severity, issue.field, issue.message))
                    .collect::<Vec<_>>()
                    .join("\n");
                let mut banner =
                    "> **Reviewer verdict: NEEDS_FIX (revision budget exhausted)**\n".to_string();
                if !issues.is_empty() {
                    banner.push_str(">\n");
                    banner.push_str(&issues);
                    banner.push('\n');
                }
                banner.push('\n');
                banner
            }
        };

        format!(
            r#"# {title}

{banner}## Summary
{summary}

## Scope
{scope}

## Change Types
{change_types}

## Risk
**{risk_level}**

### Reasons
{reasons}

### Mitigations
{mitigations}

## Test Plan
{tests}

## Rollback (high level)
{rollback}

## Monitoring (suggested)
{monitoring}

**Environment:** {environment}
"#,
            title = title,
            banner = banner,
            summary = summary.trim(),
            scope = bullets(&pack.impact.scope, "UNKNOWN"),
            change_types = change_types,
            risk_level = pack.risk.risk_level,
            reasons = bullets(&pack.risk.reasons, "UNKNOWN"),
            mitigations = bullets(&pack.risk.mitigations, "TODO: add mitigations"),
            tests = code_bullets(&pack.test_plan.recommended_commands, "TODO: add test commands"),
            rollback = bullets(&pack.risk.rollback, "TODO: define rollback"),
            monitoring = bullets(&pack.risk.monitoring, "TODO: add monitoring metrics"),
            environment = environment,
        )
    }
}

pub struct ImpactFormatter;

impl ReportFormatter for ImpactFormatter {
    fn file_name(&self) -> &'static str {
        "impact-analysis.md"
    }

    fn format(&self, pack: &ChangePack<'_>) -> String {
        format!(
            r#"# Impact Analysis

## Summary
{}

## Changed Files (evidence)
{}

## Impacted Scope
{}

## Key Files
{}

## Assumptions
{}
"#,
            pack.impact.summary.trim(),
            code_bullets(pack.changed_files, "(none detected)"),
            bullets(&pack.impact.scope, "UNKNOWN"),
            code_bullets(&pack.impact.key_files, "UNKNOWN"),
            bullets(&pack.impact.assumptions, "(none)"),
        )
    }
}

pub struct RiskFormatter;

impl ReportFormatter for RiskFormatter {
    fn file_name(&self) -> &'static str {
        "risk-assessment.md"
    }

    fn format(&self, pack: &ChangePack<'_>) -> String {
        format!(
            r#"# Risk Assessment

## Risk Level: {}

## Reasons
{}

## Mitigations
{}

## Monitoring Suggestions
{}
"#,
            pack.risk.risk_level,
            bullets(&pack.risk.reasons, "UNKNOWN"),
            bullets(&pack.risk.mitigations, "TODO"),
            bullets(&pack.risk.monitoring, "TODO"),
        )
    }
}

pub struct TestPlanFormatter;

impl ReportFormatter for TestPlanFormatter {
    fn file_name(&self) -> &'static str {
        "test-plan.md"
    }

    fn format(&self, pack: &ChangePack<'_>) -> String {
        format!(
            r#"# Test Plan

## Recommended Commands
{}

## Evidence Available
{}

## Missing Evidence / TODO
{}
"#,
            code_bullets(&pack.test_plan.recommended_commands, "TODO"),
            bullets(&pack.test_plan.evidence_available, "UNKNOWN"),
            bullets(&pack.test_plan.missing_evidence, "TODO"),
        )
    }
}

pub struct RollbackFormatter;

impl ReportFormatter for RollbackFormatter {
    fn file_name(&self) -> &'static str {
        "rollback-plan.md"
    }

    fn format(&self, pack: &ChangePack<'_>) -> String {
        format!(
            r#"# Rollback Plan

## Steps
{}

## Notes
- Prefer disabling via feature flags (if available) before reverting.
- Validate health checks and critical workflows after rollback.
"#,
            bullets(&pack.risk.rollback, "TODO: define rollback steps"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    struct Fixture {
        user_ctx: UserContext,
        changed_files: Vec<String>,
        impact: ImpactAnalysis,
        risk: RiskAssessment,
        test_plan: TestPlan,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                user_ctx: UserContext::default(),
                changed_files: vec!["src/lib.rs".to_string()],
                impact: ImpactAnalysis {
                    summary: "  Refactors the parser.  ".to_string(),
                    scope: vec![],
                    change_types: vec!["code".to_string()],
                    key_files: vec![],
                    assumptions: vec![],
                    evidence: vec![],
                },
                risk: RiskAssessment {
                    risk_level: RiskLevel::Medium,
                    reasons: vec!["Parser is on the hot path".to_string()],
                    mitigations: vec![],
                    monitoring: vec![],
                    rollback: vec![],
                    evidence: vec![],
                },
                test_plan: TestPlan::default(),
            }
        }

        fn pack<'a>(&'a self, outcome: &'a ReviewOutcome) -> ChangePack<'a> {
            ChangePack {
                user_ctx: &self.user_ctx,
                changed_files: &self.changed_files,
                impact: &self.impact,
                risk: &self.risk,
                test_plan: &self.test_plan,
                outcome,
            }
        }
    }

    #[test]
    fn test_change_brief_falls_back_to_impact_summary() {
        let fixture = Fixture::new();
        let doc = ChangeBriefFormatter.format(&fixture.pack(&ReviewOutcome::Passed));

        assert!(doc.starts_with("# Change Brief\n"));
        assert!(doc.contains("## Summary\nRefactors the parser.\n"));
        assert!(doc.contains("## Scope\n- UNKNOWN"));
        assert!(doc.contains("**MEDIUM**"));
        assert!(doc.contains("- TODO: add mitigations"));
        assert!(doc.contains("**Environment:** UNKNOWN"));
        assert!(!doc.contains("NEEDS_FIX"));
    }

    #[test]
    fn test_change_brief_flags_incomplete_review() {
        let fixture = Fixture::new();
        let outcome = ReviewOutcome::Incomplete {
            unresolved_issues: vec![ReviewIssue {
                severity: Severity::Warn,
                field: "rollback".to_string(),
                message: "Rollback is generic".to_string(),
                suggested_fix: None,
                route_to: RouteTo::Risk,
            }],
        };
        let doc = ChangeBriefFormatter.format(&fixture.pack(&outcome));

        assert!(doc.contains("Reviewer verdict: NEEDS_FIX (revision budget exhausted)"));
        assert!(doc.contains("rollback: Rollback is generic"));
    }

    #[test]
    fn test_impact_doc_lists_changed_files() {
        let fixture = Fixture::new();
        let doc = ImpactFormatter.format(&fixture.pack(&ReviewOutcome::Passed));

        assert!(doc.contains("## Changed Files (evidence)\n- `src/lib.rs`"));
        assert!(doc.contains("## Assumptions\n- (none)"));
    }

    #[test]
    fn test_rollback_doc_has_todo_when_empty() {
        let fixture = Fixture::new();
        let doc = RollbackFormatter.format(&fixture.pack(&ReviewOutcome::Passed));
        assert!(doc.contains("- TODO: define rollback steps"));
    }
}
