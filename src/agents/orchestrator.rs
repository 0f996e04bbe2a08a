use super::{
    invoke, Agent, ImpactAgent, ImpactInput, ReviewAgent, ReviewInput, RiskAgent, RiskInput,
};
use crate::config::PipelineSettings;
use crate::error::{Error, Result};
use crate::evidence::{build_evidence, with_review_feedback};
use crate::llm::ChatClient;
use crate::reports::{ChangePack, ReportGenerator};
use crate::test_plan::derive_test_plan;
use crate::trace::{TraceEvent, TraceWriter};
use crate::types::*;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Main orchestrator: Impact -> Risk -> Review with a bounded revision loop
pub struct ChangePackOrchestrator {
    impact_agent: ImpactAgent,
    risk_agent: RiskAgent,
    review_agent: ReviewAgent,
    client: Arc<dyn ChatClient>,
    trace: TraceWriter,
    config: OrchestratorConfig,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Diff budget in characters for the evidence snippet
    pub max_llm_chars: usize,
    /// Extra review cycles allowed after the first NEEDS_FIX
    pub max_revision_passes: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        PipelineSettings::default().into()
    }
}

impl From<PipelineSettings> for OrchestratorConfig {
    fn from(settings: PipelineSettings) -> Self {
        Self {
            max_llm_chars: settings.max_llm_chars,
            max_revision_passes: settings.max_revision_passes,
        }
    }
}

/// Final structured results of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub impact: ImpactAnalysis,
    pub risk: RiskAssessment,
    pub review: ReviewResult,
    pub revision_passes: u32,
    pub outcome: ReviewOutcome,
}

/// A validated stage output plus the pretty JSON handed to later stages.
struct Staged<T> {
    value: T,
    json: String,
}

impl<T: Serialize> Staged<T> {
    fn new(value: T) -> Result<Self> {
        let json = serde_json::to_string_pretty(&value)?;
        Ok(Self { value, json })
    }
}

enum PipelineState {
    CollectEvidence,
    Impact,
    Risk {
        impact: Staged<ImpactAnalysis>,
    },
    Review {
        impact: Staged<ImpactAnalysis>,
        risk: Staged<RiskAssessment>,
    },
    Revise {
        impact: Staged<ImpactAnalysis>,
        risk: Staged<RiskAssessment>,
        review: ReviewResult,
    },
    Done {
        impact: Staged<ImpactAnalysis>,
        risk: Staged<RiskAssessment>,
        review: ReviewResult,
    },
}

impl PipelineState {
    fn name(&self) -> &'static str {
        match self {
            PipelineState::CollectEvidence => "collect_evidence",
            PipelineState::Impact => "impact",
            PipelineState::Risk { .. } => "risk",
            PipelineState::Review { .. } => "review",
            PipelineState::Revise { .. } => "revise",
            PipelineState::Done { .. } => "done",
        }
    }
}

/// Per-invocation state. Dropped when the run completes.
struct PipelineRun<'a> {
    id: Uuid,
    user_ctx: &'a UserContext,
    evidence: Vec<Evidence>,
    revision_passes: u32,
}

impl ChangePackOrchestrator {
    pub fn new(client: Arc<dyn ChatClient>, trace: TraceWriter, config: OrchestratorConfig) -> Self {
        Self {
            impact_agent: ImpactAgent::new(),
            risk_agent: RiskAgent::new(),
            review_agent: ReviewAgent::new(),
            client,
            trace,
            config,
        }
    }

    /// Create a timestamped run directory (`YYYY-MM-DD_HHMMSS`, local time) under `base`.
    pub async fn make_run_dir(base: &Path) -> Result<PathBuf> {
        let run_dir = base.join(Local::now().format("%Y-%m-%d_%H%M%S").to_string());
        tokio::fs::create_dir_all(&run_dir).await?;
        Ok(run_dir)
    }

    /// Full change pack generation: agent pipeline, test plan, rendered documents.
    ///
    /// Documents are written only after the pipeline reaches its terminal state,
    /// so an aborted run leaves nothing in `out_dir` beyond the trace.
    #[instrument(skip_all, fields(repo = %repo_path.display(), out_dir = %out_dir.display()))]
    pub async fn run(
        &self,
        repo_path: &Path,
        changed_files: &[String],
        diff_text: &str,
        user_ctx: &UserContext,
        out_dir: &Path,
    ) -> Result<ChangePackResult> {
        let outcome = self.orchestrate(changed_files, diff_text, user_ctx).await?;

        let test_plan = derive_test_plan(repo_path);
        let pack = ChangePack {
            user_ctx,
            changed_files,
            impact: &outcome.impact,
            risk: &outcome.risk,
            test_plan: &test_plan,
            outcome: &outcome.outcome,
        };
        let files_written = ReportGenerator::new().write_all(out_dir, &pack).await?;

        Ok(ChangePackResult {
            run_dir: out_dir.to_path_buf(),
            files_written,
            review_outcome: outcome.outcome,
            revision_passes: outcome.revision_passes,
            risk_level: outcome.risk.risk_level,
        })
    }

    /// Drive the agent state machine to completion.
    #[instrument(skip_all, fields(changed_files = changed_files.len()))]
    pub async fn orchestrate(
        &self,
        changed_files: &[String],
        diff_text: &str,
        user_ctx: &UserContext,
    ) -> Result<PipelineOutcome> {
        let mut run = PipelineRun {
            id: Uuid::new_v4(),
            user_ctx,
            evidence: Vec::new(),
            revision_passes: 0,
        };
        info!(run_id = %run.id, "Starting change pack pipeline");

        let mut state = PipelineState::CollectEvidence;
        loop {
            info!(run_id = %run.id, stage = state.name(), "Pipeline stage");
            state = match state {
                PipelineState::CollectEvidence => {
                    run.evidence =
                        build_evidence(changed_files, diff_text, user_ctx, self.config.max_llm_chars);
                    info!(
                        run_id = %run.id,
                        items = run.evidence.len(),
                        changed_files = changed_files.len(),
                        "Evidence collected"
                    );
                    PipelineState::Impact
                }
                PipelineState::Impact => {
                    let impact = self.impact(&run, &run.evidence).await?;
                    PipelineState::Risk { impact }
                }
                PipelineState::Risk { impact } => {
                    let risk = self.risk(&run, &impact.json, &run.evidence).await?;
                    PipelineState::Review { impact, risk }
                }
                PipelineState::Review { impact, risk } => {
                    let review = self.review(&run, &impact.json, &risk.json).await?;
                    if review.passed() {
                        PipelineState::Done { impact, risk, review }
                    } else if run.revision_passes >= self.config.max_revision_passes {
                        warn!(
                            run_id = %run.id,
                            revision_passes = run.revision_passes,
                            unresolved = review.issues.len(),
                            "Revision budget exhausted; accepting NEEDS_FIX result"
                        );
                        PipelineState::Done { impact, risk, review }
                    } else {
                        PipelineState::Revise { impact, risk, review }
                    }
                }
                PipelineState::Revise {
                    mut impact,
                    mut risk,
                    review,
                } => {
                    run.revision_passes += 1;
                    info!(
                        run_id = %run.id,
                        pass = run.revision_passes,
                        issues = review.issues.len(),
                        "Reviewer requested fixes"
                    );

                    let feedback = with_review_feedback(&run.evidence, &review);
                    if review.routes_to(RouteTo::Impact) {
                        impact = self.impact(&run, &feedback).await?;
                    }
                    if review.routes_to(RouteTo::Risk) {
                        risk = self.risk(&run, &impact.json, &feedback).await?;
                    }
                    PipelineState::Review { impact, risk }
                }
                PipelineState::Done {
                    impact,
                    risk,
                    review,
                } => {
                    let outcome = if review.passed() {
                        ReviewOutcome::Passed
                    } else {
                        ReviewOutcome::Incomplete {
                            unresolved_issues: review.issues.clone(),
                        }
                    };
                    info!(
                        run_id = %run.id,
                        risk_level = %risk.value.risk_level,
                        review_status = %review.status,
                        revision_passes = run.revision_passes,
                        "Pipeline finished"
                    );
                    return Ok(PipelineOutcome {
                        impact: impact.value,
                        risk: risk.value,
                        review,
                        revision_passes: run.revision_passes,
                        outcome,
                    });
                }
            };
        }
    }

    async fn impact(&self, run: &PipelineRun<'_>, evidence: &[Evidence]) -> Result<Staged<ImpactAnalysis>> {
        let input = ImpactInput {
            user_ctx: run.user_ctx,
            evidence,
        };
        Staged::new(self.call(run, &self.impact_agent, &input).await?)
    }

    async fn risk(
        &self,
        run: &PipelineRun<'_>,
        impact_json: &str,
        evidence: &[Evidence],
    ) -> Result<Staged<RiskAssessment>> {
        let input = RiskInput {
            user_ctx: run.user_ctx,
            impact_json,
            evidence,
        };
        Staged::new(self.call(run, &self.risk_agent, &input).await?)
    }

    /// Review always sees the original evidence, never the feedback item.
    async fn review(&self, run: &PipelineRun<'_>, impact_json: &str, risk_json: &str) -> Result<ReviewResult> {
        let input = ReviewInput {
            user_ctx: run.user_ctx,
            impact_json,
            risk_json,
            evidence: &run.evidence,
        };
        self.call(run, &self.review_agent, &input).await
    }

    /// One traced agent invocation: `call` event, request, `result` event.
    async fn call<A: Agent>(&self, run: &PipelineRun<'_>, agent: &A, input: &A::Input<'_>) -> Result<A::Output> {
        let role = agent.role();
        info!(run_id = %run.id, agent = %role, "Calling agent");
        self.trace.record(TraceEvent::call(role)).await?;

        let output = match invoke(agent, self.client.as_ref(), input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(run_id = %run.id, agent = %role, kind = e.kind(), "Agent call failed: {}", e);
                return Err(Error::agent(role, e));
            }
        };

        let response = serde_json::to_string(&output)?;
        self.trace.record(TraceEvent::result(role, response)).await?;
        Ok(output)
    }
}
