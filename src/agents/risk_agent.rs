use super::Agent;
use crate::llm::prompts::{evidence_block, user_context_block};
use crate::llm::{AgentPrompts, ChatMessage, PromptTemplate};
use crate::types::{AgentRole, Evidence, RiskAssessment, UserContext};

pub struct RiskInput<'a> {
    pub user_ctx: &'a UserContext,
    pub impact_json: &'a str,
    pub evidence: &'a [Evidence],
}

/// Risk Agent - grades the change and proposes mitigations and rollback
pub struct RiskAgent {
    prompt: PromptTemplate,
}

impl RiskAgent {
    pub fn new() -> Self {
        Self {
            prompt: AgentPrompts::risk_assessment(),
        }
    }
}

impl Default for RiskAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RiskAgent {
    type Input<'a> = RiskInput<'a>;
    type Output = RiskAssessment;

    fn role(&self) -> AgentRole {
        AgentRole::Risk
    }

    fn build_messages(&self, input: &RiskInput<'_>) -> Vec<ChatMessage> {
        let user = self.prompt.render(&[
            ("USER CONTEXT", user_context_block(input.user_ctx)),
            ("IMPACT JSON", input.impact_json.to_string()),
            ("EVIDENCE", evidence_block(input.evidence)),
        ]);
        vec![
            ChatMessage::system(self.prompt.system_prompt.clone()),
            ChatMessage::user(user),
        ]
    }

    fn uppercase_field(&self) -> Option<&'static str> {
        Some("risk_level")
    }
}
