use super::Agent;
use crate::llm::prompts::{evidence_block, user_context_block};
use crate::llm::{AgentPrompts, ChatMessage, PromptTemplate};
use crate::types::{AgentRole, Evidence, ReviewResult, UserContext};

pub struct ReviewInput<'a> {
    pub user_ctx: &'a UserContext,
    pub impact_json: &'a str,
    pub risk_json: &'a str,
    pub evidence: &'a [Evidence],
}

/// Reviewer Agent - checks the impact/risk pair and routes issues back
pub struct ReviewAgent {
    prompt: PromptTemplate,
}

impl ReviewAgent {
    pub fn new() -> Self {
        Self {
            prompt: AgentPrompts::review(),
        }
    }
}

impl Default for ReviewAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for ReviewAgent {
    type Input<'a> = ReviewInput<'a>;
    type Output = ReviewResult;

    fn role(&self) -> AgentRole {
        AgentRole::Review
    }

    fn build_messages(&self, input: &ReviewInput<'_>) -> Vec<ChatMessage> {
        let user = self.prompt.render(&[
            ("USER CONTEXT", user_context_block(input.user_ctx)),
            ("IMPACT JSON", input.impact_json.to_string()),
            ("RISK JSON", input.risk_json.to_string()),
            ("EVIDENCE", evidence_block(input.evidence)),
        ]);
        vec![
            ChatMessage::system(self.prompt.system_prompt.clone()),
            ChatMessage::user(user),
        ]
    }

    fn uppercase_field(&self) -> Option<&'static str> {
        Some("status")
    }
}
