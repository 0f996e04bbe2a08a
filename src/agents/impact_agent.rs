use super::Agent;
use crate::llm::prompts::{evidence_block, user_context_block};
use crate::llm::{AgentPrompts, ChatMessage, PromptTemplate};
use crate::types::{AgentRole, Evidence, ImpactAnalysis, UserContext};

pub struct ImpactInput<'a> {
    pub user_ctx: &'a UserContext,
    pub evidence: &'a [Evidence],
}

/// Impact Agent - describes what the change touches
pub struct ImpactAgent {
    prompt: PromptTemplate,
}

impl ImpactAgent {
    pub fn new() -> Self {
        Self {
            prompt: AgentPrompts::impact_analysis(),
        }
    }
}

impl Default for ImpactAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for ImpactAgent {
    type Input<'a> = ImpactInput<'a>;
    type Output = ImpactAnalysis;

    fn role(&self) -> AgentRole {
        AgentRole::Impact
    }

    fn build_messages(&self, input: &ImpactInput<'_>) -> Vec<ChatMessage> {
        let user = self.prompt.render(&[
            ("USER CONTEXT", user_context_block(input.user_ctx)),
            ("EVIDENCE", evidence_block(input.evidence)),
        ]);
        vec![
            ChatMessage::system(self.prompt.system_prompt.clone()),
            ChatMessage::user(user),
        ]
    }
}
