pub mod impact_agent;
pub mod orchestrator;
pub mod review_agent;
pub mod risk_agent;

pub use impact_agent::{ImpactAgent, ImpactInput};
pub use orchestrator::{ChangePackOrchestrator, OrchestratorConfig, PipelineOutcome};
pub use review_agent::{ReviewAgent, ReviewInput};
pub use risk_agent::{RiskAgent, RiskInput};

use crate::error::{Error, Result};
use crate::llm::{ChatClient, ChatMessage};
use crate::types::AgentRole;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One role-specific request/response cycle against a language model.
pub trait Agent: Send + Sync {
    type Input<'a>: Sync;
    type Output: DeserializeOwned + Serialize + Send;

    fn role(&self) -> AgentRole;

    fn build_messages(&self, input: &Self::Input<'_>) -> Vec<ChatMessage>;

    /// Enum-valued field uppercased before validation to absorb model case drift.
    fn uppercase_field(&self) -> Option<&'static str> {
        None
    }

    fn parse(&self, text: &str) -> Result<Self::Output> {
        parse_structured(text, self.uppercase_field())
    }
}

/// Send exactly one request for `agent` and validate the reply. No retries.
pub async fn invoke<A: Agent>(
    agent: &A,
    client: &dyn ChatClient,
    input: &A::Input<'_>,
) -> Result<A::Output> {
    let messages = agent.build_messages(input);
    let text = client.chat(messages).await?;
    agent.parse(&text)
}

/// Strip a surrounding fenced code block (```` ``` ```` plus optional language
/// tag). Text without a leading fence is returned trimmed.
pub fn unwrap_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

pub(crate) fn parse_structured<T: DeserializeOwned>(
    text: &str,
    uppercase_field: Option<&str>,
) -> Result<T> {
    let body = unwrap_code_fence(text);
    let mut value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        Error::ResponseFormat(format!("{} (response starts with {:?})", e, preview(body)))
    })?;

    if let Some(field) = uppercase_field {
        if let Some(raw) = value.get_mut(field) {
            if let Some(s) = raw.as_str() {
                *raw = serde_json::Value::String(s.trim().to_uppercase());
            }
        }
    }

    serde_json::from_value(value).map_err(|e| Error::SchemaValidation(e.to_string()))
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
