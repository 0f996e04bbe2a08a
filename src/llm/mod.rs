pub mod interfaces;
pub mod prompts;
pub mod providers;

pub use interfaces::{ChatClient, ChatMessage, LlmConfig, MessageRole};
pub use prompts::{AgentPrompts, PromptTemplate, SYSTEM_GUARDRAILS};
pub use providers::OpenAICompatProvider;
