pub mod agents;
pub mod config;
pub mod error;
pub mod evidence;
pub mod git;
pub mod llm;
pub mod redaction;
pub mod reports;
pub mod test_plan;
pub mod trace;
pub mod types;

pub use error::{Error, Result};
