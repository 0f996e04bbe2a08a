pub mod formatters;
pub mod generator;

pub use formatters::ReportFormatter;
pub use generator::{ChangePack, ReportGenerator};
