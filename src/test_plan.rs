//! Test guidance derived from the repository layout.

use crate::types::TestPlan;
use std::path::Path;

pub const NO_TEST_COMMAND: &str = "TODO: add project-specific test command";
const EVIDENCE_UNAVAILABLE: &str = "UNKNOWN (tests are not executed by this tool)";
const MISSING_EVIDENCE: &str = "TODO: attach CI link or paste test output";

/// Marker files at the repository root and the test command each implies.
const DETECTORS: &[(&[&str], &str)] = &[
    (&["pyproject.toml", "requirements.txt"], "pytest -q"),
    (&["package.json"], "npm test"),
    (&["pom.xml"], "mvn test"),
    (&["gradlew"], "./gradlew test"),
    (&["Cargo.toml"], "cargo test"),
    (&["go.mod"], "go test ./..."),
];

/// Recommend test commands for every ecosystem detected at `repo_path`.
/// Nothing is executed.
pub fn derive_test_plan(repo_path: &Path) -> TestPlan {
    let mut recommended_commands: Vec<String> = DETECTORS
        .iter()
        .filter(|(markers, _)| markers.iter().any(|m| repo_path.join(m).exists()))
        .map(|(_, command)| command.to_string())
        .collect();

    if recommended_commands.is_empty() {
        recommended_commands.push(NO_TEST_COMMAND.to_string());
    }

    TestPlan {
        recommended_commands,
        evidence_available: vec![EVIDENCE_UNAVAILABLE.to_string()],
        missing_evidence: vec![MISSING_EVIDENCE.to_string()],
    }
}
