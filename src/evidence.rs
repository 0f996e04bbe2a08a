//! Turns raw change facts into the ordered evidence list fed to every agent.

use crate::types::{Evidence, EvidenceKind, ReviewResult, UserContext};

/// Changed-file entries beyond this are dropped from the evidence.
pub const MAX_CHANGED_FILES: usize = 50;

const CHANGED_FILES_SEPARATOR: &str = "; ";

/// Build the evidence list for one run.
///
/// Pure function of its inputs. Missing data produces fewer items, never an
/// error. `limit` is the diff budget in characters.
pub fn build_evidence(
    changed_files: &[String],
    diff_text: &str,
    user_ctx: &UserContext,
    limit: usize,
) -> Vec<Evidence> {
    let mut evidence = Vec::new();

    if !changed_files.is_empty() {
        let listed = &changed_files[..changed_files.len().min(MAX_CHANGED_FILES)];
        evidence.push(Evidence::new(
            EvidenceKind::ChangedFiles,
            listed.join(CHANGED_FILES_SEPARATOR),
            Some(format!(
                "up to {} files ({} changed)",
                MAX_CHANGED_FILES,
                changed_files.len()
            )),
        ));
    }

    if !diff_text.is_empty() {
        let snippet: String = diff_text.chars().take(limit).collect();
        let length = snippet.chars().count();
        evidence.push(Evidence::new(
            EvidenceKind::DiffSnippet,
            snippet,
            Some(format!("first {} chars", length)),
        ));
    }

    if !user_ctx.is_empty() {
        // Field order is fixed by the struct and links are a BTreeMap, so the
        // rendering is stable across runs.
        if let Ok(serialized) = serde_json::to_string(user_ctx) {
            evidence.push(Evidence::new(EvidenceKind::UserContext, serialized, None));
        }
    }

    evidence
}

/// Evidence list for a revision pass: the original items plus the reviewer's
/// full verdict. Returns a new list; `evidence` is left untouched.
pub fn with_review_feedback(evidence: &[Evidence], review: &ReviewResult) -> Vec<Evidence> {
    let feedback = serde_json::to_string(review).unwrap_or_else(|_| format!("{:?}", review));
    evidence
        .iter()
        .cloned()
        .chain(std::iter::once(Evidence::new(
            EvidenceKind::ReviewFeedback,
            feedback,
            Some("Reviewer notes".to_string()),
        )))
        .collect()
}
