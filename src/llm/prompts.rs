use crate::types::{Evidence, UserContext};
use serde_json::json;

/// Shared preamble for every agent prompt.
pub const SYSTEM_GUARDRAILS: &str = r#"You are a meticulous staff-level engineer writing change-advisory-board ready documents.
Hard rules:
- Do NOT invent systems, services, metrics, or tests you cannot justify.
- If evidence is insufficient, write UNKNOWN and add a TODO.
- When making a claim, cite evidence using short quoted snippets from the EVIDENCE section.
- Keep outputs concise and enterprise-friendly.
- Reply with the JSON object only."#;

/// Prompt template for one agent role
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub agent_name: String,
    pub system_prompt: String,
    pub task: String,
    pub output_schema: serde_json::Value,
}

impl PromptTemplate {
    /// Render the user message: guardrails, task, schema, then the named
    /// sections in the order given. Later sections are read last by the model.
    pub fn render(&self, sections: &[(&str, String)]) -> String {
        let schema = serde_json::to_string_pretty(&self.output_schema)
            .unwrap_or_else(|_| self.output_schema.to_string());

        let mut out = format!(
            "{}\n\nTASK ({}):\n{}\n\nReturn JSON matching this schema:\n{}\n",
            SYSTEM_GUARDRAILS,
            self.agent_name,
            self.task,
            schema
        );
        for (heading, body) in sections {
            out.push_str(&format!("\n{}:\n{}\n", heading, body));
        }
        out
    }
}

/// Deterministic rendering of the evidence list, one item per line.
pub fn evidence_block(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .map(|e| match &e.note {
            Some(note) => format!("- [{}] ({}): {}", e.kind.as_str(), note, e.value),
            None => format!("- [{}]: {}", e.kind.as_str(), e.value),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic rendering of user context. Absent fields print as `None`.
pub fn user_context_block(ctx: &UserContext) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_string());
    let links = ctx
        .links
        .iter()
        .map(|(name, url)| format!("{}={}", name, url))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "title={}\nsummary={}\nenvironment={}\nservice_hints=[{}]\nlinks={{{}}}",
        opt(&ctx.title),
        opt(&ctx.summary),
        opt(&ctx.environment),
        ctx.service_hints.join(", "),
        links
    )
}

fn evidence_schema() -> serde_json::Value {
    json!({
        "type": "changed_files|diff_snippet|user_context",
        "value": "string",
        "note": "string?"
    })
}

/// Collection of prompts for all agents
pub struct AgentPrompts;

impl AgentPrompts {
    pub fn impact_analysis() -> PromptTemplate {
        PromptTemplate {
            agent_name: "Impact Agent".to_string(),
            system_prompt: "You are the Impact Agent.".to_string(),
            task: r#"Analyze the change and produce:
- a 3-6 sentence summary
- impacted scope (services/modules) (avoid guessing; use UNKNOWN if unsure)
- change types from: code, config, db, infra, contract, docs
- key files (top 5)
- assumptions (if any)"#
                .to_string(),
            output_schema: json!({
                "summary": "string",
                "scope": ["string"],
                "change_types": ["string"],
                "key_files": ["string"],
                "assumptions": ["string"],
                "evidence": [evidence_schema()]
            }),
        }
    }

    pub fn risk_assessment() -> PromptTemplate {
        PromptTemplate {
            agent_name: "Risk Agent".to_string(),
            system_prompt: "You are the Risk Agent.".to_string(),
            task: r#"Given the Impact Analysis JSON and evidence, produce:
- risk_level: LOW|MEDIUM|HIGH
- 3-7 reasons (each must cite evidence)
- mitigations
- monitoring metrics/checks (if unknown, propose generic but label as suggestion)
- rollback steps (specific if possible; else TODO)"#
                .to_string(),
            output_schema: json!({
                "risk_level": "LOW|MEDIUM|HIGH",
                "reasons": ["string"],
                "mitigations": ["string"],
                "monitoring": ["string"],
                "rollback": ["string"],
                "evidence": [evidence_schema()]
            }),
        }
    }

    pub fn review() -> PromptTemplate {
        PromptTemplate {
            agent_name: "Reviewer Agent".to_string(),
            system_prompt: "You are the Reviewer Agent.".to_string(),
            task: r#"Review the Impact and Risk outputs for:
- Missing required sections
- Contradictions (e.g., says no config change but config files changed)
- Generic statements without evidence
- Missing TODO/UNKNOWN where evidence is lacking

If issues exist, set status=NEEDS_FIX and return issues routed to 'impact' or 'risk'.
Otherwise status=PASS."#
                .to_string(),
            output_schema: json!({
                "status": "PASS|NEEDS_FIX",
                "issues": [{
                    "severity": "INFO|WARN|ERROR",
                    "field": "string",
                    "message": "string",
                    "suggested_fix": "string?",
                    "route_to": "impact|risk"
                }]
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvidenceKind;

    #[test]
    fn test_evidence_block_format() {
        let evidence = vec![
            Evidence::new(EvidenceKind::ChangedFiles, "a.rs; b.rs", Some("up to 50 files (2 changed)".to_string())),
            Evidence::new(EvidenceKind::UserContext, "{}", None),
        ];

        assert_eq!(
            evidence_block(&evidence),
            "- [changed_files] (up to 50 files (2 changed)): a.rs; b.rs\n- [user_context]: {}"
        );
    }

    #[test]
    fn test_user_context_block_is_stable() {
        let mut ctx = UserContext {
            title: Some("Bump TLS".to_string()),
            service_hints: vec!["edge".to_string(), "auth".to_string()],
            ..Default::default()
        };
        ctx.links.insert("b".to_string(), "https://b".to_string());
        ctx.links.insert("a".to_string(), "https://a".to_string());

        assert_eq!(
            user_context_block(&ctx),
            "title=Bump TLS\nsummary=None\nenvironment=None\nservice_hints=[edge, auth]\nlinks={a=https://a, b=https://b}"
        );
    }

    #[test]
    fn test_render_places_guardrails_first_and_sections_in_order() {
        let prompt = AgentPrompts::risk_assessment().render(&[
            ("USER CONTEXT", "title=None".to_string()),
            ("IMPACT JSON", "{}".to_string()),
            ("EVIDENCE", "- [diff_snippet]: +x".to_string()),
        ]);

        assert!(prompt.starts_with(SYSTEM_GUARDRAILS));
        assert!(prompt.contains("TASK (Risk Agent):"));
        assert!(prompt.contains("\"risk_level\": \"LOW|MEDIUM|HIGH\""));
        let ctx = prompt.find("USER CONTEXT:").unwrap();
        let impact = prompt.find("IMPACT JSON:").unwrap();
        let evidence = prompt.find("EVIDENCE:").unwrap();
        assert!(ctx < impact && impact < evidence);
    }

    #[test]
    fn test_guardrails_ask_for_unknown_markers_and_citations() {
        assert!(SYSTEM_GUARDRAILS.contains("UNKNOWN"));
        assert!(SYSTEM_GUARDRAILS.contains("TODO"));
        assert!(SYSTEM_GUARDRAILS.contains("cite evidence"));
    }
}
