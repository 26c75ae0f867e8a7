//! Intent Analyzer (C8): a cheap, single-shot classification call run
//! ahead of the main turn loop.

use std::sync::Arc;

use turnloop_llm::LlmProvider;

use crate::skills::{token_match_skills, union_skill_groups};
use crate::types::IntentResult;

const CLASSIFICATION_PROMPT: &str = "Classify the following user message. Respond with ONLY a JSON \
object of the shape {\"complexity\": \"simple\"|\"medium\"|\"complex\", \"needs_plan\": bool, \
\"relevant_skill_groups\": [string] or null, \"is_follow_up\": bool, \"skip_memory\": bool, \
\"task_type\": string}. No prose, no markdown fences.\n\nMessage:\n";

/// Runs intent classification ahead of each turn. Malformed or missing
/// model output never propagates as an error; it falls back to
/// [`IntentResult::safe_default`].
pub struct IntentAnalyzer {
    provider: Arc<dyn LlmProvider>,
    skill_names: Vec<String>,
}

impl IntentAnalyzer {
    /// Build an analyzer against a provider and the full set of registered
    /// skill names available for the deterministic token-match pass.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, skill_names: Vec<String>) -> Self {
        Self { provider, skill_names }
    }

    /// Classify one turn's query. `recent_context` is a short rendering of
    /// the immediately preceding turn, used by the model to judge
    /// `is_follow_up`; pass `None` for the first turn of a conversation.
    pub async fn analyze(&self, query: &str, recent_context: Option<&str>) -> IntentResult {
        let prompt = match recent_context {
            Some(context) => format!("{CLASSIFICATION_PROMPT}{query}\n\nPrevious turn:\n{context}"),
            None => format!("{CLASSIFICATION_PROMPT}{query}"),
        };

        let mut result = match self.provider.complete_simple(&prompt).await {
            Ok(raw) => parse_classification(&raw),
            Err(error) => {
                tracing::warn!(%error, "intent classification call failed, using safe default");
                IntentResult::safe_default()
            }
        };

        let matched = token_match_skills(query, &self.skill_names);
        result.relevant_skill_groups = union_skill_groups(result.relevant_skill_groups, matched);
        result
    }
}

fn parse_classification(raw: &str) -> IntentResult {
    let trimmed = raw.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    match serde_json::from_str::<IntentResult>(trimmed) {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(%error, raw = trimmed, "malformed intent classification output, using safe default");
            IntentResult::safe_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_json() {
        let raw = r#"{"complexity":"complex","needs_plan":true,"relevant_skill_groups":["web"],"is_follow_up":false,"skip_memory":false,"task_type":"research"}"#;
        let result = parse_classification(raw);
        assert_eq!(result.task_type, "research");
        assert_eq!(result.relevant_skill_groups, Some(vec!["web".to_string()]));
    }

    #[test]
    fn strips_markdown_fences_before_parsing() {
        let raw = "```json\n{\"complexity\":\"simple\",\"needs_plan\":false,\"relevant_skill_groups\":null,\"is_follow_up\":true,\"skip_memory\":true,\"task_type\":\"chat\"}\n```";
        let result = parse_classification(raw);
        assert!(result.is_follow_up);
        assert!(result.skip_memory);
    }

    #[test]
    fn malformed_json_falls_back_to_safe_default() {
        let result = parse_classification("not json at all");
        assert_eq!(result, IntentResult::safe_default());
    }
}
