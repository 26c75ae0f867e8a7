//! The deterministic skill-name token-match supplement pass.
//!
//! The model's own classification of `relevant_skill_groups` is
//! probabilistic; this pass never replaces it, only adds skill names whose
//! exact token form appears in the query. It is never inferential: a skill
//! is added only when its name (hyphenated or space-separated) literally
//! appears in the query, never by semantic similarity.

fn normalize(token: &str) -> String {
    token.to_lowercase().replace('-', " ")
}

/// Skills whose normalized name appears as a substring of the normalized
/// query, in registration order.
#[must_use]
pub fn token_match_skills(query: &str, skill_names: &[String]) -> Vec<String> {
    let normalized_query = normalize(query);
    skill_names
        .iter()
        .filter(|name| normalized_query.contains(&normalize(name)))
        .cloned()
        .collect()
}

/// Union `matched` into `existing`, preserving `existing`'s order and
/// appending any new names. Returns `None` unchanged when both the
/// existing selection and the match set are empty, preserving the
/// "fall back to full skills listing" meaning of `None`.
#[must_use]
pub fn union_skill_groups(existing: Option<Vec<String>>, matched: Vec<String>) -> Option<Vec<String>> {
    if matched.is_empty() {
        return existing;
    }
    let mut merged = existing.unwrap_or_default();
    for name in matched {
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_hyphenated_and_spaced_forms() {
        let skills = vec!["file-search".to_string(), "code-review".to_string()];
        let matches = token_match_skills("please do a code review of this", &skills);
        assert_eq!(matches, vec!["code-review".to_string()]);

        let matches = token_match_skills("run a file search here", &skills);
        assert_eq!(matches, vec!["file-search".to_string()]);
    }

    #[test]
    fn never_matches_semantically_related_but_absent_terms() {
        let skills = vec!["file-search".to_string()];
        let matches = token_match_skills("find the document please", &skills);
        assert!(matches.is_empty());
    }

    #[test]
    fn union_preserves_existing_order_and_appends_new() {
        let existing = Some(vec!["a".to_string()]);
        let merged = union_skill_groups(existing, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(merged, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn empty_match_leaves_none_as_none() {
        assert_eq!(union_skill_groups(None, Vec::new()), None);
    }
}
