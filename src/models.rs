//! Static registry of model context-window sizes.

use std::collections::BTreeMap;
use tracing::debug;

/// Model assumed when nothing is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Limit returned for unknown or blank model ids. Never above the smallest
/// registered limit.
pub const DEFAULT_TOKEN_LIMIT: usize = 8_000;

/// Registry entries, in lookup order. More specific ids come before ids they
/// contain so fuzzy matching prefers them.
const MODEL_LIMITS: &[(&str, usize)] = &[
    ("claude-opus-4-1-20250805", 200_000),
    ("claude-opus-4-20250514", 200_000),
    ("claude-sonnet-4-5-20250929", 200_000),
    ("claude-sonnet-4-20250514", 200_000),
    ("claude-3-7-sonnet-20250219", 200_000),
    ("claude-3-5-sonnet-20241022", 200_000),
    ("claude-3-5-haiku-20241022", 200_000),
    ("claude-3-opus-20240229", 200_000),
    ("claude-3-haiku-20240307", 200_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
];

/// Context-window size for `model_id`.
///
/// Exact match first, then a case-insensitive substring match in either
/// direction (first registry entry wins), then `DEFAULT_TOKEN_LIMIT`.
pub fn get_model_limit(model_id: &str) -> usize {
    let trimmed = model_id.trim();
    if trimmed.is_empty() {
        debug!("blank model id, using default limit");
        return DEFAULT_TOKEN_LIMIT;
    }

    if let Some((_, limit)) = MODEL_LIMITS.iter().find(|(id, _)| *id == model_id) {
        return *limit;
    }

    let needle = trimmed.to_lowercase();
    for (id, limit) in MODEL_LIMITS {
        let key = id.to_lowercase();
        if key.contains(&needle) || needle.contains(&key) {
            debug!(model = %model_id, matched = %id, "fuzzy model limit match");
            return *limit;
        }
    }

    debug!(model = %model_id, "unknown model, using default limit");
    DEFAULT_TOKEN_LIMIT
}

/// Exact, case-sensitive registry membership. Stricter than `get_model_limit`.
pub fn is_model_supported(model_id: &str) -> bool {
    MODEL_LIMITS.iter().any(|(id, _)| *id == model_id)
}

/// Owned copy of the registry.
pub fn get_all_models() -> BTreeMap<String, usize> {
    MODEL_LIMITS
        .iter()
        .map(|(id, limit)| (id.to_string(), *limit))
        .collect()
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(get_model_limit("gpt-4"), 8_192);
        assert_eq!(get_model_limit("claude-3-opus-20240229"), 200_000);
    }

    #[test]
    fn test_fuzzy_match_both_directions() {
        // id inside a registry key
        assert_eq!(get_model_limit("sonnet-4"), 200_000);
        // registry key inside the id
        assert_eq!(get_model_limit("openai/gpt-3.5-turbo-0125"), 16_385);
        // case-insensitive
        assert_eq!(get_model_limit("GPT-4O"), 128_000);
    }

    #[test]
    fn test_registry_order_breaks_ties() {
        // "gpt-4-turbo-preview" contains both "gpt-4-turbo" and "gpt-4";
        // the earlier entry wins
        assert_eq!(get_model_limit("gpt-4-turbo-preview"), 128_000);
    }

    #[test]
    fn test_default_for_unknown_and_blank() {
        assert_eq!(get_model_limit("llama-70b"), DEFAULT_TOKEN_LIMIT);
        assert_eq!(get_model_limit(""), DEFAULT_TOKEN_LIMIT);
        assert_eq!(get_model_limit("   "), DEFAULT_TOKEN_LIMIT);
    }

    #[test]
    fn test_default_not_above_smallest_limit() {
        let smallest = MODEL_LIMITS.iter().map(|(_, l)| *l).min().unwrap();
        assert!(DEFAULT_TOKEN_LIMIT <= smallest);
    }

    #[test]
    fn test_supported_is_exact_only() {
        assert!(is_model_supported("claude-sonnet-4-20250514"));
        assert!(!is_model_supported("sonnet-4"));
        assert!(!is_model_supported("CLAUDE-SONNET-4-20250514"));
        assert_ne!(get_model_limit("sonnet-4"), DEFAULT_TOKEN_LIMIT);
    }

    #[test]
    fn test_get_all_models_is_a_copy() {
        let mut models = get_all_models();
        assert_eq!(models.len(), MODEL_LIMITS.len());
        models.insert("fake-model".to_string(), 1);
        models.clear();
        assert_eq!(get_all_models().len(), MODEL_LIMITS.len());
        assert!(!is_model_supported("fake-model"));
    }

    #[test]
    fn test_default_model_is_registered() {
        assert!(is_model_supported(DEFAULT_MODEL));
    }
}
