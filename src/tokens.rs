//! Approximate token counting and safety-margined limit checks.
//!
//! Counting is a swappable strategy. No tokenizer encoding ships with the
//! crate, so the default is a conservative characters-per-token heuristic.

/// Characters per token for English text with GPT/Claude-family tokenizers.
pub const CHARS_PER_TOKEN: usize = 4;

/// Share of the model limit treated as usable, in percent.
pub const SAFETY_MARGIN_PERCENT: usize = 95;

/// A token counting strategy.
///
/// `try_count` returns `None` when the strategy cannot count (for example a
/// tokenizer whose encoding failed to load); callers then fall back to
/// `CharHeuristic`.
pub trait TokenCounter: Send + Sync {
    fn try_count(&self, text: &str) -> Option<usize>;
}

/// `len / 4`, rounded down. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristic;

impl TokenCounter for CharHeuristic {
    fn try_count(&self, text: &str) -> Option<usize> {
        Some(text.len() / CHARS_PER_TOKEN)
    }
}

/// Outcome of `check_token_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TokenCheck {
    pub within_limit: bool,
    pub token_count: usize,
    pub safe_limit: usize,
}

/// Count tokens with the built-in heuristic.
pub fn count_tokens(text: &str) -> usize {
    count_tokens_with(None, text)
}

/// Count tokens with `primary`, falling back to the heuristic when it is
/// absent or cannot count.
pub fn count_tokens_with(primary: Option<&dyn TokenCounter>, text: &str) -> usize {
    if let Some(count) = primary.and_then(|counter| counter.try_count(text)) {
        return count;
    }
    text.len() / CHARS_PER_TOKEN
}

/// `floor(model_limit * 0.95)`.
pub fn get_safe_token_limit(model_limit: usize) -> usize {
    // integer math keeps the floor exact
    (model_limit as u128 * SAFETY_MARGIN_PERCENT as u128 / 100) as usize
}

pub fn check_token_limit(text: &str, model_limit: usize) -> TokenCheck {
    check_count(count_tokens(text), model_limit)
}

/// Limit check for an already-computed count.
pub fn check_count(token_count: usize, model_limit: usize) -> TokenCheck {
    let safe_limit = get_safe_token_limit(model_limit);
    TokenCheck {
        within_limit: token_count <= safe_limit,
        token_count,
        safe_limit,
    }
}

/// How far `token_count` exceeds `model_limit`, in percent. Negative when
/// under the limit; 0 for a zero limit.
pub fn calculate_overage_percentage(token_count: usize, model_limit: usize) -> f64 {
    if model_limit == 0 {
        return 0.0;
    }
    (token_count as f64 - model_limit as f64) / model_limit as f64 * 100.0
}
