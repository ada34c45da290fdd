//! Pre-flight token and cost estimation.
//!
//! The heuristic (≈4 characters per token for English prose) is deliberately
//! rough — it feeds a printout that helps a caller decide whether to dispatch
//! a batch at all, not billing.

/// Approximate token count for a piece of English text.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    if chars == 0 {
        0
    } else {
        (chars / 4).max(1)
    }
}

/// Per-million-token prices for one model tier.
#[derive(Debug, Clone, Copy)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Estimated usage and cost for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub usd: f64,
}

/// Estimate the cost of classifying every prompt once.
///
/// `output_tokens_per_item` covers the short structured answer (a handful of
/// tokens for a single label).
pub fn estimate_batch_cost<'a>(
    prompts: impl IntoIterator<Item = &'a str>,
    output_tokens_per_item: usize,
    pricing: Pricing,
) -> CostEstimate {
    let mut input_tokens = 0usize;
    let mut items = 0usize;
    for prompt in prompts {
        input_tokens += estimate_tokens(prompt);
        items += 1;
    }
    let output_tokens = items * output_tokens_per_item;

    let usd = input_tokens as f64 / 1_000_000.0 * pricing.input_per_million
        + output_tokens as f64 / 1_000_000.0 * pricing.output_per_million;

    CostEstimate { input_tokens, output_tokens, usd }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn short_text_rounds_up_to_one_token() {
        assert_eq!(estimate_tokens("ok"), 1);
    }

    #[test]
    fn four_chars_per_token() {
        assert_eq!(estimate_tokens("a".repeat(400).as_str()), 100);
    }

    #[test]
    fn batch_cost_sums_inputs_and_outputs() {
        let prompts = ["a".repeat(400), "b".repeat(800)];
        let est = estimate_batch_cost(
            prompts.iter().map(String::as_str),
            10,
            Pricing { input_per_million: 2.0, output_per_million: 8.0 },
        );
        assert_eq!(est.input_tokens, 300);
        assert_eq!(est.output_tokens, 20);
        let expected = 300.0 / 1e6 * 2.0 + 20.0 / 1e6 * 8.0;
        assert!((est.usd - expected).abs() < 1e-12);
    }
}
