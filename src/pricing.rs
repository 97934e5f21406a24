//! Static model price table and cost estimation
//!
//! Costs are computed from per-million-token input/output rates. Models
//! missing from the table are billed at zero, so an unknown model never
//! fails a turn; it just contributes nothing to the estimated cost.
//!
//! No rounding is applied here. Display formatting (4-6 decimal places)
//! is the caller's concern.

/// Per-million-token pricing for a single model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    /// USD per million prompt tokens
    pub input_per_million: f64,
    /// USD per million completion tokens
    pub output_per_million: f64,
}

/// Compiled-in price table: model identifier to per-million-token rates.
///
/// Kept as a plain slice; the table is small enough that a linear scan
/// beats the overhead of a map.
pub const PRICE_TABLE: &[(&str, PriceEntry)] = &[
    (
        "llama-3.1-8b-instant",
        PriceEntry {
            input_per_million: 0.05,
            output_per_million: 0.08,
        },
    ),
    (
        "llama-3.3-70b-versatile",
        PriceEntry {
            input_per_million: 0.59,
            output_per_million: 0.79,
        },
    ),
    (
        "openai/gpt-oss-20b",
        PriceEntry {
            input_per_million: 0.10,
            output_per_million: 0.50,
        },
    ),
    (
        "openai/gpt-oss-120b",
        PriceEntry {
            input_per_million: 0.15,
            output_per_million: 0.75,
        },
    ),
    (
        "qwen/qwen3-32b",
        PriceEntry {
            input_per_million: 0.29,
            output_per_million: 0.59,
        },
    ),
    (
        "moonshotai/kimi-k2-instruct",
        PriceEntry {
            input_per_million: 1.00,
            output_per_million: 3.00,
        },
    ),
];

/// Look up the price entry for a model
///
/// # Arguments
///
/// * `model` - Model identifier (e.g. "llama-3.1-8b-instant")
///
/// # Returns
///
/// Returns the price entry, or None when the model is not in the table
///
/// # Examples
///
/// ```
/// use chatledger::pricing::price_for;
///
/// assert!(price_for("llama-3.1-8b-instant").is_some());
/// assert!(price_for("foo/bar").is_none());
/// ```
pub fn price_for(model: &str) -> Option<PriceEntry> {
    PRICE_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, entry)| *entry)
}

/// Estimate the dollar cost of a completion
///
/// Unknown models are treated as zero-rated in both directions, which
/// yields a cost of 0 rather than an error.
///
/// # Arguments
///
/// * `model` - Model identifier
/// * `prompt_tokens` - Tokens consumed by the prompt
/// * `completion_tokens` - Tokens produced by the completion
///
/// # Returns
///
/// The estimated cost in USD, unrounded
///
/// # Examples
///
/// ```
/// use chatledger::pricing::estimate_cost;
///
/// let cost = estimate_cost("llama-3.1-8b-instant", 1_000_000, 500_000);
/// assert!((cost - 0.09).abs() < 1e-12);
/// ```
pub fn estimate_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let entry = price_for(model).unwrap_or(PriceEntry {
        input_per_million: 0.0,
        output_per_million: 0.0,
    });

    let input_cost = (prompt_tokens as f64 / 1_000_000.0) * entry.input_per_million;
    let output_cost = (completion_tokens as f64 / 1_000_000.0) * entry.output_per_million;

    input_cost + output_cost
}

/// Estimate token count from text length
///
/// Fallback estimator only: chars / 4 approximates GPT tokenization for
/// English text. Used when no provider-reported usage arrived for a turn;
/// never blended with authoritative counts.
///
/// # Arguments
///
/// * `text` - The text to estimate
/// * `chars_per_token` - Divisor, normally 4 (see `usage.chars_per_token`)
///
/// # Examples
///
/// ```
/// use chatledger::pricing::estimate_tokens_from_chars;
///
/// assert_eq!(estimate_tokens_from_chars("test", 4), 1);
/// assert_eq!(estimate_tokens_from_chars("hello world", 4), 3);
/// ```
pub fn estimate_tokens_from_chars(text: &str, chars_per_token: usize) -> u64 {
    let divisor = chars_per_token.max(1);
    ((text.chars().count() + divisor - 1) / divisor) as u64
}
