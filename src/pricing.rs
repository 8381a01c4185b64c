//! Token-to-dollars conversion for the generation models in use.
//!
//! Prices are USD per million tokens, with an extra per-request grounding fee
//! on the search-grounded URL model after its daily free allowance. The free
//! grounding quota is applied per operation: `estimate_cost` prices one
//! operation's request count, and the session ledger sums already-priced
//! operations without revisiting the quota.

/// Default model for the batched URL-repair operation.
pub const URL_MODEL: &str = "gemini-2.5-flash";
/// Default model for per-row dossier generation.
pub const DOSSIER_MODEL: &str = "gemini-2.5-pro";

/// Per-model price sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// USD per million input tokens.
    pub input_per_mtok: f64,
    /// USD per million output tokens.
    pub output_per_mtok: f64,
    /// USD per thousand grounded requests past the free allowance.
    pub grounding_per_1k: f64,
    /// Grounded requests per day with no charge.
    pub free_grounding_per_day: u64,
}

const FLASH_PRICING: ModelPricing = ModelPricing {
    input_per_mtok: 0.30,
    output_per_mtok: 2.50,
    grounding_per_1k: 35.0,
    free_grounding_per_day: 1500,
};

const PRO_PRICING: ModelPricing = ModelPricing {
    input_per_mtok: 1.25,
    output_per_mtok: 10.0,
    grounding_per_1k: 0.0,
    free_grounding_per_day: 0,
};

/// Price sheet for a model id, defaulting unknown models to the flash tier.
pub fn pricing_for(model: &str) -> ModelPricing {
    if model.contains("pro") {
        PRO_PRICING
    } else {
        FLASH_PRICING
    }
}

/// Estimated USD cost for one operation's token and request counts.
pub fn estimate_cost(
    pricing: &ModelPricing,
    input_tokens: u64,
    output_tokens: u64,
    api_requests: u64,
) -> f64 {
    let input_cost = input_tokens as f64 / 1e6 * pricing.input_per_mtok;
    let output_cost = output_tokens as f64 / 1e6 * pricing.output_per_mtok;
    let billable = api_requests.saturating_sub(pricing.free_grounding_per_day);
    let grounding_cost = billable as f64 / 1000.0 * pricing.grounding_per_1k;
    input_cost + output_cost + grounding_cost
}
