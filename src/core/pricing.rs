//! Pricing data and quota computation.
//!
//! Turns normalized usage plus a pricing record into an integer quota
//! charge. Pricing records are supplied by an external collaborator per
//! (channel, model) pair and are immutable for the duration of one probe.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::core::channel::Channel;
use crate::core::usage::NormalizedUsage;
use crate::error::Result;

/// Quota units charged per one unit of flat model price.
pub const QUOTA_PER_UNIT: f64 = 500_000.0;

// =============================================================================
// Price Data
// =============================================================================

/// Pricing record for one (channel, model) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceData {
    /// Multiplier applied to the token total.
    pub model_ratio: f64,
    /// Multiplier applied to completion tokens before the model ratio.
    pub completion_ratio: f64,
    /// Multiplier for cached prompt tokens.
    pub cache_ratio: f64,
    /// Multiplier for the billing group.
    pub group_ratio: f64,
    /// Special-case group multiplier, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_special_ratio: Option<f64>,
    /// Flat price per call, used when `use_price` is set.
    pub model_price: f64,
    /// Selects flat-price billing over ratio-based billing.
    pub use_price: bool,
}

impl Default for PriceData {
    fn default() -> Self {
        Self {
            model_ratio: 1.0,
            completion_ratio: 1.0,
            cache_ratio: 1.0,
            group_ratio: 1.0,
            group_special_ratio: None,
            model_price: 0.0,
            use_price: false,
        }
    }
}

// =============================================================================
// Quota Computation
// =============================================================================

/// Round half away from zero, matching the reference arithmetic.
fn round_half(value: f64) -> i64 {
    // f64::round ties away from zero.
    #[allow(clippy::cast_possible_truncation)]
    {
        value.round() as i64
    }
}

/// Compute the integer quota charge for one completed call.
///
/// Flat pricing charges `round(model_price * QUOTA_PER_UNIT)` regardless of
/// token counts. Ratio pricing bills completion tokens through the
/// completion ratio first, then the token total through the model ratio;
/// rounding happens at each stage, not once at the end. Any ratio-priced
/// call with a nonzero model ratio charges at least 1.
#[must_use]
pub fn compute_quota(usage: &NormalizedUsage, price: &PriceData) -> i64 {
    if price.use_price {
        return round_half(price.model_price * QUOTA_PER_UNIT);
    }

    let billed_completion = round_half(usage.completion_tokens as f64 * price.completion_ratio);
    let mut quota = round_half((usage.prompt_tokens + billed_completion) as f64 * price.model_ratio);
    if price.model_ratio != 0.0 && quota <= 0 {
        quota = 1;
    }
    quota
}

// =============================================================================
// Pricing Boundary
// =============================================================================

/// External pricing collaborator.
pub trait PricingSource: Send + Sync {
    /// Pricing record for `model` on this channel.
    fn price(&self, channel: &Channel, model: &str) -> Result<PriceData>;
}

/// Pricing source backed by a per-model map, with a default record for
/// unlisted models.
#[derive(Debug, Default)]
pub struct MemoryPricingSource {
    prices: RwLock<HashMap<String, PriceData>>,
}

impl MemoryPricingSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pricing record for a model.
    pub fn insert(&self, model: &str, price: PriceData) {
        self.prices
            .write()
            .expect("pricing lock poisoned")
            .insert(model.to_string(), price);
    }
}

impl PricingSource for MemoryPricingSource {
    fn price(&self, _channel: &Channel, model: &str) -> Result<PriceData> {
        Ok(self
            .prices
            .read()
            .expect("pricing lock poisoned")
            .get(model)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_pricing_rounds_at_each_stage() {
        let usage = NormalizedUsage::new(100, 50);
        let price = PriceData {
            model_ratio: 2.0,
            completion_ratio: 1.5,
            ..PriceData::default()
        };
        // round(50 * 1.5) = 75; (100 + 75) * 2 = 350
        assert_eq!(compute_quota(&usage, &price), 350);
    }

    #[test]
    fn ratio_pricing_clamps_rounding_underflow_to_one() {
        let usage = NormalizedUsage::new(0, 0);
        let price = PriceData {
            model_ratio: 0.01,
            ..PriceData::default()
        };
        assert_eq!(compute_quota(&usage, &price), 1);
    }

    #[test]
    fn zero_model_ratio_charges_nothing() {
        let usage = NormalizedUsage::new(100, 100);
        let price = PriceData {
            model_ratio: 0.0,
            ..PriceData::default()
        };
        assert_eq!(compute_quota(&usage, &price), 0);
    }

    #[test]
    fn flat_pricing_ignores_usage() {
        let price = PriceData {
            use_price: true,
            model_price: 0.002,
            ..PriceData::default()
        };
        assert_eq!(compute_quota(&NormalizedUsage::new(0, 0), &price), 1000);
        assert_eq!(
            compute_quota(&NormalizedUsage::new(100_000, 50_000), &price),
            1000
        );
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let usage = NormalizedUsage::new(0, 1);
        let price = PriceData {
            model_ratio: 1.0,
            completion_ratio: 0.5,
            ..PriceData::default()
        };
        // round(1 * 0.5) = 1 (ties away from zero), (0 + 1) * 1 = 1
        assert_eq!(compute_quota(&usage, &price), 1);
    }

    #[test]
    fn memory_pricing_defaults_unlisted_models() {
        let source = MemoryPricingSource::new();
        let channel = crate::test_utils::make_test_channel(1, crate::core::channel::ChannelType::OpenAI);
        let price = source.price(&channel, "unlisted").unwrap();
        assert!((price.model_ratio - 1.0).abs() < f64::EPSILON);
        assert!(!price.use_price);
    }
}
