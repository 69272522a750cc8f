//! Pricing configuration.

use serde::{Deserialize, Serialize};

/// Credits debited per generation in the reference deployment.
pub const DEFAULT_CREDITS_PER_GENERATION: i64 = 10;

/// Pricing knobs, read once at startup.
///
/// The per-generation cost is a fixed configuration value read at request
/// time; it is never negotiated per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Credits debited for one image generation.
    pub credits_per_generation: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            credits_per_generation: DEFAULT_CREDITS_PER_GENERATION,
        }
    }
}
