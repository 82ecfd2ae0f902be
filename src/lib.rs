//! Donation Impact - valuation engine for charitable donations
//!
//! This library provides:
//! - Closed-form discounted valuation of QALY and population effects
//! - A population growth model with historical, growing, and capped regimes
//! - Harmonic combination of effects into a single cost per life
//! - Recipient-specific overrides and a pure deep merge of user assumptions
//! - Lives-saved-per-year series for charting, normalized to the analytic total
//! - Parallel ranking of recipients and categories

pub mod assumptions;
pub mod effects;
pub mod engine;
pub mod error;
pub mod ranking;
pub mod valuation;
pub mod visualization;

// Re-export commonly used types
pub use assumptions::{AssumptionOverrides, Assumptions, GlobalParameters};
pub use effects::{Category, Effect, Recipient, RecipientEffectOverride};
pub use engine::{ImpactEngine, ImpactTarget, WeightedEffect};
pub use error::{ImpactError, LoadError};
pub use valuation::{combine_costs_per_life, effect_cost_per_life};
pub use visualization::{VisualizationPoint, VisualizationSeries};
