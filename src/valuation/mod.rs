//! Donation-impact valuation
//!
//! Pure functions from effects and global parameters to a cost per life:
//! 1. **discount**: closed-form discounted sums over year intervals
//! 2. **population**: population trajectory across historical, growing, and
//!    capped regimes
//! 3. **effect**: single-effect cost per life
//! 4. **combine**: harmonic combination across effects
//!
//! `f64::INFINITY` is the "no effect" value throughout and propagates
//! arithmetically (a donation divided by it saves zero lives).

mod combine;
mod discount;
mod effect;
mod population;

pub use combine::{
    combine_costs_per_life, combine_weighted_costs_per_life, cost_from_lives_per_dollar,
    lives_per_dollar,
};
pub use discount::{discount_factor, discounted_sum, discounted_window_sum, RATE_EPSILON};
pub use effect::{effect_cost_per_life, MICROPROBABILITY};
pub use population::PopulationModel;

use crate::assumptions::GlobalParameters;
use crate::effects::Effect;

/// Combined cost per life of several effects funded together
pub fn effects_cost_per_life(
    effects: &[Effect],
    params: &GlobalParameters,
    donation_year: i32,
) -> f64 {
    combine_costs_per_life(
        effects
            .iter()
            .map(|effect| effect_cost_per_life(effect, params, donation_year)),
    )
}

/// Lives saved by `amount` dollars at the given cost per life (0 for `∞`)
pub fn lives_saved(amount: f64, cost_per_life: f64) -> f64 {
    amount * lives_per_dollar(cost_per_life)
}
