//! Single-effect valuation: one effect to a cost per life

use crate::assumptions::GlobalParameters;
use crate::effects::{Effect, PopulationEffect, QalyEffect};

use super::discount::discounted_window_sum;
use super::population::PopulationModel;

/// One unit of `costPerMicroprobability` buys this much probability
pub const MICROPROBABILITY: f64 = 1e-6;

/// Dollars per statistical life for one effect
///
/// Returns `f64::INFINITY` when the effect starts at or beyond the horizon or
/// produces no discounted benefit. Sign is preserved: a negative cost per
/// QALY or a negative QALY improvement yields a negative cost per life.
pub fn effect_cost_per_life(effect: &Effect, params: &GlobalParameters, donation_year: i32) -> f64 {
    if effect.start_time() >= params.time_limit {
        return f64::INFINITY;
    }

    let cost = match effect {
        Effect::Qaly(e) => qaly_cost_per_life(e, params),
        Effect::Population(e) => population_cost_per_life(e, params, donation_year),
    };

    if cost.is_finite() {
        cost
    } else {
        f64::INFINITY
    }
}

/// Window length after truncation at the horizon
fn truncated_length(start_time: f64, window_length: f64, time_limit: f64) -> f64 {
    window_length.min(time_limit - start_time).max(0.0)
}

fn qaly_cost_per_life(effect: &QalyEffect, params: &GlobalParameters) -> f64 {
    let length = truncated_length(effect.start_time, effect.window_length, params.time_limit);
    let discounted = discounted_window_sum(params.discount_rate, effect.start_time, length);
    if discounted == 0.0 {
        return f64::INFINITY;
    }

    // averaged over the untruncated window so truncation only removes benefit
    let average_discount_factor = discounted / effect.window_length;
    effect.cost_per_qaly * params.years_per_life / average_discount_factor
}

fn population_cost_per_life(
    effect: &PopulationEffect,
    params: &GlobalParameters,
    donation_year: i32,
) -> f64 {
    let length = truncated_length(effect.start_time, effect.window_length, params.time_limit);
    let start = effect.start_time;
    let end = start + length;

    let model = PopulationModel::from_parameters(params);
    let offset = f64::from(donation_year - params.population_year);
    let discounted_person_years =
        model.discounted_integral(params.discount_rate.ln_1p(), offset, start, end);

    let total_qalys = effect.population_fraction_affected
        * effect.qaly_improvement_per_year
        * discounted_person_years;

    let lives_per_microprobability = MICROPROBABILITY * total_qalys / params.years_per_life;
    if lives_per_microprobability == 0.0 {
        return f64::INFINITY;
    }

    effect.cost_per_microprobability / lives_per_microprobability
}
