//! Harmonic combination of costs per life
//!
//! Independent effects add lives per dollar, so costs combine like parallel
//! resistances: `1 / Σ(1/cᵢ)` with `1/∞ = 0`.

/// Lives per dollar for a cost per life, with `1/∞ = 0`
pub fn lives_per_dollar(cost_per_life: f64) -> f64 {
    if cost_per_life.is_infinite() {
        0.0
    } else {
        1.0 / cost_per_life
    }
}

/// Cost per life for a lives-per-dollar rate; a zero rate is `∞`
pub fn cost_from_lives_per_dollar(rate: f64) -> f64 {
    if rate == 0.0 {
        f64::INFINITY
    } else {
        1.0 / rate
    }
}

/// Combine several costs per life into one
///
/// All-infinite input, an empty input, and reciprocals that cancel to exactly
/// zero all give `f64::INFINITY`: no net measurable effect.
pub fn combine_costs_per_life<I>(costs: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    cost_from_lives_per_dollar(costs.into_iter().map(lives_per_dollar).sum())
}

/// Combine `(weight, cost)` pairs as `1 / Σ(wᵢ/cᵢ)`
pub fn combine_weighted_costs_per_life<I>(weighted: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    cost_from_lives_per_dollar(
        weighted
            .into_iter()
            .map(|(weight, cost)| weight * lives_per_dollar(cost))
            .sum(),
    )
}
