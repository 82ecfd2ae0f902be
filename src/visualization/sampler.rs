//! Sampling lives saved per year from cumulative valuations
//!
//! The valuator gives cumulative lives saved up to any horizon, so the rate
//! on an interval is the finite difference of two valuations with different
//! time limits. Intervals are chosen where the curve changes: window edges,
//! a lead-in point before each edge, and evenly spaced interior samples.
//! The sampled curve is then rescaled so its trapezoidal integral equals the
//! analytic lives saved exactly.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::series::{integrate, VisualizationPoint, VisualizationSeries};
use crate::assumptions::GlobalParameters;
use crate::engine::{weighted_cost_per_life, WeightedEffect};
use crate::valuation::{lives_per_dollar, lives_saved};

/// Interior samples per effect window
pub const INTERIOR_SAMPLES: usize = 20;

/// Years before each window edge at which an extra point is placed
pub const EDGE_LEAD_YEARS: f64 = 1.0;

/// Critical times closer than this are merged
const TIME_TOLERANCE: f64 = 1e-9;

/// Sorted, de-duplicated sample times in `[0, time_limit]`
pub fn critical_times(effects: &[WeightedEffect], time_limit: f64) -> Vec<f64> {
    let mut times = vec![0.0, time_limit];

    for weighted in effects {
        let start = weighted.effect.start_time();
        let end = weighted.effect.end_time();

        for edge in [start, end] {
            times.push(edge);
            times.push(edge - EDGE_LEAD_YEARS);
        }

        let visible_end = end.min(time_limit);
        if visible_end > start {
            let step = (visible_end - start) / INTERIOR_SAMPLES as f64;
            times.extend((1..INTERIOR_SAMPLES).map(|i| start + step * i as f64));
        }
    }

    times.retain(|t| t.is_finite());
    for t in times.iter_mut() {
        *t = t.clamp(0.0, time_limit);
    }
    times.sort_by(f64::total_cmp);
    times.dedup_by(|later, earlier| (*later - *earlier).abs() < TIME_TOLERANCE);
    times
}

/// Lives-saved-per-year series for a donation of `amount` in `donation_year`
///
/// Rates are keyed by effect id; effects sharing an id across categories are
/// accumulated. Each point carries the rate of the interval starting at it,
/// and the last point (the horizon) has rate zero.
pub fn sample_lives_saved(
    effects: &[WeightedEffect],
    params: &GlobalParameters,
    amount: f64,
    donation_year: i32,
) -> VisualizationSeries {
    let times = critical_times(effects, params.time_limit);
    let n = times.len();

    let mut rates: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for weighted in effects {
        let cumulative: Vec<f64> = times
            .iter()
            .map(|&t| {
                let cost = weighted.cost_per_life(&params.with_time_limit(t), donation_year);
                amount * weighted.weight * lives_per_dollar(cost)
            })
            .collect();

        let start = weighted.effect.start_time();
        let end = weighted.effect.end_time();
        let series = rates
            .entry(weighted.effect.effect_id().to_string())
            .or_insert_with(|| vec![0.0; n]);

        // an edge may have been merged into a neighbour within TIME_TOLERANCE
        for i in 0..n.saturating_sub(1) {
            let t = times[i];
            if t < start - TIME_TOLERANCE || t >= end - TIME_TOLERANCE {
                continue;
            }
            series[i] += (cumulative[i + 1] - cumulative[i]) / (times[i + 1] - t);
        }
    }

    let year0 = f64::from(donation_year);
    let mut points: Vec<VisualizationPoint> = times
        .iter()
        .enumerate()
        .map(|(i, &t)| VisualizationPoint {
            year: year0 + t,
            rates: rates.iter().map(|(id, values)| (id.clone(), values[i])).collect(),
        })
        .collect();

    let target = lives_saved(amount, weighted_cost_per_life(effects, params, donation_year));
    let raw_total = integrate(&points);

    if raw_total != 0.0 && raw_total.is_finite() {
        let scale = target / raw_total;
        for point in points.iter_mut() {
            for rate in point.rates.values_mut() {
                *rate *= scale;
            }
        }
        debug!(
            "sampled {} points for {} effect(s), raw total {:.6e} rescaled by {:.6}",
            n,
            effects.len(),
            raw_total,
            scale
        );
    } else if target != 0.0 {
        warn!(
            "sampled series integrates to {} while {} lives are saved; leaving it unscaled",
            raw_total, target
        );
    }

    VisualizationSeries::new(points, rates.into_keys().collect(), target)
}
