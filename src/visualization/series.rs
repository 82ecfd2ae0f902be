//! Sampled lives-saved series

use std::collections::BTreeMap;

use serde::Serialize;

/// Lives saved per year by each effect at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationPoint {
    /// Calendar year, possibly fractional
    pub year: f64,

    /// Lives saved per year, keyed by effect id
    #[serde(flatten)]
    pub rates: BTreeMap<String, f64>,
}

impl VisualizationPoint {
    pub fn total_rate(&self) -> f64 {
        self.rates.values().sum()
    }
}

/// Finite, single-pass sequence of points in strictly increasing year order
///
/// Consumed by iteration; request a new series from the engine to replay it.
#[derive(Debug)]
pub struct VisualizationSeries {
    points: std::vec::IntoIter<VisualizationPoint>,
    effect_ids: Vec<String>,
    total_lives_saved: f64,
}

impl VisualizationSeries {
    pub(crate) fn new(
        points: Vec<VisualizationPoint>,
        effect_ids: Vec<String>,
        total_lives_saved: f64,
    ) -> Self {
        Self {
            points: points.into_iter(),
            effect_ids,
            total_lives_saved,
        }
    }

    /// Effect ids present in every point, sorted
    pub fn effect_ids(&self) -> &[String] {
        &self.effect_ids
    }

    /// Analytic lives saved the series integrates to
    pub fn total_lives_saved(&self) -> f64 {
        self.total_lives_saved
    }
}

impl Iterator for VisualizationSeries {
    type Item = VisualizationPoint;

    fn next(&mut self) -> Option<Self::Item> {
        self.points.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}

impl ExactSizeIterator for VisualizationSeries {}

/// Trapezoidal integral of one effect's rate over the points
pub fn integrate_effect(points: &[VisualizationPoint], effect_id: &str) -> f64 {
    trapezoid(points, |p| p.rates.get(effect_id).copied().unwrap_or(0.0))
}

/// Trapezoidal integral of the summed rate over the points
pub fn integrate(points: &[VisualizationPoint]) -> f64 {
    trapezoid(points, VisualizationPoint::total_rate)
}

fn trapezoid(points: &[VisualizationPoint], value: impl Fn(&VisualizationPoint) -> f64) -> f64 {
    points
        .windows(2)
        .map(|pair| (value(&pair[0]) + value(&pair[1])) / 2.0 * (pair[1].year - pair[0].year))
        .sum()
}
