//! Time series of lives saved per year for charting

mod sampler;
mod series;

pub use sampler::{critical_times, sample_lives_saved, EDGE_LEAD_YEARS, INTERIOR_SAMPLES};
pub use series::{integrate, integrate_effect, VisualizationPoint, VisualizationSeries};
