//! Population growth model with historical, growing, and capped regimes
//!
//! Time `u` is measured in years from `population_year`, when the population
//! equals `current_population`:
//! - `u <= 0`: historical growth, `P0 (1+h)^u`
//! - `0 < u < u*`: future growth, `P0 (1+g)^u`
//! - `u >= u*`: capped at `P0 L`, where `u* = ln L / ln(1+g)` and only when
//!   a limit is set and `g > 0`
//!
//! Every regime is an exponential in `u`, so the discounted integral of the
//! population is closed form per segment.

use crate::assumptions::GlobalParameters;

use super::discount::{exponential_integral, RATE_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationModel {
    current_population: f64,
    /// ln(1 + historical growth rate)
    historical_log_rate: f64,
    /// ln(1 + future growth rate)
    future_log_rate: f64,
    /// Years after `population_year` at which growth stops
    cap_time: Option<f64>,
}

/// One exponential piece of the trajectory: `scale · e^{log_rate · u}` on `[from, to)`
#[derive(Debug, Clone, Copy)]
struct Segment {
    from: f64,
    to: f64,
    scale: f64,
    log_rate: f64,
}

impl PopulationModel {
    pub fn new(
        current_population: f64,
        growth_rate: f64,
        historical_growth_rate: f64,
        population_limit: Option<f64>,
    ) -> Self {
        let future_log_rate = growth_rate.ln_1p();
        let cap_time = match population_limit {
            Some(limit) if future_log_rate > RATE_EPSILON => Some(limit.ln() / future_log_rate),
            _ => None,
        };
        Self {
            current_population,
            historical_log_rate: historical_growth_rate.ln_1p(),
            future_log_rate,
            cap_time,
        }
    }

    pub fn from_parameters(params: &GlobalParameters) -> Self {
        Self::new(
            params.current_population,
            params.population_growth_rate,
            params.historical_population_growth_rate,
            params.population_limit,
        )
    }

    /// Years from `population_year` until the cap is reached, if it binds
    pub fn cap_time(&self) -> Option<f64> {
        self.cap_time
    }

    /// Population `u` years after `population_year` (negative `u` is the past)
    pub fn population_at(&self, u: f64) -> f64 {
        let segment = self
            .segments()
            .into_iter()
            .find(|s| u < s.to)
            .unwrap_or_else(|| self.segments()[2]);
        segment.scale * (segment.log_rate * u).exp()
    }

    /// `∫_start^end P(t + offset) (1+d)^-t dt`
    ///
    /// `t` counts years from the donation and `offset` is the donation year
    /// minus `population_year`. `discount_log_rate` is `ln(1+d)`.
    pub fn discounted_integral(
        &self,
        discount_log_rate: f64,
        offset: f64,
        start: f64,
        end: f64,
    ) -> f64 {
        if end <= start {
            return 0.0;
        }

        self.segments()
            .iter()
            .map(|segment| {
                // segment bounds in donation time
                let lo = start.max(segment.from - offset);
                let hi = end.min(segment.to - offset);
                if hi <= lo {
                    return 0.0;
                }
                // scale e^{k (t+offset)} e^{-δ t} = scale e^{k offset} e^{(k-δ) t}
                let combined = segment.log_rate - discount_log_rate;
                segment.scale
                    * (segment.log_rate * offset).exp()
                    * exponential_integral(combined, lo, hi - lo)
            })
            .sum()
    }

    fn segments(&self) -> [Segment; 3] {
        let p0 = self.current_population;
        let historical = Segment {
            from: f64::NEG_INFINITY,
            to: 0.0,
            scale: p0,
            log_rate: self.historical_log_rate,
        };
        match self.cap_time {
            Some(cap) => [
                historical,
                Segment {
                    from: 0.0,
                    to: cap,
                    scale: p0,
                    log_rate: self.future_log_rate,
                },
                Segment {
                    from: cap,
                    to: f64::INFINITY,
                    scale: p0 * (self.future_log_rate * cap).exp(),
                    log_rate: 0.0,
                },
            ],
            None => [
                historical,
                Segment {
                    from: 0.0,
                    to: f64::INFINITY,
                    scale: p0,
                    log_rate: self.future_log_rate,
                },
                // empty
                Segment {
                    from: f64::INFINITY,
                    to: f64::INFINITY,
                    scale: 0.0,
                    log_rate: 0.0,
                },
            ],
        }
    }
}
