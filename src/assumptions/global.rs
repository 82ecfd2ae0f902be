//! Global economic and demographic assumptions

use serde::{Deserialize, Serialize};

use crate::error::{ImpactError, ImpactResult};

/// Long-run world population growth used for years before `population_year`
pub const DEFAULT_HISTORICAL_GROWTH_RATE: f64 = 0.01;

fn default_historical_growth_rate() -> f64 {
    DEFAULT_HISTORICAL_GROWTH_RATE
}

/// Assumptions shared by every effect valuation
///
/// Immutable per call. The calendar year the population figure refers to is
/// carried explicitly; nothing in the engine reads the wall clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalParameters {
    /// Years of healthy life that make up one statistical life
    pub years_per_life: f64,

    /// Annual discount rate (may be zero or negative, must exceed -1)
    pub discount_rate: f64,

    /// Valuation horizon in years after the donation
    pub time_limit: f64,

    /// Population at `population_year`
    pub current_population: f64,

    /// Annual growth rate from `population_year` onward
    pub population_growth_rate: f64,

    /// Cap on future population as a multiple of `current_population`
    /// Only binds when `population_growth_rate > 0`
    #[serde(default)]
    pub population_limit: Option<f64>,

    /// Annual growth rate before `population_year`
    #[serde(default = "default_historical_growth_rate")]
    pub historical_population_growth_rate: f64,

    /// Calendar year at which `current_population` is measured
    pub population_year: i32,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self {
            years_per_life: 50.0,
            discount_rate: 0.02,
            time_limit: 100.0,
            current_population: 8e9,
            population_growth_rate: 0.01,
            population_limit: Some(2.0),
            historical_population_growth_rate: DEFAULT_HISTORICAL_GROWTH_RATE,
            population_year: 2020,
        }
    }
}

impl GlobalParameters {
    /// Same assumptions with a different horizon
    pub fn with_time_limit(&self, time_limit: f64) -> Self {
        Self {
            time_limit,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> ImpactResult<()> {
        check("yearsPerLife", self.years_per_life, self.years_per_life > 0.0, "must be > 0")?;
        check("discountRate", self.discount_rate, self.discount_rate > -1.0, "must be > -1")?;
        check("timeLimit", self.time_limit, self.time_limit > 0.0, "must be > 0")?;
        check(
            "currentPopulation",
            self.current_population,
            self.current_population > 0.0,
            "must be > 0",
        )?;
        check(
            "populationGrowthRate",
            self.population_growth_rate,
            self.population_growth_rate > -1.0,
            "must be > -1",
        )?;
        check(
            "historicalPopulationGrowthRate",
            self.historical_population_growth_rate,
            self.historical_population_growth_rate > -1.0,
            "must be > -1",
        )?;
        if let Some(limit) = self.population_limit {
            check("populationLimit", limit, limit >= 1.0, "must be >= 1")?;
        }
        Ok(())
    }
}

fn check(field: &str, value: f64, ok: bool, reason: &'static str) -> ImpactResult<()> {
    if value.is_finite() && ok {
        Ok(())
    } else {
        Err(ImpactError::InvalidField {
            context: "global parameters".to_string(),
            field: field.to_string(),
            value,
            reason,
        })
    }
}
