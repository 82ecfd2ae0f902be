//! Impact engine: resolves categories and recipients to effects and values them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assumptions::{Assumptions, GlobalParameters};
use crate::effects::{apply_recipient_effect_to_base, Effect};
use crate::error::{ImpactError, ImpactResult};
use crate::valuation::{combine_weighted_costs_per_life, effect_cost_per_life, lives_saved};
use crate::visualization::{sample_lives_saved, VisualizationSeries};

/// What a donation is given to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ImpactTarget {
    Category(String),
    Recipient(String),
}

impl ImpactTarget {
    pub fn id(&self) -> &str {
        match self {
            ImpactTarget::Category(id) | ImpactTarget::Recipient(id) => id,
        }
    }
}

impl fmt::Display for ImpactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactTarget::Category(id) => write!(f, "category {}", id),
            ImpactTarget::Recipient(id) => write!(f, "recipient {}", id),
        }
    }
}

/// An effect together with the share of each donated dollar that funds it
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEffect {
    pub category_id: String,
    pub weight: f64,
    pub effect: Effect,
}

impl WeightedEffect {
    /// Cost per life of this effect alone, before weighting
    pub fn cost_per_life(&self, params: &GlobalParameters, donation_year: i32) -> f64 {
        effect_cost_per_life(&self.effect, params, donation_year)
    }
}

/// Valuation engine over a validated assumption set
#[derive(Debug, Clone)]
pub struct ImpactEngine {
    assumptions: Assumptions,
}

impl ImpactEngine {
    /// Create a new engine; the assumptions are validated first
    pub fn new(assumptions: Assumptions) -> ImpactResult<Self> {
        assumptions.validate()?;
        Ok(Self { assumptions })
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    pub fn global(&self) -> &GlobalParameters {
        &self.assumptions.global
    }

    /// Effects funded by a donation to `target`
    ///
    /// A category funds its own effects at weight 1. A recipient funds each
    /// of its categories' effects, with its overrides applied and disabled
    /// effects dropped, weighted by the category fraction.
    pub fn resolve_effects(&self, target: &ImpactTarget) -> ImpactResult<Vec<WeightedEffect>> {
        match target {
            ImpactTarget::Category(category_id) => {
                let category = self.assumptions.category(category_id)?;
                Ok(category
                    .effects
                    .iter()
                    .map(|effect| WeightedEffect {
                        category_id: category_id.clone(),
                        weight: 1.0,
                        effect: effect.clone(),
                    })
                    .collect())
            }
            ImpactTarget::Recipient(recipient_id) => {
                let recipient = self.assumptions.recipient(recipient_id)?;
                let mut resolved = Vec::new();

                for (category_id, allocation) in &recipient.categories {
                    let context = format!("recipient {} category {}", recipient_id, category_id);
                    let category = self.assumptions.category(category_id)?;

                    for base in &category.effects {
                        let adjustment = allocation
                            .effects
                            .iter()
                            .find(|a| a.effect_id == base.effect_id());
                        let effect = match adjustment {
                            Some(a) if a.is_disabled() => continue,
                            Some(a) => apply_recipient_effect_to_base(base, a, &context)?,
                            None => base.clone(),
                        };
                        resolved.push(WeightedEffect {
                            category_id: category_id.clone(),
                            weight: allocation.fraction,
                            effect,
                        });
                    }

                    if let Some(orphan) = allocation
                        .effects
                        .iter()
                        .find(|a| category.effect(&a.effect_id).is_none())
                    {
                        return Err(ImpactError::UnknownEffect {
                            context,
                            effect_id: orphan.effect_id.clone(),
                        });
                    }
                }

                Ok(resolved)
            }
        }
    }

    /// Dollars per statistical life for a donation to `target` in `donation_year`
    pub fn cost_per_life(&self, target: &ImpactTarget, donation_year: i32) -> ImpactResult<f64> {
        let effects = self.resolve_effects(target)?;
        Ok(weighted_cost_per_life(&effects, self.global(), donation_year))
    }

    /// Statistical lives saved by donating `amount` to `target`
    pub fn lives_saved(
        &self,
        target: &ImpactTarget,
        amount: f64,
        donation_year: i32,
    ) -> ImpactResult<f64> {
        Ok(lives_saved(amount, self.cost_per_life(target, donation_year)?))
    }

    /// Lives-saved-per-year series for charting, normalized to the analytic total
    pub fn visualize(
        &self,
        target: &ImpactTarget,
        amount: f64,
        donation_year: i32,
    ) -> ImpactResult<VisualizationSeries> {
        let effects = self.resolve_effects(target)?;
        Ok(sample_lives_saved(&effects, self.global(), amount, donation_year))
    }
}

/// `1 / Σ(wᵢ/cᵢ)` over resolved effects
pub fn weighted_cost_per_life(
    effects: &[WeightedEffect],
    params: &GlobalParameters,
    donation_year: i32,
) -> f64 {
    combine_weighted_costs_per_life(
        effects
            .iter()
            .map(|e| (e.weight, e.cost_per_life(params, donation_year))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{
        Category, EffectField, PopulationEffect, QalyEffect, Recipient, RecipientCategory,
        RecipientEffectOverride,
    };
    use crate::valuation::effects_cost_per_life;
    use crate::visualization::integrate;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn qaly(id: &str, start_time: f64, window_length: f64, cost_per_qaly: f64) -> Effect {
        Effect::Qaly(QalyEffect {
            effect_id: id.into(),
            start_time,
            window_length,
            cost_per_qaly,
        })
    }

    fn test_assumptions(adjustments: Vec<RecipientEffectOverride>) -> Assumptions {
        let mut assumptions = Assumptions::default();
        assumptions.categories.insert(
            "malaria".into(),
            Category::new(vec![qaly("health", 0.0, 10.0, 100.0), qaly("income", 5.0, 20.0, 300.0)]),
        );
        assumptions.categories.insert(
            "biosecurity".into(),
            Category::new(vec![Effect::Population(PopulationEffect {
                effect_id: "risk".into(),
                start_time: 2.0,
                window_length: 30.0,
                cost_per_microprobability: 5e5,
                population_fraction_affected: 1.0,
                qaly_improvement_per_year: 0.5,
            })]),
        );

        let mut categories = BTreeMap::new();
        categories.insert(
            "malaria".to_string(),
            RecipientCategory {
                fraction: 0.75,
                effects: adjustments,
            },
        );
        categories.insert(
            "biosecurity".to_string(),
            RecipientCategory {
                fraction: 0.25,
                effects: vec![],
            },
        );
        assumptions
            .recipients
            .insert("mixed".into(), Recipient { name: None, categories });
        assumptions
    }

    #[test]
    fn test_category_cost_matches_combiner() {
        let assumptions = test_assumptions(vec![]);
        let engine = ImpactEngine::new(assumptions.clone()).unwrap();
        let target = ImpactTarget::Category("malaria".into());

        let expected = effects_cost_per_life(
            &assumptions.categories["malaria"].effects,
            &assumptions.global,
            2024,
        );
        assert_relative_eq!(
            engine.cost_per_life(&target, 2024).unwrap(),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_recipient_weights_by_fraction() {
        let engine = ImpactEngine::new(test_assumptions(vec![])).unwrap();
        let malaria = engine
            .cost_per_life(&ImpactTarget::Category("malaria".into()), 2024)
            .unwrap();
        let bio = engine
            .cost_per_life(&ImpactTarget::Category("biosecurity".into()), 2024)
            .unwrap();

        let recipient = engine
            .cost_per_life(&ImpactTarget::Recipient("mixed".into()), 2024)
            .unwrap();
        assert_relative_eq!(recipient, 1.0 / (0.75 / malaria + 0.25 / bio), max_relative = 1e-12);
    }

    #[test]
    fn test_recipient_overrides_applied() {
        let engine = ImpactEngine::new(test_assumptions(vec![
            RecipientEffectOverride::new("health").with_multiplier(EffectField::CostPerQaly, 2.0),
            RecipientEffectOverride::new("income").disabled(),
        ]))
        .unwrap();

        let effects = engine
            .resolve_effects(&ImpactTarget::Recipient("mixed".into()))
            .unwrap();
        let ids: Vec<_> = effects.iter().map(|e| e.effect.effect_id()).collect();
        assert_eq!(ids, vec!["risk", "health"]);

        let health = effects.iter().find(|e| e.effect.effect_id() == "health").unwrap();
        assert_eq!(health.effect.field(EffectField::CostPerQaly), Some(200.0));
        assert_eq!(health.weight, 0.75);

        // the category itself is unchanged
        let base = engine
            .resolve_effects(&ImpactTarget::Category("malaria".into()))
            .unwrap();
        assert_eq!(base[0].effect.field(EffectField::CostPerQaly), Some(100.0));
    }

    #[test]
    fn test_unknown_targets() {
        let engine = ImpactEngine::new(test_assumptions(vec![])).unwrap();
        assert_eq!(
            engine.cost_per_life(&ImpactTarget::Category("nope".into()), 2024),
            Err(ImpactError::UnknownCategory("nope".into()))
        );
        assert_eq!(
            engine.cost_per_life(&ImpactTarget::Recipient("nope".into()), 2024),
            Err(ImpactError::UnknownRecipient("nope".into()))
        );
    }

    #[test]
    fn test_invalid_assumptions_rejected() {
        let mut assumptions = test_assumptions(vec![]);
        assumptions.global.years_per_life = 0.0;
        assert!(ImpactEngine::new(assumptions).is_err());
    }

    #[test]
    fn test_lives_saved_for_all_disabled_recipient() {
        let mut assumptions = test_assumptions(vec![
            RecipientEffectOverride::new("health").disabled(),
            RecipientEffectOverride::new("income").disabled(),
        ]);
        assumptions
            .recipients
            .get_mut("mixed")
            .unwrap()
            .categories
            .remove("biosecurity");
        let engine = ImpactEngine::new(assumptions).unwrap();
        let target = ImpactTarget::Recipient("mixed".into());
        assert_eq!(engine.cost_per_life(&target, 2024).unwrap(), f64::INFINITY);
        assert_eq!(engine.lives_saved(&target, 1000.0, 2024).unwrap(), 0.0);
    }

    #[test]
    fn test_recipient_series_integrates_to_lives_saved() {
        let engine = ImpactEngine::new(test_assumptions(vec![
            RecipientEffectOverride::new("income").with_multiplier(EffectField::CostPerQaly, 0.5),
        ]))
        .unwrap();
        let target = ImpactTarget::Recipient("mixed".into());

        let expected = engine.lives_saved(&target, 5000.0, 2024).unwrap();
        let series = engine.visualize(&target, 5000.0, 2024).unwrap();
        assert_eq!(series.effect_ids(), ["health", "income", "risk"]);
        assert_relative_eq!(series.total_lives_saved(), expected, max_relative = 1e-12);

        let points: Vec<_> = series.collect();
        assert_relative_eq!(integrate(&points), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(ImpactTarget::Recipient("amf".into()).to_string(), "recipient amf");
        assert_eq!(ImpactTarget::Category("x".into()).id(), "x");
    }
}
