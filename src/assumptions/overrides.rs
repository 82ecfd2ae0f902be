//! User-supplied assumption overrides and the pure deep merge onto defaults

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Assumptions, GlobalParameters};
use crate::effects::{
    apply_recipient_effect_to_base, merge_effect_overrides, Category, RecipientCategory,
    RecipientEffectOverride,
};
use crate::error::{ImpactError, ImpactResult};

/// Partial replacement of global parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GlobalParameterOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_per_life: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_population: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_growth_rate: Option<f64>,
    /// `Some(None)` (JSON `null`) removes the cap
    #[serde(
        default,
        deserialize_with = "deserialize_explicit",
        skip_serializing_if = "Option::is_none"
    )]
    pub population_limit: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_population_growth_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_year: Option<i32>,
}

impl GlobalParameterOverrides {
    pub fn apply_to(&self, base: &GlobalParameters) -> GlobalParameters {
        GlobalParameters {
            years_per_life: self.years_per_life.unwrap_or(base.years_per_life),
            discount_rate: self.discount_rate.unwrap_or(base.discount_rate),
            time_limit: self.time_limit.unwrap_or(base.time_limit),
            current_population: self.current_population.unwrap_or(base.current_population),
            population_growth_rate: self
                .population_growth_rate
                .unwrap_or(base.population_growth_rate),
            population_limit: self.population_limit.unwrap_or(base.population_limit),
            historical_population_growth_rate: self
                .historical_population_growth_rate
                .unwrap_or(base.historical_population_growth_rate),
            population_year: self.population_year.unwrap_or(base.population_year),
        }
    }
}

/// Distinguishes an explicit `null` from an absent key
fn deserialize_explicit<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// Partial change to one recipient category allocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipientCategoryOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<RecipientEffectOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipientOverrides {
    #[serde(default)]
    pub categories: BTreeMap<String, RecipientCategoryOverride>,
}

/// Everything a user may customise on top of the published assumptions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssumptionOverrides {
    #[serde(default)]
    pub global: GlobalParameterOverrides,

    /// Effect adjustments per category, keyed by category id
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<RecipientEffectOverride>>,

    #[serde(default)]
    pub recipients: BTreeMap<String, RecipientOverrides>,
}

impl AssumptionOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Assumptions {
    /// Deep-merge user overrides into a new assumption set
    ///
    /// Neither `self` nor `overrides` is modified. The merged result is
    /// validated before it is returned.
    pub fn merged(&self, overrides: &AssumptionOverrides) -> ImpactResult<Assumptions> {
        let global = overrides.global.apply_to(&self.global);

        let mut categories = self.categories.clone();
        for (category_id, adjustments) in &overrides.categories {
            let base = self
                .categories
                .get(category_id)
                .ok_or_else(|| ImpactError::UnknownCategory(category_id.clone()))?;
            let merged = merge_category(category_id, base, adjustments)?;
            categories.insert(category_id.clone(), merged);
        }

        let mut recipients = self.recipients.clone();
        for (recipient_id, recipient_overrides) in &overrides.recipients {
            let recipient = recipients
                .get_mut(recipient_id)
                .ok_or_else(|| ImpactError::UnknownRecipient(recipient_id.clone()))?;

            for (category_id, category_override) in &recipient_overrides.categories {
                let context = format!("recipient {} category {}", recipient_id, category_id);
                let merged = match recipient.categories.get(category_id) {
                    Some(base) => merge_recipient_category(base, category_override),
                    None => RecipientCategory {
                        fraction: category_override.fraction.ok_or(ImpactError::InvalidField {
                            context,
                            field: "fraction".to_string(),
                            value: f64::NAN,
                            reason: "must be set for a newly added category",
                        })?,
                        effects: category_override.effects.clone(),
                    },
                };
                recipient.categories.insert(category_id.clone(), merged);
            }
        }

        let result = Assumptions {
            global,
            categories,
            recipients,
        };
        result.validate()?;

        debug!(
            "merged overrides: {} categor(ies), {} recipient(s) adjusted",
            overrides.categories.len(),
            overrides.recipients.len()
        );

        Ok(result)
    }
}

fn merge_category(
    category_id: &str,
    base: &Category,
    adjustments: &[RecipientEffectOverride],
) -> ImpactResult<Category> {
    let context = format!("category {}", category_id);

    if let Some(unknown) = adjustments.iter().find(|a| base.effect(&a.effect_id).is_none()) {
        return Err(ImpactError::UnknownEffect {
            context,
            effect_id: unknown.effect_id.clone(),
        });
    }

    let mut effects = Vec::with_capacity(base.effects.len());
    for effect in &base.effects {
        match adjustments.iter().find(|a| a.effect_id == effect.effect_id()) {
            Some(adjustment) if adjustment.is_disabled() => {}
            Some(adjustment) => {
                effects.push(apply_recipient_effect_to_base(effect, adjustment, &context)?)
            }
            None => effects.push(effect.clone()),
        }
    }

    Ok(Category {
        name: base.name.clone(),
        effects,
    })
}

fn merge_recipient_category(
    base: &RecipientCategory,
    user: &RecipientCategoryOverride,
) -> RecipientCategory {
    let mut effects: Vec<RecipientEffectOverride> = base
        .effects
        .iter()
        .map(|existing| {
            match user.effects.iter().find(|u| u.effect_id == existing.effect_id) {
                Some(adjustment) => merge_effect_overrides(existing, adjustment),
                None => existing.clone(),
            }
        })
        .collect();

    for adjustment in &user.effects {
        if !base.effects.iter().any(|e| e.effect_id == adjustment.effect_id) {
            effects.push(adjustment.clone());
        }
    }

    RecipientCategory {
        fraction: user.fraction.unwrap_or(base.fraction),
        effects,
    }
}
