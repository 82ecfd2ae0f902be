//! Effect, category, and recipient records as supplied by the content layer

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{ImpactError, ImpactResult};

/// Effect measured directly in dollars per quality-adjusted life year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QalyEffect {
    pub effect_id: String,

    /// Years after the donation before the effect begins
    pub start_time: f64,

    /// Duration of the effect in years
    pub window_length: f64,

    /// Negative means the intervention saves money while producing QALYs
    #[serde(rename = "costPerQALY")]
    pub cost_per_qaly: f64,
}

/// Effect that shifts the risk of a fraction of the whole population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PopulationEffect {
    pub effect_id: String,
    pub start_time: f64,
    pub window_length: f64,

    /// Dollars per one-in-a-million change in probability
    pub cost_per_microprobability: f64,

    /// Share of the population exposed, in (0, 1]
    pub population_fraction_affected: f64,

    /// QALYs per person per year if the outcome occurs
    #[serde(rename = "qalyImprovementPerYear")]
    pub qaly_improvement_per_year: f64,
}

/// One declarative effect of spending $1/year in a category
///
/// Serialized without a tag: the variant is chosen by which field set is
/// present. A record carrying both sets, neither set, or an unknown key
/// fails to parse with an error naming the effect and the field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Effect {
    Qaly(QalyEffect),
    Population(PopulationEffect),
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawEffect::deserialize(deserializer)?
            .into_effect("", 0)
            .map_err(de::Error::custom)
    }
}

/// Effect record as written, before the variant is known
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEffect {
    effect_id: Option<String>,
    start_time: Option<f64>,
    window_length: Option<f64>,
    #[serde(rename = "costPerQALY")]
    cost_per_qaly: Option<f64>,
    cost_per_microprobability: Option<f64>,
    population_fraction_affected: Option<f64>,
    #[serde(rename = "qalyImprovementPerYear")]
    qaly_improvement_per_year: Option<f64>,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_json::Value>,
}

impl RawEffect {
    /// Resolve the variant; `owner` and `index` locate the record in errors
    fn into_effect(self, owner: &str, index: usize) -> ImpactResult<Effect> {
        let name = match &self.effect_id {
            Some(id) => format!("effect {}", id),
            None => format!("effect #{}", index),
        };
        let context = if owner.is_empty() {
            name
        } else {
            format!("{} {}", owner, name)
        };

        if let Some(field) = self.unknown.keys().next() {
            return Err(ImpactError::UnknownField {
                context,
                field: field.clone(),
            });
        }

        let is_qaly = self.cost_per_qaly.is_some();
        let is_population = self.cost_per_microprobability.is_some()
            || self.population_fraction_affected.is_some()
            || self.qaly_improvement_per_year.is_some();

        let effect_id = required(&context, "effectId", self.effect_id)?;
        let start_time = required(&context, EffectField::StartTime.as_str(), self.start_time)?;
        let window_length =
            required(&context, EffectField::WindowLength.as_str(), self.window_length)?;

        match (is_qaly, is_population) {
            (true, true) => Err(ImpactError::MixedEffectFields { context }),
            (false, false) => Err(ImpactError::MissingField {
                context,
                field: "costPerQALY or costPerMicroprobability",
            }),
            (true, false) => Ok(Effect::Qaly(QalyEffect {
                effect_id,
                start_time,
                window_length,
                cost_per_qaly: required(
                    &context,
                    EffectField::CostPerQaly.as_str(),
                    self.cost_per_qaly,
                )?,
            })),
            (false, true) => Ok(Effect::Population(PopulationEffect {
                effect_id,
                start_time,
                window_length,
                cost_per_microprobability: required(
                    &context,
                    EffectField::CostPerMicroprobability.as_str(),
                    self.cost_per_microprobability,
                )?,
                population_fraction_affected: required(
                    &context,
                    EffectField::PopulationFractionAffected.as_str(),
                    self.population_fraction_affected,
                )?,
                qaly_improvement_per_year: required(
                    &context,
                    EffectField::QalyImprovementPerYear.as_str(),
                    self.qaly_improvement_per_year,
                )?,
            })),
        }
    }
}

fn required<T>(context: &str, field: &'static str, value: Option<T>) -> ImpactResult<T> {
    value.ok_or_else(|| ImpactError::MissingField {
        context: context.to_string(),
        field,
    })
}

/// Numeric effect fields addressable by overrides and multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectField {
    StartTime,
    WindowLength,
    CostPerQaly,
    CostPerMicroprobability,
    PopulationFractionAffected,
    QalyImprovementPerYear,
}

impl EffectField {
    /// All fields in application order
    pub const ALL: [EffectField; 6] = [
        EffectField::StartTime,
        EffectField::WindowLength,
        EffectField::CostPerQaly,
        EffectField::CostPerMicroprobability,
        EffectField::PopulationFractionAffected,
        EffectField::QalyImprovementPerYear,
    ];

    /// Field name as written in content files
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectField::StartTime => "startTime",
            EffectField::WindowLength => "windowLength",
            EffectField::CostPerQaly => "costPerQALY",
            EffectField::CostPerMicroprobability => "costPerMicroprobability",
            EffectField::PopulationFractionAffected => "populationFractionAffected",
            EffectField::QalyImprovementPerYear => "qalyImprovementPerYear",
        }
    }
}

impl Effect {
    pub fn effect_id(&self) -> &str {
        match self {
            Effect::Qaly(e) => &e.effect_id,
            Effect::Population(e) => &e.effect_id,
        }
    }

    pub fn start_time(&self) -> f64 {
        match self {
            Effect::Qaly(e) => e.start_time,
            Effect::Population(e) => e.start_time,
        }
    }

    pub fn window_length(&self) -> f64 {
        match self {
            Effect::Qaly(e) => e.window_length,
            Effect::Population(e) => e.window_length,
        }
    }

    /// Offset of the first year after the window
    pub fn end_time(&self) -> f64 {
        self.start_time() + self.window_length()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Qaly(_) => "QALY",
            Effect::Population(_) => "population",
        }
    }

    /// Read a numeric field; `None` when the field is not part of this variant
    pub fn field(&self, field: EffectField) -> Option<f64> {
        match (self, field) {
            (_, EffectField::StartTime) => Some(self.start_time()),
            (_, EffectField::WindowLength) => Some(self.window_length()),
            (Effect::Qaly(e), EffectField::CostPerQaly) => Some(e.cost_per_qaly),
            (Effect::Population(e), EffectField::CostPerMicroprobability) => {
                Some(e.cost_per_microprobability)
            }
            (Effect::Population(e), EffectField::PopulationFractionAffected) => {
                Some(e.population_fraction_affected)
            }
            (Effect::Population(e), EffectField::QalyImprovementPerYear) => {
                Some(e.qaly_improvement_per_year)
            }
            _ => None,
        }
    }

    /// Mutable access to a numeric field of this variant
    pub(crate) fn field_mut(&mut self, field: EffectField) -> Option<&mut f64> {
        match (self, field) {
            (Effect::Qaly(e), EffectField::StartTime) => Some(&mut e.start_time),
            (Effect::Population(e), EffectField::StartTime) => Some(&mut e.start_time),
            (Effect::Qaly(e), EffectField::WindowLength) => Some(&mut e.window_length),
            (Effect::Population(e), EffectField::WindowLength) => Some(&mut e.window_length),
            (Effect::Qaly(e), EffectField::CostPerQaly) => Some(&mut e.cost_per_qaly),
            (Effect::Population(e), EffectField::CostPerMicroprobability) => {
                Some(&mut e.cost_per_microprobability)
            }
            (Effect::Population(e), EffectField::PopulationFractionAffected) => {
                Some(&mut e.population_fraction_affected)
            }
            (Effect::Population(e), EffectField::QalyImprovementPerYear) => {
                Some(&mut e.qaly_improvement_per_year)
            }
            _ => None,
        }
    }

    /// Check the field invariants of this effect
    pub fn validate(&self, context: &str) -> ImpactResult<()> {
        let context = format!("{} effect {}", context, self.effect_id());
        check(&context, EffectField::StartTime, self.start_time(), |v| v >= 0.0, "must be >= 0")?;
        check(
            &context,
            EffectField::WindowLength,
            self.window_length(),
            |v| v > 0.0,
            "must be > 0",
        )?;

        match self {
            Effect::Qaly(e) => {
                check(
                    &context,
                    EffectField::CostPerQaly,
                    e.cost_per_qaly,
                    |v| v != 0.0,
                    "must be non-zero",
                )?;
            }
            Effect::Population(e) => {
                check(
                    &context,
                    EffectField::CostPerMicroprobability,
                    e.cost_per_microprobability,
                    |v| v != 0.0,
                    "must be non-zero",
                )?;
                check(
                    &context,
                    EffectField::PopulationFractionAffected,
                    e.population_fraction_affected,
                    |v| v > 0.0 && v <= 1.0,
                    "must be in (0, 1]",
                )?;
                check(
                    &context,
                    EffectField::QalyImprovementPerYear,
                    e.qaly_improvement_per_year,
                    |v| v != 0.0,
                    "must be non-zero",
                )?;
            }
        }

        Ok(())
    }
}

fn check(
    context: &str,
    field: EffectField,
    value: f64,
    ok: impl Fn(f64) -> bool,
    reason: &'static str,
) -> ImpactResult<()> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ImpactError::InvalidField {
            context: context.to_string(),
            field: field.as_str().to_string(),
            value,
            reason,
        })
    }
}

/// Partial map of numeric effect fields
///
/// Used both for direct replacements and for multipliers. `effectId` is not
/// part of the map, so it can never be multiplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EffectFieldMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_length: Option<f64>,
    #[serde(default, rename = "costPerQALY", skip_serializing_if = "Option::is_none")]
    pub cost_per_qaly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_microprobability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_fraction_affected: Option<f64>,
    #[serde(default, rename = "qalyImprovementPerYear", skip_serializing_if = "Option::is_none")]
    pub qaly_improvement_per_year: Option<f64>,
}

impl EffectFieldMap {
    pub fn get(&self, field: EffectField) -> Option<f64> {
        *self.slot(field)
    }

    pub fn set(&mut self, field: EffectField, value: Option<f64>) {
        *self.slot_mut(field) = value;
    }

    pub fn is_empty(&self) -> bool {
        EffectField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Set entries in fixed field order
    pub fn entries(&self) -> impl Iterator<Item = (EffectField, f64)> + '_ {
        EffectField::ALL
            .iter()
            .filter_map(move |f| self.get(*f).map(|v| (*f, v)))
    }

    fn slot(&self, field: EffectField) -> &Option<f64> {
        match field {
            EffectField::StartTime => &self.start_time,
            EffectField::WindowLength => &self.window_length,
            EffectField::CostPerQaly => &self.cost_per_qaly,
            EffectField::CostPerMicroprobability => &self.cost_per_microprobability,
            EffectField::PopulationFractionAffected => &self.population_fraction_affected,
            EffectField::QalyImprovementPerYear => &self.qaly_improvement_per_year,
        }
    }

    fn slot_mut(&mut self, field: EffectField) -> &mut Option<f64> {
        match field {
            EffectField::StartTime => &mut self.start_time,
            EffectField::WindowLength => &mut self.window_length,
            EffectField::CostPerQaly => &mut self.cost_per_qaly,
            EffectField::CostPerMicroprobability => &mut self.cost_per_microprobability,
            EffectField::PopulationFractionAffected => &mut self.population_fraction_affected,
            EffectField::QalyImprovementPerYear => &mut self.qaly_improvement_per_year,
        }
    }
}

/// Recipient-specific adjustment of one category effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipientEffectOverride {
    pub effect_id: String,

    /// Direct field replacements, applied first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<EffectFieldMap>,

    /// Field multipliers, applied to the already-overridden values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipliers: Option<EffectFieldMap>,

    /// Drop the effect (`true`) or re-enable one disabled upstream (`false`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl RecipientEffectOverride {
    pub fn new(effect_id: impl Into<String>) -> Self {
        Self {
            effect_id: effect_id.into(),
            overrides: None,
            multipliers: None,
            disabled: None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    pub fn with_override(mut self, field: EffectField, value: f64) -> Self {
        self.overrides.get_or_insert_with(Default::default).set(field, Some(value));
        self
    }

    pub fn with_multiplier(mut self, field: EffectField, value: f64) -> Self {
        self.multipliers.get_or_insert_with(Default::default).set(field, Some(value));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = Some(true);
        self
    }

    pub fn enabled(mut self) -> Self {
        self.disabled = Some(false);
        self
    }
}

/// Effects that apply when $1/year is spent in a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub effects: Vec<Effect>,
}

impl Category {
    pub fn new(effects: Vec<Effect>) -> Self {
        Self { name: None, effects }
    }

    pub fn effect(&self, effect_id: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.effect_id() == effect_id)
    }

    pub fn validate(&self, category_id: &str) -> ImpactResult<()> {
        let context = format!("category {}", category_id);
        if self.effects.is_empty() {
            return Err(ImpactError::EmptyEffects { context });
        }
        for (i, effect) in self.effects.iter().enumerate() {
            effect.validate(&context)?;
            if self.effects[..i].iter().any(|e| e.effect_id() == effect.effect_id()) {
                return Err(ImpactError::DuplicateEffect {
                    context,
                    effect_id: effect.effect_id().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    effects: Vec<RawEffect>,
}

/// Deserialize a category map so effect errors name their category
pub(crate) fn deserialize_categories<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Category>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, RawCategory>::deserialize(deserializer)?
        .into_iter()
        .map(|(category_id, raw)| {
            let owner = format!("category {}", category_id);
            let effects = raw
                .effects
                .into_iter()
                .enumerate()
                .map(|(i, effect)| effect.into_effect(&owner, i))
                .collect::<ImpactResult<Vec<_>>>()
                .map_err(de::Error::custom)?;
            let category = Category {
                name: raw.name,
                effects,
            };
            Ok((category_id, category))
        })
        .collect()
}

/// A recipient's allocation to one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientCategory {
    /// Share of each donated dollar spent in this category, in [0, 1]
    pub fraction: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<RecipientEffectOverride>,
}

/// A donation recipient, described by how it splits spending across categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub categories: BTreeMap<String, RecipientCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_discriminated_by_fields() {
        let qaly: Effect = serde_json::from_str(
            r#"{"effectId":"health","startTime":0,"windowLength":10,"costPerQALY":100}"#,
        )
        .unwrap();
        assert!(matches!(qaly, Effect::Qaly(_)));

        let pop: Effect = serde_json::from_str(
            r#"{"effectId":"risk","startTime":5,"windowLength":20,
                "costPerMicroprobability":1000,"populationFractionAffected":0.5,
                "qalyImprovementPerYear":1}"#,
        )
        .unwrap();
        assert!(matches!(pop, Effect::Population(_)));
        assert_eq!(pop.end_time(), 25.0);
    }

    #[test]
    fn test_effect_with_both_field_sets_rejected() {
        let result: Result<Effect, _> = serde_json::from_str(
            r#"{"effectId":"x","startTime":0,"windowLength":10,"costPerQALY":100,
                "costPerMicroprobability":1000,"populationFractionAffected":0.5,
                "qalyImprovementPerYear":1}"#,
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("effect x: has both QALY and population fields"), "{}", message);
    }

    #[test]
    fn test_missing_population_field_is_named() {
        let result: Result<Effect, _> = serde_json::from_str(
            r#"{"effectId":"risk","startTime":0,"windowLength":10,
                "costPerMicroprobability":1000,"populationFractionAffected":1}"#,
        );
        let message = result.unwrap_err().to_string();
        assert!(
            message.contains("effect risk: missing field qalyImprovementPerYear"),
            "{}",
            message
        );
    }

    #[test]
    fn test_misspelled_field_is_named() {
        let result: Result<Effect, _> = serde_json::from_str(
            r#"{"effectId":"health","startTime":0,"windowLength":10,"costPerQaly":100}"#,
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("effect health: unknown field costPerQaly"), "{}", message);
    }

    #[test]
    fn test_effect_without_id_is_located_by_index() {
        let json = r#"{"c":{"effects":[
            {"effectId":"a","startTime":0,"windowLength":1,"costPerQALY":5},
            {"startTime":0,"windowLength":1,"costPerQALY":5}
        ]}}"#;
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let message = deserialize_categories(&mut deserializer).unwrap_err().to_string();
        assert!(message.contains("category c effect #1: missing field effectId"), "{}", message);
    }

    #[test]
    fn test_field_access_by_variant() {
        let effect = Effect::Qaly(QalyEffect {
            effect_id: "a".into(),
            start_time: 1.0,
            window_length: 2.0,
            cost_per_qaly: 50.0,
        });
        assert_eq!(effect.field(EffectField::CostPerQaly), Some(50.0));
        assert_eq!(effect.field(EffectField::PopulationFractionAffected), None);
        assert_eq!(effect.field(EffectField::WindowLength), Some(2.0));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut effect = PopulationEffect {
            effect_id: "risk".into(),
            start_time: 0.0,
            window_length: 10.0,
            cost_per_microprobability: 100.0,
            population_fraction_affected: 1.5,
            qaly_improvement_per_year: 1.0,
        };
        let err = Effect::Population(effect.clone()).validate("category c").unwrap_err();
        assert!(err.to_string().contains("populationFractionAffected"));
        assert!(err.to_string().contains("category c effect risk"));

        effect.population_fraction_affected = 0.5;
        effect.window_length = 0.0;
        assert!(Effect::Population(effect).validate("category c").is_err());
    }

    #[test]
    fn test_category_rejects_empty_and_duplicates() {
        assert_eq!(
            Category::new(vec![]).validate("c"),
            Err(ImpactError::EmptyEffects { context: "category c".into() })
        );

        let effect = Effect::Qaly(QalyEffect {
            effect_id: "a".into(),
            start_time: 0.0,
            window_length: 1.0,
            cost_per_qaly: 10.0,
        });
        let category = Category::new(vec![effect.clone(), effect]);
        assert!(matches!(
            category.validate("c"),
            Err(ImpactError::DuplicateEffect { .. })
        ));
    }

    #[test]
    fn test_field_map_entries_in_fixed_order() {
        let map = EffectFieldMap {
            qaly_improvement_per_year: Some(2.0),
            start_time: Some(1.0),
            ..Default::default()
        };
        let fields: Vec<_> = map.entries().map(|(f, _)| f).collect();
        assert_eq!(fields, vec![EffectField::StartTime, EffectField::QalyImprovementPerYear]);
        assert!(EffectFieldMap::default().is_empty());
    }
}
