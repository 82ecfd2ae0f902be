//! Applying recipient-specific overrides and multipliers to category effects

use log::debug;

use super::data::{Effect, EffectField, EffectFieldMap, RecipientEffectOverride};
use crate::error::{ImpactError, ImpactResult};

/// Produce a new effect from `base` with `adjustment` applied
///
/// Overrides are applied first, then multipliers scale the overridden values.
/// A field may carry an override or a multiplier, never both. The base effect
/// is left untouched. `disabled` is not interpreted here; callers drop
/// disabled effects before valuation.
pub fn apply_recipient_effect_to_base(
    base: &Effect,
    adjustment: &RecipientEffectOverride,
    context: &str,
) -> ImpactResult<Effect> {
    if adjustment.effect_id != base.effect_id() {
        return Err(ImpactError::EffectIdMismatch {
            context: context.to_string(),
            expected: base.effect_id().to_string(),
            got: adjustment.effect_id.clone(),
        });
    }

    let empty = EffectFieldMap::default();
    let overrides = adjustment.overrides.as_ref().unwrap_or(&empty);
    let multipliers = adjustment.multipliers.as_ref().unwrap_or(&empty);

    for field in EffectField::ALL {
        if overrides.get(field).is_some() && multipliers.get(field).is_some() {
            return Err(ImpactError::ConflictingOverride {
                context: context.to_string(),
                effect_id: base.effect_id().to_string(),
                field: field.as_str(),
            });
        }
    }

    let mut effect = base.clone();

    for (field, value) in overrides.entries() {
        *slot(&mut effect, field, context)? = value;
    }
    for (field, factor) in multipliers.entries() {
        *slot(&mut effect, field, context)? *= factor;
    }

    debug!(
        "{}: applied {} override(s), {} multiplier(s) to effect {}",
        context,
        overrides.entries().count(),
        multipliers.entries().count(),
        effect.effect_id()
    );

    Ok(effect)
}

fn slot<'a>(
    effect: &'a mut Effect,
    field: EffectField,
    context: &str,
) -> ImpactResult<&'a mut f64> {
    let effect_id = effect.effect_id().to_string();
    let kind = effect.kind();
    effect
        .field_mut(field)
        .ok_or_else(|| ImpactError::FieldNotApplicable {
            context: context.to_string(),
            effect_id,
            field: field.as_str(),
            kind,
        })
}

/// Deep-merge two adjustment records for the same effect
///
/// Entries in `user` win. Setting a field in one map clears the same field in
/// the other map of the base record, so the merged record never carries both
/// an override and a multiplier for one field unless `user` itself does.
/// An explicit `disabled` in `user` wins in either direction.
pub fn merge_effect_overrides(
    base: &RecipientEffectOverride,
    user: &RecipientEffectOverride,
) -> RecipientEffectOverride {
    let mut overrides = base.overrides.clone().unwrap_or_default();
    let mut multipliers = base.multipliers.clone().unwrap_or_default();

    if let Some(user_overrides) = &user.overrides {
        for (field, value) in user_overrides.entries() {
            overrides.set(field, Some(value));
            multipliers.set(field, None);
        }
    }
    if let Some(user_multipliers) = &user.multipliers {
        for (field, value) in user_multipliers.entries() {
            multipliers.set(field, Some(value));
            if user.overrides.as_ref().and_then(|m| m.get(field)).is_none() {
                overrides.set(field, None);
            }
        }
    }

    RecipientEffectOverride {
        effect_id: base.effect_id.clone(),
        overrides: (!overrides.is_empty()).then_some(overrides),
        multipliers: (!multipliers.is_empty()).then_some(multipliers),
        disabled: user.disabled.or(base.disabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{PopulationEffect, QalyEffect};

    fn qaly_base() -> Effect {
        Effect::Qaly(QalyEffect {
            effect_id: "health".into(),
            start_time: 0.0,
            window_length: 10.0,
            cost_per_qaly: 100.0,
        })
    }

    #[test]
    fn test_override_then_multiplier() {
        let adjustment = RecipientEffectOverride::new("health")
            .with_override(EffectField::WindowLength, 20.0)
            .with_multiplier(EffectField::CostPerQaly, 3.0);

        let base = qaly_base();
        let adjusted = apply_recipient_effect_to_base(&base, &adjustment, "recipient r").unwrap();

        assert_eq!(adjusted.window_length(), 20.0);
        assert_eq!(adjusted.field(EffectField::CostPerQaly), Some(300.0));
        // base untouched
        assert_eq!(base, qaly_base());
    }

    #[test]
    fn test_multiplier_applies_to_overridden_value() {
        // override startTime, multiply windowLength: both operate in one pass
        let adjustment = RecipientEffectOverride::new("health")
            .with_override(EffectField::StartTime, 4.0)
            .with_multiplier(EffectField::WindowLength, 0.5);
        let adjusted =
            apply_recipient_effect_to_base(&qaly_base(), &adjustment, "recipient r").unwrap();
        assert_eq!(adjusted.start_time(), 4.0);
        assert_eq!(adjusted.window_length(), 5.0);
    }

    #[test]
    fn test_effect_id_mismatch_is_error() {
        let adjustment = RecipientEffectOverride::new("other");
        let err = apply_recipient_effect_to_base(&qaly_base(), &adjustment, "recipient r")
            .unwrap_err();
        assert!(matches!(err, ImpactError::EffectIdMismatch { .. }));
    }

    #[test]
    fn test_override_and_multiplier_on_same_field_is_error() {
        let adjustment = RecipientEffectOverride::new("health")
            .with_override(EffectField::CostPerQaly, 50.0)
            .with_multiplier(EffectField::CostPerQaly, 2.0);
        let err = apply_recipient_effect_to_base(&qaly_base(), &adjustment, "recipient r")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("costPerQALY"));
        assert!(message.contains("recipient r"));
    }

    #[test]
    fn test_field_of_other_variant_is_error() {
        let adjustment = RecipientEffectOverride::new("health")
            .with_multiplier(EffectField::PopulationFractionAffected, 2.0);
        let err = apply_recipient_effect_to_base(&qaly_base(), &adjustment, "recipient r")
            .unwrap_err();
        assert!(matches!(err, ImpactError::FieldNotApplicable { kind: "QALY", .. }));
    }

    #[test]
    fn test_population_multiplier() {
        let base = Effect::Population(PopulationEffect {
            effect_id: "risk".into(),
            start_time: 0.0,
            window_length: 10.0,
            cost_per_microprobability: 1000.0,
            population_fraction_affected: 0.2,
            qaly_improvement_per_year: 1.0,
        });
        let adjustment = RecipientEffectOverride::new("risk")
            .with_multiplier(EffectField::PopulationFractionAffected, 2.0);
        let adjusted = apply_recipient_effect_to_base(&base, &adjustment, "r").unwrap();
        assert_eq!(adjusted.field(EffectField::PopulationFractionAffected), Some(0.4));
    }

    #[test]
    fn test_merge_user_wins_and_clears_other_kind() {
        let base = RecipientEffectOverride::new("health")
            .with_multiplier(EffectField::CostPerQaly, 2.0)
            .with_override(EffectField::StartTime, 1.0);
        let user = RecipientEffectOverride::new("health")
            .with_override(EffectField::CostPerQaly, 80.0)
            .with_multiplier(EffectField::StartTime, 3.0);

        let merged = merge_effect_overrides(&base, &user);

        let overrides = merged.overrides.clone().unwrap();
        let multipliers = merged.multipliers.clone().unwrap();
        assert_eq!(overrides.get(EffectField::CostPerQaly), Some(80.0));
        assert_eq!(overrides.get(EffectField::StartTime), None);
        assert_eq!(multipliers.get(EffectField::StartTime), Some(3.0));
        assert_eq!(multipliers.get(EffectField::CostPerQaly), None);

        // merged record applies cleanly
        assert!(apply_recipient_effect_to_base(&qaly_base(), &merged, "r").is_ok());
        // inputs untouched
        assert_eq!(base.multipliers.unwrap().get(EffectField::CostPerQaly), Some(2.0));
    }

    #[test]
    fn test_merge_user_can_reenable_effect() {
        let base = RecipientEffectOverride::new("health").disabled();

        let user = RecipientEffectOverride::new("health").enabled();
        let merged = merge_effect_overrides(&base, &user);
        assert_eq!(merged.disabled, Some(false));
        assert!(!merged.is_disabled());

        // unset in the user record keeps the base flag
        let merged = merge_effect_overrides(&base, &RecipientEffectOverride::new("health"));
        assert!(merged.is_disabled());
    }
}
