//! Assumption set: global parameters, categories, and recipients

mod global;
mod overrides;
pub mod loader;

pub use global::{GlobalParameters, DEFAULT_HISTORICAL_GROWTH_RATE};
pub use overrides::{
    AssumptionOverrides, GlobalParameterOverrides, RecipientCategoryOverride, RecipientOverrides,
};
pub use loader::DEFAULT_ASSUMPTIONS_PATH;

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::effects::{apply_recipient_effect_to_base, Category, Recipient};
use crate::error::{ImpactError, ImpactResult, LoadError};

/// Container for everything the engine values
///
/// Content is validated once on load or merge; the engine then treats it as
/// read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    #[serde(default)]
    pub global: GlobalParameters,

    #[serde(default, deserialize_with = "crate::effects::deserialize_categories")]
    pub categories: BTreeMap<String, Category>,

    #[serde(default)]
    pub recipients: BTreeMap<String, Recipient>,
}

impl Assumptions {
    /// Load assumptions from the default location (data/assumptions.json)
    pub fn from_json() -> Result<Self, LoadError> {
        Self::from_json_path(Path::new(DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load assumptions from a specific JSON file
    pub fn from_json_path(path: &Path) -> Result<Self, LoadError> {
        loader::load_assumptions(path)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        loader::parse_assumptions(json.as_bytes())
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LoadError> {
        loader::parse_assumptions(reader)
    }

    pub fn category(&self, category_id: &str) -> ImpactResult<&Category> {
        self.categories
            .get(category_id)
            .ok_or_else(|| ImpactError::UnknownCategory(category_id.to_string()))
    }

    pub fn recipient(&self, recipient_id: &str) -> ImpactResult<&Recipient> {
        self.recipients
            .get(recipient_id)
            .ok_or_else(|| ImpactError::UnknownRecipient(recipient_id.to_string()))
    }

    /// Check every structural invariant of the content
    pub fn validate(&self) -> ImpactResult<()> {
        self.global.validate()?;

        for (category_id, category) in &self.categories {
            category.validate(category_id)?;
        }

        for (recipient_id, recipient) in &self.recipients {
            self.validate_recipient(recipient_id, recipient)?;
        }

        Ok(())
    }

    fn validate_recipient(&self, recipient_id: &str, recipient: &Recipient) -> ImpactResult<()> {
        if recipient.categories.is_empty() {
            return Err(ImpactError::EmptyCategories {
                context: format!("recipient {}", recipient_id),
            });
        }

        let mut total_fraction = 0.0;
        for (category_id, allocation) in &recipient.categories {
            let context = format!("recipient {} category {}", recipient_id, category_id);
            let category = self.category(category_id)?;

            if !(allocation.fraction.is_finite() && (0.0..=1.0).contains(&allocation.fraction)) {
                return Err(ImpactError::InvalidField {
                    context,
                    field: "fraction".to_string(),
                    value: allocation.fraction,
                    reason: "must be in [0, 1]",
                });
            }
            total_fraction += allocation.fraction;

            for (i, adjustment) in allocation.effects.iter().enumerate() {
                if allocation.effects[..i]
                    .iter()
                    .any(|a| a.effect_id == adjustment.effect_id)
                {
                    return Err(ImpactError::DuplicateEffect {
                        context,
                        effect_id: adjustment.effect_id.clone(),
                    });
                }
                let base = category.effect(&adjustment.effect_id).ok_or_else(|| {
                    ImpactError::UnknownEffect {
                        context: context.clone(),
                        effect_id: adjustment.effect_id.clone(),
                    }
                })?;
                if !adjustment.is_disabled() {
                    apply_recipient_effect_to_base(base, adjustment, &context)?.validate(&context)?;
                }
            }
        }

        if total_fraction > 1.0 + 1e-9 {
            warn!(
                "recipient {}: category fractions sum to {:.4}, above 1",
                recipient_id, total_fraction
            );
        }

        Ok(())
    }
}
