//! Effect data structures and recipient override application

mod data;
mod overrides;

pub use data::{
    Category, Effect, EffectField, EffectFieldMap, PopulationEffect, QalyEffect, Recipient,
    RecipientCategory, RecipientEffectOverride,
};
pub(crate) use data::deserialize_categories;
pub use overrides::{apply_recipient_effect_to_base, merge_effect_overrides};
