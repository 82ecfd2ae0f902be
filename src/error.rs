//! Error types for the valuation engine
//!
//! Structural input-contract violations are errors. Numerical edge cases
//! (effects past the horizon, zero lives saved, cancelling effects) are not:
//! they resolve to `f64::INFINITY` inside the valuation functions.

use thiserror::Error;

/// Structural validation failure in assumptions, effects, or overrides
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImpactError {
    #[error("{context}: {field} = {value} {reason}")]
    InvalidField {
        context: String,
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("{context}: missing field {field}")]
    MissingField {
        context: String,
        field: &'static str,
    },

    #[error("{context}: unknown field {field}")]
    UnknownField { context: String, field: String },

    #[error("{context}: has both QALY and population fields")]
    MixedEffectFields { context: String },

    #[error("{context}: no effects")]
    EmptyEffects { context: String },

    #[error("{context}: no categories")]
    EmptyCategories { context: String },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),

    #[error("{context}: no base effect with id {effect_id}")]
    UnknownEffect { context: String, effect_id: String },

    #[error("{context}: duplicate effect id {effect_id}")]
    DuplicateEffect { context: String, effect_id: String },

    #[error("{context}: effect id mismatch, base is {expected} but override targets {got}")]
    EffectIdMismatch {
        context: String,
        expected: String,
        got: String,
    },

    #[error("{context}: field {field} of effect {effect_id} has both an override and a multiplier")]
    ConflictingOverride {
        context: String,
        effect_id: String,
        field: &'static str,
    },

    #[error("{context}: field {field} does not apply to {kind} effect {effect_id}")]
    FieldNotApplicable {
        context: String,
        effect_id: String,
        field: &'static str,
        kind: &'static str,
    },
}

/// Failure while loading assumption or override files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ImpactError),
}

pub type ImpactResult<T> = Result<T, ImpactError>;
