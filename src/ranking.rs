//! Ranking recipients and categories by lives saved per dollar
//!
//! Every entity is valued independently, so the batch runs in parallel.

use rayon::prelude::*;
use serde::Serialize;

use crate::engine::{ImpactEngine, ImpactTarget};
use crate::error::ImpactResult;
use crate::valuation::lives_per_dollar;

/// One row of a ranking table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub target: ImpactTarget,
    pub name: Option<String>,
    pub cost_per_life: f64,
    pub lives_per_dollar: f64,
}

/// Value `targets` for a donation in `donation_year`, best first
///
/// Ordered by lives per dollar, descending: entries with no effect (infinite
/// cost) follow every positive cost, and negative costs come last. Ties are
/// broken by id.
pub fn rank_targets(
    engine: &ImpactEngine,
    targets: &[ImpactTarget],
    donation_year: i32,
) -> ImpactResult<Vec<RankedEntry>> {
    let mut entries = targets
        .par_iter()
        .map(|target| -> ImpactResult<RankedEntry> {
            let cost_per_life = engine.cost_per_life(target, donation_year)?;
            Ok(RankedEntry {
                target: target.clone(),
                name: display_name(engine, target),
                cost_per_life,
                lives_per_dollar: lives_per_dollar(cost_per_life),
            })
        })
        .collect::<ImpactResult<Vec<_>>>()?;

    entries.sort_by(|a, b| {
        b.lives_per_dollar
            .total_cmp(&a.lives_per_dollar)
            .then_with(|| a.target.id().cmp(b.target.id()))
    });

    Ok(entries)
}

pub fn rank_recipients(
    engine: &ImpactEngine,
    donation_year: i32,
) -> ImpactResult<Vec<RankedEntry>> {
    let targets: Vec<_> = engine
        .assumptions()
        .recipients
        .keys()
        .map(|id| ImpactTarget::Recipient(id.clone()))
        .collect();
    rank_targets(engine, &targets, donation_year)
}

pub fn rank_categories(
    engine: &ImpactEngine,
    donation_year: i32,
) -> ImpactResult<Vec<RankedEntry>> {
    let targets: Vec<_> = engine
        .assumptions()
        .categories
        .keys()
        .map(|id| ImpactTarget::Category(id.clone()))
        .collect();
    rank_targets(engine, &targets, donation_year)
}

fn display_name(engine: &ImpactEngine, target: &ImpactTarget) -> Option<String> {
    let assumptions = engine.assumptions();
    match target {
        ImpactTarget::Category(id) => assumptions.categories.get(id)?.name.clone(),
        ImpactTarget::Recipient(id) => assumptions.recipients.get(id)?.name.clone(),
    }
}
