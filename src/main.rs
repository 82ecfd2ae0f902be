//! Donation Impact CLI
//!
//! Command-line interface for valuing donations, ranking recipients, and
//! exporting lives-saved series

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use donation_impact::assumptions::{loader, DEFAULT_ASSUMPTIONS_PATH};
use donation_impact::ranking::{rank_categories, rank_recipients, RankedEntry};
use donation_impact::{Assumptions, ImpactEngine, ImpactTarget};

#[derive(Debug, Parser)]
#[command(name = "donation-impact", version, about = "Estimate lives saved by a donation")]
struct Cli {
    /// Assumption bundle (JSON)
    #[arg(long, global = true, default_value = DEFAULT_ASSUMPTIONS_PATH)]
    assumptions: PathBuf,

    /// User override snapshot merged over the assumption bundle (JSON)
    #[arg(long, global = true)]
    overrides: Option<PathBuf>,

    /// Donation year (defaults to the current calendar year)
    #[arg(long, global = true)]
    year: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Cost per life and lives saved for one recipient or category
    Cost {
        #[command(flatten)]
        target: TargetArgs,

        /// Donation amount in dollars
        #[arg(long, default_value_t = 10_000.0)]
        amount: f64,
    },

    /// Rank every recipient or category by lives saved per dollar
    Rank {
        #[arg(long, value_enum, default_value_t = RankKind::Recipients)]
        kind: RankKind,
    },

    /// Write the lives-saved-per-year series as CSV
    Visualize {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long, default_value_t = 10_000.0)]
        amount: f64,

        #[arg(long, default_value = "visualization.csv")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    #[arg(long)]
    recipient: Option<String>,

    #[arg(long)]
    category: Option<String>,
}

impl TargetArgs {
    fn target(&self) -> ImpactTarget {
        match (&self.recipient, &self.category) {
            (Some(id), _) => ImpactTarget::Recipient(id.clone()),
            (None, Some(id)) => ImpactTarget::Category(id.clone()),
            // clap's group guarantees one of the two
            (None, None) => unreachable!("target group is required"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RankKind {
    Recipients,
    Categories,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let donation_year = cli.year.unwrap_or_else(|| chrono::Local::now().year());
    let engine = build_engine(&cli.assumptions, cli.overrides.as_deref())?;

    match &cli.command {
        Command::Cost { target, amount } => {
            let target = target.target();
            let cost = engine.cost_per_life(&target, donation_year)?;
            let lives = engine.lives_saved(&target, *amount, donation_year)?;

            println!("Target:         {}", target);
            println!("Donation year:  {}", donation_year);
            println!("Cost per life:  {}", format_cost(cost));
            println!("Donation:       ${:.2}", amount);
            println!("Lives saved:    {:.6}", lives);
        }
        Command::Rank { kind } => {
            let ranking = match kind {
                RankKind::Recipients => rank_recipients(&engine, donation_year)?,
                RankKind::Categories => rank_categories(&engine, donation_year)?,
            };
            print_ranking(&ranking);
        }
        Command::Visualize {
            target,
            amount,
            output,
        } => {
            let target = target.target();
            let series = engine.visualize(&target, *amount, donation_year)?;
            let total = series.total_lives_saved();
            let rows = write_series_csv(output, series)?;
            println!(
                "Wrote {} points for {} ({:.6} lives saved) to {}",
                rows,
                target,
                total,
                output.display()
            );
        }
    }

    Ok(())
}

fn build_engine(assumptions_path: &Path, overrides_path: Option<&Path>) -> Result<ImpactEngine> {
    let base = Assumptions::from_json_path(assumptions_path)
        .with_context(|| format!("loading assumptions from {}", assumptions_path.display()))?;

    let assumptions = match overrides_path {
        Some(path) => {
            let overrides = loader::load_overrides(path)
                .with_context(|| format!("loading overrides from {}", path.display()))?;
            info!("merging overrides from {}", path.display());
            base.merged(&overrides).context("merging overrides")?
        }
        None => base,
    };

    Ok(ImpactEngine::new(assumptions)?)
}

fn format_cost(cost_per_life: f64) -> String {
    if cost_per_life.is_infinite() {
        "∞".to_string()
    } else {
        format!("${:.2}", cost_per_life)
    }
}

fn print_ranking(ranking: &[RankedEntry]) {
    println!("{:>4} {:<30} {:>16} {:>14}", "Rank", "Name", "Cost/Life", "Lives/$1M");
    println!("{}", "-".repeat(68));
    for (i, entry) in ranking.iter().enumerate() {
        let name = entry.name.as_deref().unwrap_or(entry.target.id());
        println!(
            "{:>4} {:<30} {:>16} {:>14.4}",
            i + 1,
            name,
            format_cost(entry.cost_per_life),
            entry.lives_per_dollar * 1e6
        );
    }
}

fn write_series_csv(path: &Path, series: donation_impact::VisualizationSeries) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let effect_ids = series.effect_ids().to_vec();
    let mut header = vec!["year".to_string()];
    header.extend(effect_ids.iter().cloned());
    writer.write_record(&header)?;

    let mut rows = 0;
    for point in series {
        let mut record = vec![format!("{:.4}", point.year)];
        record.extend(
            effect_ids
                .iter()
                .map(|id| format!("{:.10}", point.rates.get(id).copied().unwrap_or(0.0))),
        );
        writer.write_record(&record)?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}
