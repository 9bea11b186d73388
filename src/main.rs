mod input;
mod model;
mod pipeline;
mod report;
mod tracing;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::input::{InputError, load_input};
use crate::model::country::IncomeGroup;
use crate::model::profile::{ImputerKind, IndexProfile, InflationSeries, ProfileError, ScalerKind};
use crate::pipeline::stage2_eligibility::run_stage2;
use crate::pipeline::stage3_normalize::run_stage3;
use crate::pipeline::stage4_impute::{ImputeError, run_stage4};
use crate::pipeline::stage5_rescale::{RescaleError, run_stage5};
use crate::pipeline::stage6_index::{IndexError, run_stage6};
use crate::pipeline::stage7_report::{Stage7Input, write_reports};

#[derive(Debug, Parser)]
#[command(
    name = "toughest-places",
    version,
    about = "Composite index of the toughest places to feed a family"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the index from an input directory and write the report directory.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    out: PathBuf,
    /// JSON file overriding individual profile fields.
    #[arg(long)]
    profile: Option<PathBuf>,
    #[arg(long)]
    neighbors: Option<usize>,
    #[arg(long, value_enum)]
    imputer: Option<ImputerKind>,
    #[arg(long, value_enum)]
    scaler: Option<ScalerKind>,
    #[arg(long, value_enum)]
    inflation: Option<InflationSeries>,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Impute(#[from] ImputeError),
    #[error(transparent)]
    Rescale(#[from] RescaleError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("failed to write reports to {path}: {source}")]
    Report {
        path: String,
        source: std::io::Error,
    },
    #[error("no eligible countries after filtering")]
    NoEligibleCountries,
}

fn main() {
    tracing::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(&args),
    };
    if let Err(err) = result {
        crate::error!("{err}");
        std::process::exit(1);
    }
}

fn resolve_profile(args: &RunArgs) -> Result<IndexProfile, ProfileError> {
    let mut profile = match &args.profile {
        Some(path) => IndexProfile::load(path)?,
        None => IndexProfile::default_v1(),
    };
    if let Some(k) = args.neighbors {
        profile.neighbors = k;
    }
    if let Some(imputer) = args.imputer {
        profile.imputer = imputer;
    }
    if let Some(scaler) = args.scaler {
        profile.scaler = scaler;
    }
    if let Some(series) = args.inflation {
        profile.inflation_series = series;
    }
    Ok(profile)
}

fn run(args: &RunArgs) -> Result<(), RunError> {
    let profile = resolve_profile(args)?;

    let bundle = load_input(&args.input)?;
    let eligible = run_stage2(&bundle, &profile);
    if eligible.is_empty() {
        return Err(RunError::NoEligibleCountries);
    }

    let normalized = run_stage3(&bundle, &eligible, &profile);
    let groups = eligible
        .countries
        .iter()
        .map(|c| c.income_group)
        .collect::<Vec<IncomeGroup>>();
    let imputed = run_stage4(&normalized.core, &groups, &profile)?;
    let rescaled = run_stage5(&imputed, &profile)?;
    let index = run_stage6(&rescaled.matrix)?;

    let input = Stage7Input {
        tool_name: "toughest-places".to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        profile: &profile,
        files: &bundle.files,
        skipped_rows: bundle.skipped_rows,
        n_classified: bundle.countries.len(),
        eligible: &eligible,
        normalized: &normalized,
        imputed: &imputed,
        rescaled: &rescaled,
        index: &index,
    };
    write_reports(&input, &args.out).map_err(|source| RunError::Report {
        path: args.out.display().to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
