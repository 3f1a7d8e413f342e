use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use household_transmission::{
    analysis::{FitReport, load_households, run_fit},
    config::{AnalysisConfig, RunSettings},
    household::{HouseholdData, SyntheticCohort, read_records_csv, write_records_csv},
    reporting::{Reporter, TextReporter},
};

/// Household final-size transmission model.
#[derive(Parser)]
#[command(name = "hhfit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a seeded synthetic person table (hh_id,age,case).
    Generate(GenerateArgs),
    /// Group a person table into households and save them as JSON.
    Prepare(PrepareArgs),
    /// Fit the model and write the results log.
    Fit(FitArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Output CSV path
    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value_t = 1000)]
    people: usize,

    /// Number of household ids (defaults to a third of the people)
    #[arg(long)]
    households: Option<usize>,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args)]
struct PrepareArgs {
    /// Person-level CSV
    #[arg(long)]
    input: PathBuf,

    /// Output JSON path
    #[arg(long)]
    output: PathBuf,

    /// TOML config providing the age bands
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct FitArgs {
    /// Person-level CSV or prepared JSON dataset
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the random restarts
    #[arg(long, value_name = "SEED")]
    starting_parameter: Option<u64>,

    /// Ridge weight added to the negative log-likelihood
    #[arg(long, value_name = "LAMBDA")]
    add_ridge: Option<f64>,

    /// Number of random restarts
    #[arg(long, value_name = "N")]
    restarts: Option<usize>,

    /// Results log path (stdout when omitted)
    #[arg(long)]
    log: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::from_path(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let cohort = SyntheticCohort {
        people: args.people,
        households: args.households.unwrap_or(args.people / 3),
        seed: args.seed,
        ..SyntheticCohort::default()
    };
    let records = cohort.generate()?;
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    write_records_csv(BufWriter::new(file), &records)?;
    info!("wrote {} records to {}", records.len(), args.output.display());
    Ok(())
}

fn prepare(args: PrepareArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let records = read_records_csv(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let data = HouseholdData::from_records(&records, &config.data.bands)?;
    data.write_json(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}

fn fit(args: FitArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(seed) = args.starting_parameter {
        config.optimizer.seed = seed;
    }
    if let Some(ridge) = args.add_ridge {
        config.model.ridge = ridge;
    }
    if let Some(restarts) = args.restarts {
        config.optimizer.restarts = restarts;
    }

    let data = load_households(&args.input, &config.data.bands)
        .with_context(|| format!("loading {}", args.input.display()))?;
    config.data.bands = data.bands.clone();
    let settings = config.validate().context("validating configuration")?;

    let report = match &args.log {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            fit_with(&data, &settings, TextReporter::new(BufWriter::new(file)))?
        }
        None => fit_with(&data, &settings, TextReporter::new(io::stdout()))?,
    };
    if report.x_hat.is_none() {
        anyhow::bail!("no optimization run succeeded");
    }
    Ok(())
}

fn fit_with<R: Reporter>(
    data: &HouseholdData, settings: &RunSettings, mut reporter: R,
) -> Result<FitReport> {
    Ok(run_fit(data, settings, &mut reporter)?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match Cli::parse().command {
        Command::Generate(args) => generate(args),
        Command::Prepare(args) => prepare(args),
        Command::Fit(args) => fit(args),
    }
}
