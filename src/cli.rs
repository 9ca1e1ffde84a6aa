//! The command line interface for the scenario engine.
use crate::comparison::{Metric, compare};
use crate::config::ScenarioConfig;
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{
    create_output_directory, get_comparison_output_dir, get_output_dir, write_comparison,
    write_scenario,
};
use crate::settings::Settings;
use crate::simulation::{RunStatus, ScenarioResult, run_scenario};
use ::log::{error, info, warn};
use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The name of the subdirectory for the baseline scenario's outputs in a comparison
const BASELINE_DIR_NAME: &str = "baseline";

/// The name of the subdirectory for the alternative scenario's outputs in a comparison
const ALTERNATIVE_DIR_NAME: &str = "alternative";

/// The command line interface for the scenario engine.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run and compare commands
#[derive(Args, Clone, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to also write results as JSON
    #[arg(long)]
    pub json: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a scenario.
    Run {
        /// Path to the scenario file.
        scenario: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Run two scenarios and compare them.
    Compare {
        /// Path to the baseline scenario file.
        baseline: PathBuf,
        /// Path to the alternative scenario file.
        alternative: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a scenario.
    Validate {
        /// Path to the scenario file.
        scenario: PathBuf,
    },
    /// Manage example scenarios.
    Example {
        /// The available subcommands for managing example scenarios.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { scenario, opts } => handle_run_command(&scenario, &opts, None),
            Self::Compare {
                baseline,
                alternative,
                opts,
            } => handle_compare_command(&baseline, &alternative, &opts, None),
            Self::Validate { scenario } => handle_validate_command(&scenario, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start gridcast
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ gridcast --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided, and apply command-line overrides
fn get_settings(settings: Option<Settings>, opts: &RunOpts) -> Result<Settings> {
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    settings.overwrite |= opts.overwrite;
    settings.write_json |= opts.json;

    Ok(settings)
}

/// Create the output directory and start logging to it
fn prepare_output(output_path: &Path, settings: &Settings) -> Result<()> {
    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(&settings.log_level, Some(output_path)).context("Failed to initialise logging.")?;
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder was overwritten");
    }

    Ok(())
}

/// Load a scenario file
fn load_scenario(scenario_path: &Path) -> Result<ScenarioConfig> {
    let config = ScenarioConfig::from_path(scenario_path).context("Failed to load scenario.")?;
    info!(
        "Loaded scenario {} from {}",
        config.name,
        scenario_path.display()
    );

    Ok(config)
}

/// Run a scenario and write its results to `output_path`
fn run_and_write(config: &ScenarioConfig, output_path: &Path, write_json: bool) -> Result<ScenarioResult> {
    let result = run_scenario(config)?;
    write_scenario(output_path, &result, write_json).context("Failed to write results.")?;

    match &result.status {
        RunStatus::Completed => info!("Scenario {} complete!", result.name),
        RunStatus::Failed { year, message } => {
            error!("Scenario {} failed in {year}: {message}", result.name);
        }
        RunStatus::Cancelled { year } => warn!("Scenario {} cancelled in {year}", result.name),
    }

    Ok(result)
}

/// Handle the `run` command.
pub fn handle_run_command(
    scenario_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = get_settings(settings, opts)?;

    // Get path to output folder
    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(scenario_path)?,
    };
    prepare_output(&output_path, &settings)?;

    let config = load_scenario(scenario_path)?;
    write_metadata(&output_path, &[(scenario_path, config.seed)])?;

    let result = run_and_write(&config, &output_path, settings.write_json)?;
    if !result.is_complete() {
        bail!("Scenario {} did not complete", result.name);
    }

    Ok(())
}

/// Handle the `compare` command.
///
/// Each scenario's results are written to their own subdirectory of the output folder and the
/// comparison to the folder itself.
pub fn handle_compare_command(
    baseline_path: &Path,
    alternative_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = get_settings(settings, opts)?;

    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_comparison_output_dir(baseline_path, alternative_path)?,
    };
    prepare_output(&output_path, &settings)?;

    // Load both scenarios before running either
    let baseline = load_scenario(baseline_path)?;
    let alternative = load_scenario(alternative_path)?;
    write_metadata(
        &output_path,
        &[
            (baseline_path, baseline.seed),
            (alternative_path, alternative.seed),
        ],
    )?;

    let mut results = Vec::with_capacity(2);
    for (config, dir_name) in [
        (&baseline, BASELINE_DIR_NAME),
        (&alternative, ALTERNATIVE_DIR_NAME),
    ] {
        let scenario_output = output_path.join(dir_name);
        create_output_directory(&scenario_output, true)?;
        results.push(run_and_write(config, &scenario_output, settings.write_json)?);
    }

    let report = compare(&results[0], &results[1]).context("Failed to compare scenarios.")?;
    for metric in Metric::iter() {
        let delta = report.metric(metric);
        info!(
            "{metric}: {} -> {} ({:+})",
            delta.baseline_value, delta.alternative_value, delta.absolute_delta
        );
    }
    write_comparison(&output_path, &report.data, settings.write_json)
        .context("Failed to write comparison.")?;
    info!("Comparison complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(scenario_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    // Load/validate the scenario
    let config = ScenarioConfig::from_path(scenario_path).context("Failed to validate scenario.")?;
    info!(
        "Scenario {} is valid: {} regions, {} technologies, {} years",
        config.name,
        config.regions.len(),
        config.technologies.len(),
        config.years.len()
    );

    Ok(())
}
