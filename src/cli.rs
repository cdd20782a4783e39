//! The command line interface for gridplan.
use crate::log;
use crate::model::Model;
use crate::output::{create_output_directory, get_output_dir, metadata::write_metadata};
use crate::settings::Settings;
use crate::units::Dimensionless;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// Plan least-cost electricity generation and storage for a model.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The command to run.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Minimum renewable share (percent), overriding the value in model.toml
    #[arg(long, value_name = "PERCENT")]
    pub min_renewable_share: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimise capacity and dispatch for a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check that a model can be loaded, without optimising it.
    Validate {
        /// Path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage the program settings file.
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

/// Parse CLI arguments and start gridplan
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ gridplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    match cli.command {
        Some(Commands::Run { model_dir, opts }) => handle_run_command(&model_dir, &opts, None),
        Some(Commands::Validate { model_dir }) => handle_validate_command(&model_dir, None),
        Some(Commands::Settings { subcommand }) => subcommand.execute(),
        None => {
            println!("{}", Cli::command().render_long_help());
            Ok(())
        }
    }
}

/// Use the given settings, or load them from the settings file
fn settings_or_load(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
///
/// # Arguments
///
/// * `model_path` - Folder containing the model
/// * `opts` - Options given on the command line
/// * `settings` - Program settings. If `None`, these are read from the settings file.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = settings_or_load(settings)?;

    let output_path = match &opts.output_dir {
        Some(dir) => dir.clone(),
        None => get_output_dir(model_path, &settings.results_root)?,
    };
    let replaced = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(Some(&settings.log_level), Some(&output_path))
        .context("Failed to initialise logging.")?;

    let mut model = Model::from_path(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // Only reported now, as the logger didn't exist when the folder was cleared
    if replaced {
        warn!("Output folder will be overwritten");
    }

    if let Some(share) = opts.min_renewable_share {
        model
            .parameters
            .set_min_renewable_share(Dimensionless(share))
            .context("Invalid --min-renewable-share.")?;
        info!("Minimum renewable share set to {share}% from the command line");
    }

    write_metadata(&output_path, model_path, &model).context("Failed to save metadata.")?;
    crate::simulation::run(&model, &output_path)?;
    info!("Optimisation complete!");

    Ok(())
}

/// Handle the `validate` command.
///
/// Log files are not written for this command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(settings)?;
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let model = Model::from_path(model_path).context("Failed to validate model.")?;
    info!(
        "Model validation successful! {} of {} technologies will be modelled over {} hours",
        model.technologies.modelled_technologies().len(),
        model.technologies.len(),
        crate::hour::timeline_len(&model.weeks)
    );

    Ok(())
}
