// ABOUTME: Entry point for the lanman launcher.
// ABOUTME: Opens the space picker or dispatches to launch, init, copy-config, show-config, and check.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use lanman_cli::{first_space, picker_items, render_config, render_preflight};
use lanman_core::setup::default_config_destination;
use lanman_core::{launch, preflight, AppConfig, LanError, Space};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "lanman")]
#[command(about = "Launch agent sessions scoped to the devices on your LAN")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./config/config.toml, ./config.toml, then the user config dir)
    #[arg(short, long, global = true, env = "LANMAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a space without opening the picker
    Launch {
        /// Space id from the config
        space: String,
    },

    /// Create every space's directory, role file, manifest, and logs README
    Init {
        /// Regenerate role files and READMEs even if they exist
        #[arg(long)]
        force: bool,
    },

    /// Write the example config
    CopyConfig {
        /// Destination (defaults to ./config/config.toml)
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the loaded configuration
    ShowConfig,

    /// Check that the terminal and agent are installed
    Check,
}

fn main() -> Result<ExitCode> {
    lanman_log::init_file("lanman");

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        None => run_picker(&load_config(config_path)?),
        Some(Commands::Launch { space }) => run_launch(&load_config(config_path)?, &space),
        Some(Commands::Init { force }) => run_init(&load_config(config_path)?, force),
        Some(Commands::CopyConfig { dest, force }) => run_copy_config(dest, force),
        Some(Commands::ShowConfig) => {
            print!("{}", render_config(&load_config(config_path)?));
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Check) => run_check(&load_config(config_path)?),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = AppConfig::load(path).context("Failed to load configuration")?;
    info!(
        source = ?config.source,
        devices = config.devices.len(),
        spaces = config.spaces.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Launch one space and report it. Status errors are printed and do not abort the caller.
fn launch_space(config: &AppConfig, space: &Space) -> Result<bool> {
    match launch(config, space) {
        Ok(launched) => {
            println!(
                "{} {} ({}, pid {})",
                style("Launched").green().bold(),
                space.name,
                launched.session.terminal,
                launched.session.pid
            );
            Ok(true)
        }
        Err(e) if e.is_status() => {
            println!("{}", style(&e).yellow());
            Ok(false)
        }
        Err(e) => {
            error!(space = %space.id, error = %e, "Launch failed");
            Err(e).with_context(|| format!("Failed to launch {}", space.name))
        }
    }
}

fn run_picker(config: &AppConfig) -> Result<ExitCode> {
    config.require_spaces()?;

    for problem in preflight(config) {
        eprintln!("{} {problem}", style("warning:").yellow().bold());
    }

    let items = picker_items(config);
    let labels: Vec<String> = items.iter().map(|item| item.label()).collect();
    let theme = ColorfulTheme::default();
    let mut selected = first_space(&items);

    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("Launch a space (Esc or q to quit)")
            .items(&labels)
            .default(selected)
            .interact_opt()
            .context("The picker needs an interactive terminal; try `lanman launch <space>`")?;

        let Some(index) = choice else {
            return Ok(ExitCode::SUCCESS);
        };
        selected = index;

        let Some(id) = items[index].space_id() else {
            continue;
        };
        let space = config.require_space(id)?;
        if let Err(e) = launch_space(config, space) {
            eprintln!("{} {e:#}", style("error:").red().bold());
        }
    }
}

fn run_launch(config: &AppConfig, id: &str) -> Result<ExitCode> {
    let space = config.require_space(id)?;
    if launch_space(config, space)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn run_init(config: &AppConfig, force: bool) -> Result<ExitCode> {
    config.require_spaces()?;
    let initialized = lanman_core::initialize_spaces(config, force)
        .context("Failed to initialize spaces")?;
    for id in &initialized {
        if let Some(space) = config.space(id) {
            println!("  {:<12} {}", space.id, space.root().display());
        }
    }
    println!(
        "Initialized {} spaces under {}",
        initialized.len(),
        config.spaces_base_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_copy_config(dest: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let dest = dest.unwrap_or_else(default_config_destination);
    match lanman_core::write_example_config(&dest, force) {
        Ok(path) => {
            println!("Wrote example config to {}", path.display());
            println!("Edit it to describe your devices, then run `lanman init`.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ LanError::Config(_)) => {
            println!("{}", style(&e).yellow());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Failed to write example config"),
    }
}

fn run_check(config: &AppConfig) -> Result<ExitCode> {
    let problems = preflight(config);
    print!("{}", render_preflight(config, &problems));
    if problems.iter().any(|p| p.is_missing()) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
