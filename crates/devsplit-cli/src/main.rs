mod commands;
mod logging;
mod progress;
mod render;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use devsplit_core::records::ColumnSelection;
use devsplit_core::state::{load_state, save_state};
use devsplit_core::{AppConfig, DeviceEngine, PlanOutcome};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let args = Cli::parse();

    let _guard = logging::init_logger(args.verbose);

    let config = match devsplit_core::config::load_configuration() {
        Ok(config) => apply_overrides(config, &args),
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command {
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(command) => {
            if let Err(err) = run_command(&config, args.input.as_deref(), command) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn apply_overrides(mut config: AppConfig, args: &Cli) -> AppConfig {
    if let Some(column) = &args.path_column {
        config.path_column = column.clone();
    }
    if let Some(column) = &args.type_column {
        config.type_column = Some(column.clone());
    }
    if let Some(state) = &args.state {
        config.state_path = state.to_string_lossy().into_owned();
    }
    config
}

fn run_command(config: &AppConfig, input: Option<&Path>, command: Commands) -> Result<()> {
    let input = input.context("--input <CSV> is required for this command")?;
    let state_path = PathBuf::from(&config.state_path);
    let columns = ColumnSelection::from(config);
    let reporter = CliReporter::new();

    let saved = load_state(&state_path);
    let mut engine = DeviceEngine::from_state(&config.root_label, saved.clone());
    let source = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    engine.read_csv(source, &columns, &reporter)?;

    match command {
        Commands::Tree => render::print_tree(&engine),
        Commands::Devices => render::print_devices(&engine),
        Commands::AddDevice { paths, yes } => add_devices(&mut engine, &paths, yes, &reporter)?,
        Commands::RemoveDevice { paths } => {
            let removed = engine.remove_devices(&paths);
            println!("Removed {} device(s)", removed);
        }
        Commands::RenameDevice { path, name } => {
            let name = name.unwrap_or_default();
            if engine.set_name_override(&path, &name) {
                println!("{} is now shown as {}", path, engine.display_name(&path).bold());
            }
        }
        Commands::Merge { paths, name } => {
            if engine.begin_merge(&paths, &name) {
                match engine.confirm_merge(&name) {
                    Some(group) => println!(
                        "Merged {} folders into {} ({})",
                        group.member_paths.len(),
                        group.name.bold(),
                        group.id.cyan()
                    ),
                    None => {
                        engine.cancel_merge();
                        warn!("Merge was not applied");
                    }
                }
            }
        }
        Commands::Unmerge { id } => match engine.dissolve_merge(&id) {
            Some(group) => println!("Dissolved {}", group.name.bold()),
            None => warn!("No merged device with id {}", id),
        },
        Commands::RenameMerge { id, name } => {
            if !engine.rename_merged(&id, &name) {
                warn!("No merged device with id {} (or empty name)", id);
            }
        }
        Commands::Hide { paths } => {
            let hidden = engine.hide(&paths);
            println!("Hidden folders: {}", hidden.join(", "));
        }
        Commands::Unhide { paths } => {
            let hidden = engine.unhide(&paths);
            println!("Hidden folders: {}", hidden.join(", "));
        }
        Commands::Export { output } => {
            let source =
                File::open(input).with_context(|| format!("opening {}", input.display()))?;
            let target = File::create(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            let summary = engine.export_csv(source, target, &columns.path_column, &reporter)?;
            println!(
                "{} rows written to {}: {} assigned, {} unassigned, {} hidden",
                summary.rows,
                output.display(),
                format!("{}", summary.assigned).green(),
                format!("{}", summary.unassigned).yellow(),
                format!("{}", summary.hidden).dimmed(),
            );
        }
        Commands::PrintConfig => {}
    }

    let snapshot = engine.snapshot();
    if snapshot != saved {
        save_state(&state_path, &snapshot)
            .with_context(|| format!("saving state to {}", state_path.display()))?;
        info!("State saved to {}", state_path.display());
    }

    Ok(())
}

fn add_devices(
    engine: &mut DeviceEngine,
    paths: &[String],
    yes: bool,
    reporter: &CliReporter,
) -> Result<()> {
    match engine.propose_devices(paths, reporter) {
        PlanOutcome::Unchanged => println!("Nothing to change"),
        PlanOutcome::Applied(plan) => {
            render::print_plan(engine, &plan);
            println!("Added {} device(s)", plan.to_add.len());
        }
        PlanOutcome::AwaitingConfirmation(plan) => {
            render::print_plan(engine, &plan);
            let confirmed = yes || prompt_confirm("Apply these changes?", Some(false))?;
            if confirmed {
                engine.confirm_plan();
                println!(
                    "Applied: {} added, {} removed",
                    plan.to_add.len(),
                    plan.to_remove.len()
                );
            } else {
                engine.discard_plan();
                println!("Discarded");
            }
        }
    }
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
