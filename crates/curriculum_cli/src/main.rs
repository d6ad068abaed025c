//! CLI entry point for the curriculum core.
//!
//! # Responsibility
//! - Load configuration, start logging and open the configured store.
//! - Print the unit catalog (optionally filtered) with each unit's activities.
//!
//! Usage: `curriculum_cli [CONFIG.toml] [SEEK]`

use curriculum_core::{init_logging, CatalogService, CoreConfig};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("curriculum_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let seek = args.next().unwrap_or_default();

    let config = CoreConfig::load(config_path.as_deref())?;
    init_logging(&config)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        curriculum_core::core_version()
    );

    let catalog = CatalogService::new(config.open_store()?);
    if config.seed_fixtures {
        catalog.seed_fixtures()?;
    }

    for unit in catalog.search_units(&seek)? {
        println!("{}  {}", unit.id, unit.goal);
        for activity in catalog.list_activities(&unit.id)? {
            println!("    - {}", activity.title);
        }
    }
    Ok(())
}
