//! Console entry point over the configured record store.
//!
//! # Responsibility
//! - Resolve configuration, own the storage handle and dispatch commands.
//! - Print `describe()` lines for humans; exit non-zero on failure.

use clap::{Parser, Subcommand};
use hbnb_core::{
    init_logging, open_storage, AppConfig, BaseRecord, Entity, RecordService, Storage,
};
use log::warn;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line options for the record console.
#[derive(Parser)]
#[command(name = "hbnb_cli", version)]
struct Cli {
    /// Optional JSON config file; `HBNB_*` environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage information
    Ping,
    /// Create and save a new record, printing its id
    Create,
    /// Print one record
    Show { id: String },
    /// Delete one record
    Destroy { id: String },
    /// Print every record
    All,
    /// Print the number of stored records
    Count,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("** {err} **");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Command::Ping = cli.command {
        println!("hbnb_core ping={}", hbnb_core::ping());
        println!("hbnb_core version={}", hbnb_core::core_version());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut service = RecordService::new(open_storage(&config)?);
    match cli.command {
        Command::Ping => {}
        Command::Create => {
            let record: BaseRecord = service.create()?;
            println!("{}", record.id());
        }
        Command::Show { id } => match service.get::<BaseRecord>(&id)? {
            Some(record) => println!("{}", record.describe()),
            None => println!("** no instance found **"),
        },
        Command::Destroy { id } => {
            if !service.destroy::<BaseRecord>(&id)? {
                warn!("event=cli_destroy module=cli status=not_found id={}", id);
                println!("** no instance found **");
            }
        }
        Command::All => {
            for record in service.all::<BaseRecord>()? {
                println!("{}", record.describe());
            }
        }
        Command::Count => println!("{}", service.storage().count(None)?),
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(AppConfig::from_json_str(&std::fs::read_to_string(path)?)?),
        None => Ok(AppConfig::from_env()?),
    }
}
