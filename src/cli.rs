//! Command-line interface
//!
//! The presentation layer: parses arguments, drives the generator and the
//! scheme store, and renders results. One invocation does one thing;
//! validation failures and storage errors surface as process errors.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app::App;
use crate::generator::{self, GeneratorError};
use crate::storage::StorageError;
use crate::types::scheme::Scheme;

/// Random integer generator with saved range schemes
#[derive(Debug, Parser)]
#[command(name = "rangen", version, about)]
pub struct Cli {
    /// Override the data directory holding saved schemes
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate random integers in an inclusive range
    Generate {
        /// Inclusive lower bound
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        min: i64,
        /// Inclusive upper bound
        #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
        max: i64,
        /// How many integers to draw
        #[arg(long, default_value_t = 1)]
        count: i32,
        /// Print all results space-separated on one line
        #[arg(long)]
        plain: bool,
    },
    /// Generate using the bounds of a saved scheme
    Roll {
        /// Name of the saved scheme
        name: String,
        /// How many integers to draw
        #[arg(long, default_value_t = 1)]
        count: i32,
        /// Print all results space-separated on one line
        #[arg(long)]
        plain: bool,
    },
    /// Manage saved range schemes
    #[command(subcommand)]
    Scheme(SchemeCommand),
}

#[derive(Debug, Subcommand)]
pub enum SchemeCommand {
    /// Save a named range scheme
    Add {
        /// Display name for the scheme
        name: String,
        /// Inclusive lower bound
        #[arg(long, allow_negative_numbers = true)]
        min: i64,
        /// Inclusive upper bound
        #[arg(long, allow_negative_numbers = true)]
        max: i64,
    },
    /// List saved schemes in insertion order
    List,
    /// Delete saved schemes by name, or by exact name and bounds
    Remove {
        /// Name of the scheme(s) to delete
        name: String,
        /// Match only this lower bound
        #[arg(long, requires = "max", allow_negative_numbers = true)]
        min: Option<i64>,
        /// Match only this upper bound
        #[arg(long, requires = "min", allow_negative_numbers = true)]
        max: Option<i64>,
    },
}

/// Presentation-level errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no saved scheme matching '{0}'")]
    UnknownScheme(String),
    #[error("scheme name must not be blank")]
    BlankName,
}

/// Execute a parsed command against the configured data directory.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let app = match cli.data_dir {
        Some(dir) => App::with_data_dir(dir),
        None => App::new()?,
    };

    match cli.command {
        Command::Generate {
            min,
            max,
            count,
            plain,
        } => {
            let results = generator::generate_multiple(min, max, count)?;
            print_results(&results, plain);
            Ok(())
        }
        Command::Roll { name, count, plain } => {
            let sub = app.schemes.observe_schemes().await?;
            let scheme = sub
                .current()
                .into_iter()
                .find(|s| s.name == name)
                .ok_or(CliError::UnknownScheme(name))?;
            let results = generator::generate_multiple(scheme.min, scheme.max, count)?;
            print_results(&results, plain);
            Ok(())
        }
        Command::Scheme(cmd) => run_scheme(&app, cmd).await,
    }
}

async fn run_scheme(app: &App, cmd: SchemeCommand) -> Result<(), CliError> {
    match cmd {
        SchemeCommand::Add { name, min, max } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CliError::BlankName);
            }
            let scheme = Scheme::new(name, min, max);
            app.schemes.add_scheme(scheme.clone()).await?;
            println!("Saved {}", describe(&scheme));
            Ok(())
        }
        SchemeCommand::List => {
            let sub = app.schemes.observe_schemes().await?;
            let schemes = sub.current();
            if schemes.is_empty() {
                println!("No saved schemes");
                return Ok(());
            }
            for scheme in &schemes {
                println!("{}", describe(scheme));
            }
            Ok(())
        }
        SchemeCommand::Remove { name, min, max } => {
            let sub = app.schemes.observe_schemes().await?;
            let current = sub.current();
            let matching: Vec<&Scheme> = current
                .iter()
                .filter(|s| {
                    s.name == name
                        && min.map_or(true, |m| s.min == m)
                        && max.map_or(true, |m| s.max == m)
                })
                .collect();
            if matching.is_empty() {
                return Err(CliError::UnknownScheme(name));
            }

            let removed = matching.len();
            let mut targets: Vec<Scheme> = Vec::new();
            for scheme in matching {
                if !targets.contains(scheme) {
                    targets.push(scheme.clone());
                }
            }
            for scheme in &targets {
                app.schemes.remove_scheme(scheme).await?;
            }
            println!("Removed {} saved scheme(s) matching '{}'", removed, name);
            Ok(())
        }
    }
}

fn print_results(results: &[i64], plain: bool) {
    if plain {
        let joined: Vec<String> = results.iter().map(|v| v.to_string()).collect();
        println!("{}", joined.join(" "));
    } else if let [single] = results {
        println!("{}", single);
    } else {
        for (i, value) in results.iter().enumerate() {
            println!("#{:<3} {}", i + 1, value);
        }
    }
}

fn describe(scheme: &Scheme) -> String {
    format!("{}  ({} ~ {})", scheme.name, scheme.min, scheme.max)
}
