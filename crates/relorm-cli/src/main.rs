//! relorm command-line tool
//!
//! Renders DDL for a JSON schema document and upgrades SQLite databases to
//! the document's version.

mod commands;
mod formatter;

use clap::{Parser, Subcommand};
use commands::{CliError, LoadedSchema};
use formatter::OutputFormat;
use relorm_core::ForeignKeyMode;
use std::path::PathBuf;

/// relorm command-line tool
#[derive(Parser, Debug)]
#[command(name = "relorm")]
#[command(version, about = "Schema and migration tool for relorm")]
pub struct Args {
    /// Output format
    #[arg(long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the CREATE statements of a schema document
    Ddl {
        /// Schema document (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Emulate foreign keys with triggers
        #[arg(long)]
        triggers: bool,
    },

    /// Upgrade a database to the schema document's version
    Migrate {
        /// Schema document (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// SQLite database file
        #[arg(short, long)]
        db: PathBuf,

        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the stored schema version of a database
    Version {
        /// SQLite database file
        #[arg(short, long)]
        db: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("relorm=warn,relorm_core=warn")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, CliError> {
    let mut config = commands::load_config(args.config.as_deref())?;

    match args.command {
        Command::Ddl { schema, triggers } => {
            if triggers {
                config = config.with_foreign_keys(ForeignKeyMode::Triggers);
            }
            let schema = LoadedSchema::from_path(&schema)?;
            let statements = commands::ddl(&schema, &config)?;
            Ok(formatter::format_statements(&statements, args.format))
        }
        Command::Migrate {
            schema,
            db,
            dry_run,
        } => {
            let schema = LoadedSchema::from_path(&schema)?;
            if dry_run {
                let plan = commands::plan(&schema, &config, &db)?;
                Ok(formatter::format_plan(&plan, args.format))
            } else {
                let result = commands::migrate(&schema, &config, &db)?;
                Ok(formatter::format_result(&result, args.format))
            }
        }
        Command::Version { db } => {
            let version = commands::version(&db)?;
            Ok(formatter::format_version(version, args.format))
        }
    }
}
