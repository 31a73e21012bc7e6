//! schema-ledger CLI
//!
//! Command-line tool for recording table definitions and printing the
//! statements that evolve them.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use schema_ledger::config::{local_origin, DEFAULT_LOG_DIR};
use schema_ledger::history::TIMESTAMP_FORMAT;
use schema_ledger::prelude::*;

/// Append-only table definition history with migration synthesis.
#[derive(Parser)]
#[command(name = "schema-ledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding one history log per table.
    #[arg(short, long, env = "SCHEMA_LEDGER_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Origin host recorded with each capture. Defaults to this machine's
    /// host name.
    #[arg(short, long, env = "HOSTNAME")]
    origin: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one table's current definition.
    Capture {
        /// Table name.
        #[arg(short, long)]
        table: String,

        /// File holding the `SHOW CREATE TABLE` output, or `-` for stdin.
        #[arg(short, long)]
        definition: PathBuf,

        /// Show statements without recording the capture.
        #[arg(long)]
        dry_run: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// Record every `*.sql` definition in a directory, one table per file.
    Run {
        /// Directory of definitions; the file stem is the table name.
        #[arg(short, long)]
        definitions: PathBuf,

        /// Show statements without recording the captures.
        #[arg(long)]
        dry_run: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// List the recorded captures of a table.
    History {
        /// Table name.
        #[arg(short, long)]
        table: String,
    },

    /// Print the most recent recorded definition of a table.
    Last {
        /// Table name.
        #[arg(short, long)]
        table: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let origin = cli.origin.unwrap_or_else(local_origin);
    let config = LedgerConfig::new(cli.log_dir, &origin)?;
    let ledger = Ledger::open(&config);

    match cli.command {
        Commands::Capture {
            table,
            definition,
            dry_run,
            format,
        } => {
            let text = read_definition(&definition)?;
            let plan = ledger
                .capture(&table, &text, dry_run)
                .inspect_err(print_unrecorded)?;
            match format {
                Format::Text => print_plan(&plan),
                Format::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            }
        }

        Commands::Run {
            definitions,
            dry_run,
            format,
        } => {
            let inputs = TableInput::load_dir(&definitions)?;
            info!("Processing {} table(s) from {}", inputs.len(), definitions.display());

            let report = ledger.capture_all(inputs, dry_run);
            match format {
                Format::Text => {
                    for plan in &report.plans {
                        print_plan(plan);
                    }
                    for failure in &report.failures {
                        eprintln!("-- {}: FAILED: {}", failure.table, failure.message);
                        print_unrecorded(&failure.error);
                    }
                }
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            report.into_result()?;
        }

        Commands::History { table } => {
            let entries = ledger.history().entries(&table)?;

            if entries.is_empty() {
                info!("No captures recorded for {table}.");
            } else {
                println!("\nCaptures of {table}:");
                println!("{:-<60}", "");

                for entry in &entries {
                    println!(
                        " {} by {} ({} statement(s))",
                        entry.capture.captured_at.format(TIMESTAMP_FORMAT),
                        entry.capture.origin,
                        entry.statements.len()
                    );
                }
                println!();
            }
        }

        Commands::Last { table } => match ledger.history().most_recent(&table)? {
            Some(capture) => println!("{};", capture.definition),
            None => info!("No captures recorded for {table}."),
        },
    }

    Ok(())
}

fn read_definition(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn print_plan(plan: &Plan) {
    match plan.outcome {
        Outcome::Unchanged => println!("-- {}: unchanged", plan.table),
        Outcome::Initial => println!("-- {}: first capture", plan.table),
        Outcome::Changed => println!("-- {}: {} change(s)", plan.table, plan.diff.len()),
    }
    for statement in &plan.statements {
        println!("{statement};");
    }
    for warning in &plan.warnings {
        println!("-- warning: {warning}");
    }
}

/// Prints statements that were computed but never made it into the log.
fn print_unrecorded(error: &LedgerError) {
    if let LedgerError::Unrecorded {
        table, statements, ..
    } = error
    {
        println!("-- {table}: NOT RECORDED, statements computed:");
        for statement in statements {
            println!("{statement};");
        }
    }
}
