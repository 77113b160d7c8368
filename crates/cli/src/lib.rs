pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "pricewise",
    about = "Pricewise catalog operator CLI",
    long_about = "Manage the grocery catalog database and query the cross-store search index.",
    after_help = "Examples:\n  pricewise import listings.json\n  pricewise search \"olpers milk 1l\" --top-n 5\n  pricewise doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Import a JSON array of store listings into the catalog")]
    Import {
        #[arg(help = "Path to a JSON file of listings, each with a store_name")]
        path: PathBuf,
    },
    #[command(about = "Load the bundled multi-store sample catalog")]
    Seed,
    #[command(about = "Search the catalog and print ranked cross-store groups")]
    Search {
        query: String,
        #[arg(long, help = "Number of listings to retrieve before grouping")]
        top_n: Option<usize>,
    },
    #[command(about = "Recommend related products for a listing id")]
    Recommend {
        product_id: i64,
        #[arg(long, help = "Maximum number of recommendations")]
        top_n: Option<usize>,
    },
    #[command(about = "Print the raw catalog record for a listing id")]
    Lookup { product_id: i64 },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database connectivity, schema and index readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Import { path } => commands::import::run(&path),
        Command::Seed => commands::seed::run(),
        Command::Search { query, top_n } => commands::search::run(&query, top_n),
        Command::Recommend { product_id, top_n } => commands::recommend::run(product_id, top_n),
        Command::Lookup { product_id } => commands::lookup::run(product_id),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
