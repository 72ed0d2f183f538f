mod amount;
mod categorizer;
mod cli;
mod coverage;
mod db;
mod direction;
mod error;
mod fmt;
mod fsutil;
mod importer;
mod intake;
mod models;
mod normalizer;
mod ocr;
mod parsers;
mod reconciler;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&settings::load_settings().log_level);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { uploads } => cli::import::run(uploads),
        Commands::Parse {
            file,
            csv,
            parser,
            screenshot,
        } => cli::parse::run(&file, csv.as_deref(), parser.as_deref(), screenshot),
        Commands::Report => cli::report::run(),
        Commands::Rejected { file } => cli::rejected::run(file.as_deref()),
        Commands::Validate { file } => cli::validate::run(&file),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
