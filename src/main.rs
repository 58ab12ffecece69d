mod command;
mod errors;
mod repl;
mod storage;

use std::fs::OpenOptions;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::path::Path;

use storage::Table;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "leafdb", version = VERSION, about = "Tiny B+tree-backed key/value store.")]
struct Cli {
    /// Path to the database file.
    db_path: Option<String>,
}

fn main() -> ExitCode {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("leafdb.log")
        .expect("Failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = match cli.db_path {
        Some(path) => path,
        None => {
            println!("Must supply a database filename");
            return ExitCode::SUCCESS;
        }
    };

    let table = match Table::open(Path::new(&db_path)) {
        Ok(table) => table,
        Err(e) => {
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match repl::run(table) {
        Ok(()) => ExitCode::SUCCESS,
        Err(errors::Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => ExitCode::SUCCESS,
        Err(e) => {
            println!("\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}
