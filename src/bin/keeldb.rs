//! # keeldb CLI Entry Point
//!
//! ```bash
//! # Open (creating if absent) a database file
//! keeldb ./file.db
//!
//! # Show version / help
//! keeldb --version
//! keeldb --help
//! ```

use std::env;
use std::path::PathBuf;

use eyre::{bail, Result};
use tracing_subscriber::EnvFilter;

use keeldb::cli::Repl;
use keeldb::UserTable;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("keeldb {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            arg if arg.starts_with('-') => {
                bail!("Unknown option: {}", arg);
            }
            path => {
                if db_path.is_some() {
                    bail!("Only one database file may be given");
                }
                db_path = Some(PathBuf::from(path));
            }
        }
    }

    let db_path = match db_path {
        Some(path) => path,
        None => {
            print_usage();
            return Ok(());
        }
    };

    let table = UserTable::open_default(&db_path)?;
    Repl::new(table)?.run()
}

fn print_usage() {
    println!("Usage: keeldb [OPTIONS] <database-file>");
    println!();
    println!("Options:");
    println!("  -h, --help       Show this help");
    println!("  -v, --version    Show version");
}
