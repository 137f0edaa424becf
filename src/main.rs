//! Split Engine CLI
//!
//! Reads a group ledger CSV and writes the settlement plan (or the net
//! balances, or the pairwise debts) as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- [--strict] [--balances | --debts] ledger.csv > plan.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use split_engine::{EngineError, LedgerEngine, Result, SettlementConfig};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

/// Which part of the report goes to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Settlements,
    Balances,
    Debts,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut config = SettlementConfig::default();
    let mut output = Output::Settlements;
    let mut input_path = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--strict" => config.strict = true,
            "--balances" => output = Output::Balances,
            "--debts" => output = Output::Debts,
            _ if input_path.is_none() && !arg.starts_with("--") => input_path = Some(arg),
            _ => return Err(EngineError::UnknownOption(arg)),
        }
    }

    let input_path = input_path.ok_or(EngineError::MissingArgument)?;
    let file = File::open(&input_path)?;
    let reader = BufReader::new(file);

    let mut engine = LedgerEngine::new(config);
    engine.process_csv(reader)?;
    let report = engine.settle()?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    match output {
        Output::Settlements => report.write_settlements(handle)?,
        Output::Balances => report.write_balances(handle)?,
        Output::Debts => report.write_debts(handle)?,
    }

    Ok(())
}
