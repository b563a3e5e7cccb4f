//! # Pharmacy Counter Entry Point
//!
//! Binary for the counter terminal. `pharmacy` alone opens the shell;
//! `pharmacy <page> ...` runs one command and exits.
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharmacy Counter                                 │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Terminal                                    │  │
//! │  │  pharmacy stock list --status low      (one-shot)                │  │
//! │  │  pharmacy                              (shell: billing> ...)     │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    Rust Backend (this crate)                     │  │
//! │  │                                                                  │  │
//! │  │  main.rs ────► Parses arguments, maps errors to exit codes       │  │
//! │  │                                                                  │  │
//! │  │  lib.rs ─────► Logging, config, store, dispatch                  │  │
//! │  │                                                                  │  │
//! │  │  commands/ ──► dashboard, billing, stock, sales, payments, ...   │  │
//! │  │                                                                  │  │
//! │  │  state/ ─────► AppConfig, SessionState                           │  │
//! │  │                                                                  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  SQLite cache (pharmacy.db)  ◄──►  remote endpoint (optional)    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exit Codes
//! 0 success, 1 storage or internal, 2 rejected input, 3 config, 4 remote

use std::process::ExitCode;

use clap::Parser;

use pharma_counter::cli::Cli;
use pharma_counter::notify::Notice;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    pharma_counter::init_tracing();

    match pharma_counter::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Notice::error(e.message));
            ExitCode::from(e.code.exit_code() as u8)
        }
    }
}
