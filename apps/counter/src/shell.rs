//! # Interactive Shell
//!
//! The router. Reads one line at a time, runs it against a single
//! [`Counter`] so the cart and page filters carry over, and prints the
//! result.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  start                                                                  │
//! │    seed demo catalog if empty (config app.seed_demo)                    │
//! │    show dashboard                                                       │
//! │    endpoint configured? ──► spawn resync on Arc<DataStore>              │
//! │                                                                         │
//! │  loop                                                                   │
//! │    prompt  "stock [3]> "   page + stock badge                           │
//! │    line ──► split_words ──► ShellLine (clap) ──► execute ──► print      │
//! │    errors print as ✗ notices, the loop keeps going                      │
//! │    EOF / exit / quit ──► leave                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use pharma_core::catalog::attention_badge_count;
use pharma_sync::DataStore;

use crate::cli::{split_words, Command, ShellCommand, ShellLine};
use crate::commands::{self, Counter};
use crate::error::CliResult;
use crate::notify::Notice;
use crate::state::Page;

/// What one input line asks the shell to do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Print(String),
    Nothing,
    Exit,
}

pub async fn run(mut counter: Counter) -> CliResult<()> {
    println!("{}", start(&mut counter).await?);
    spawn_background_resync(&counter.store).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", prompt(&counter).await);
        // A prompt that fails to flush only loses the prompt
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        match handle_line(&mut counter, &line).await {
            Step::Print(text) => println!("{}\n", text),
            Step::Nothing => {}
            Step::Exit => break,
        }
    }

    info!("Shell closed");
    Ok(())
}

/// Seeds when allowed and renders the landing page.
async fn start(counter: &mut Counter) -> CliResult<String> {
    if counter.config.app.seed_demo && counter.store.seed_if_empty().await? {
        info!("Demo catalog loaded");
    }
    commands::execute(counter, Command::Dashboard).await
}

async fn spawn_background_resync(store: &Arc<DataStore>) {
    if !store.is_configured().await {
        debug!("No endpoint configured, staying offline");
        return;
    }
    let store = Arc::clone(store);
    tokio::spawn(async move {
        match store.resync().await {
            Ok(report) => info!(
                flushed = report.flushed,
                medicines = ?report.medicines,
                bills = ?report.bills,
                "Background sync finished"
            ),
            Err(e) => warn!(error = %e, "Background sync failed"),
        }
    });
}

async fn prompt(counter: &Counter) -> String {
    let medicines = counter.store.medicines_cached().await;
    let threshold = counter.store.settings().await.threshold();
    match attention_badge_count(&medicines, threshold) {
        0 => format!("{}> ", counter.session.page),
        badge => format!("{} [{}]> ", counter.session.page, badge),
    }
}

/// Parses and runs one line.
pub async fn handle_line(counter: &mut Counter, line: &str) -> Step {
    let words = match split_words(line) {
        Ok(words) => words,
        Err(e) => return Step::Print(Notice::error(e).to_string()),
    };
    if words.is_empty() {
        return Step::Nothing;
    }

    let parsed = match ShellLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        // Help and usage errors come back from clap already formatted
        Err(e) => return Step::Print(e.render().to_string().trim_end().to_string()),
    };

    let result = match parsed.command {
        ShellCommand::Exit => return Step::Exit,
        ShellCommand::Go { page } => commands::execute(counter, page_command(page)).await,
        ShellCommand::Run(Command::Shell) => {
            return Step::Print(Notice::info("Already in the shell").to_string())
        }
        ShellCommand::Run(command) => commands::execute(counter, command).await,
    };

    match result {
        Ok(text) => Step::Print(text),
        Err(e) => Step::Print(Notice::error(e.message).to_string()),
    }
}

/// The command that shows a page with its current filters.
fn page_command(page: Page) -> Command {
    match page {
        Page::Dashboard => Command::Dashboard,
        Page::Billing => Command::Billing { action: None },
        Page::Stock => Command::Stock { action: None },
        Page::Sales => Command::Sales { action: None },
        Page::Payments => Command::Payments(Default::default()),
        Page::Reports => Command::Reports(Default::default()),
        Page::Settings => Command::Settings { action: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::seeded_counter;

    fn printed(step: Step) -> String {
        match step {
            Step::Print(text) => text,
            other => panic!("expected output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cart_survives_between_lines() {
        let mut counter = seeded_counter().await;

        handle_line(&mut counter, "billing search omeprazole").await;
        handle_line(&mut counter, "billing add 1").await;
        let out = printed(handle_line(&mut counter, "billing inc 1").await);
        assert!(out.contains("Omeprazole 20mg"));
        assert_eq!(counter.session.bill.cart.total_quantity(), 2);

        let out = printed(
            handle_line(&mut counter, "billing patient 'Asha Verma'").await,
        );
        assert!(out.contains("Patient   Asha Verma"));

        let out = printed(handle_line(&mut counter, "billing submit --payment UPI").await);
        assert!(out.starts_with("✓ Bill BILL-0005 saved"));
        assert!(counter.session.bill.cart.is_empty());
    }

    #[tokio::test]
    async fn test_go_exit_and_errors() {
        let mut counter = seeded_counter().await;

        printed(handle_line(&mut counter, "go stock").await);
        assert_eq!(counter.session.page, Page::Stock);
        assert_eq!(prompt(&counter).await, "stock [3]> ");

        let out = printed(handle_line(&mut counter, "stock show nothing-like-this").await);
        assert_eq!(out, "✗ Medicine not found: nothing-like-this");

        let out = printed(handle_line(&mut counter, "frobnicate").await);
        assert!(out.contains("frobnicate"));

        let out = printed(handle_line(&mut counter, "billing patient 'open").await);
        assert_eq!(out, "✗ Unclosed quote");

        assert_eq!(handle_line(&mut counter, "   ").await, Step::Nothing);
        assert_eq!(handle_line(&mut counter, "quit").await, Step::Exit);
    }

    #[tokio::test]
    async fn test_start_seeds_and_lands_on_dashboard() {
        let mut counter = seeded_counter().await;
        counter.store.clear_all().await.unwrap();
        counter.session.page = Page::Reports;

        let out = start(&mut counter).await.unwrap();
        assert!(out.starts_with("Dashboard"));
        assert_eq!(counter.session.page, Page::Dashboard);
        assert_eq!(counter.store.medicines_cached().await.len(), 10);
    }
}
