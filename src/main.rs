// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::fmt;

use spendwise::models::{TransactionKind, UserContext};
use spendwise::utils::log_filter;
use spendwise::{cli, commands, db};

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` replaces
/// the default filter entirely.
fn init_tracing() {
    let directives = std::env::var("RUST_LOG").ok();
    fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();
    let ctx = UserContext::new(matches.get_one::<i64>("user").copied().unwrap_or(1));

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("expense", sub)) => {
            commands::transactions::handle(&mut conn, &ctx, TransactionKind::Expense, sub)?
        }
        Some(("income", sub)) => {
            commands::transactions::handle(&mut conn, &ctx, TransactionKind::Income, sub)?
        }
        Some(("schedule", sub)) => commands::schedule::handle(sub)?,
        Some(("category", sub)) => commands::categories::handle(&conn, sub)?,
        Some(("bank", sub)) => commands::banks::handle_banks(&conn, sub)?,
        Some(("card", sub)) => commands::banks::handle_cards(&conn, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, &ctx, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, &ctx, sub)?,
        Some(("import", sub)) => commands::importer::handle(&mut conn, &ctx, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn, &ctx)?,
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
