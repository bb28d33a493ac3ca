// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{
    ENVELOPE_VERSION, TransactionEnvelope, TransactionFilter, TransactionKind, UserContext,
};
use crate::store::list_transactions;
use crate::utils::{arg, category_name};
use anyhow::{Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, ctx: &UserContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, ctx, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, ctx: &UserContext, sub: &clap::ArgMatches) -> Result<()> {
    let kind: TransactionKind = arg(sub, "kind")?.parse()?;
    let fmt = arg(sub, "format")?.to_lowercase();
    let out = arg(sub, "out")?;
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }

    let rows = list_transactions(conn, ctx, kind, &TransactionFilter::default())?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "date",
                "description",
                "amount",
                "category",
                "payment_method",
                "recurring_group_id",
                "installment_group_id",
                "installment",
            ])?;
            for t in &rows {
                wtr.write_record([
                    t.id.to_string(),
                    t.occurrence_date.to_string(),
                    t.description.clone(),
                    t.amount.to_string(),
                    category_name(conn, t.category_id)?,
                    t.payment_method
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                    t.recurring_group_id.clone().unwrap_or_default(),
                    t.installment_group_id.clone().unwrap_or_default(),
                    t.installment_label(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            let count = rows.len();
            let envelope = TransactionEnvelope {
                version: ENVELOPE_VERSION,
                kind,
                transactions: rows,
            };
            std::fs::write(out, serde_json::to_string_pretty(&envelope)?)?;
            tracing::debug!(count, "wrote envelope");
        }
    }
    println!("Exported {} records to {}", kind, out);
    Ok(())
}
