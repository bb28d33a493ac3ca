// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::SeriesError;
use crate::models::{
    ENVELOPE_VERSION, Transaction, TransactionEnvelope, TransactionKind, UserContext, check_amount,
    check_expense_fields,
};
use crate::series::check_series;
use crate::store;
use crate::utils::arg;
use anyhow::{Context, Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, ctx: &UserContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, ctx, sub),
        _ => Ok(()),
    }
}

/// Parses and validates a versioned envelope. Anything that does not match
/// the schema exactly is `MalformedSeries`; nothing is guessed.
pub fn parse_envelope(text: &str) -> Result<TransactionEnvelope> {
    let envelope: TransactionEnvelope = serde_json::from_str(text)
        .map_err(|e| SeriesError::MalformedSeries(format!("invalid envelope: {}", e)))?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(SeriesError::MalformedSeries(format!(
            "unsupported envelope version {} (expected {})",
            envelope.version, ENVELOPE_VERSION
        ))
        .into());
    }
    if let Some(t) = envelope
        .transactions
        .iter()
        .find(|t| t.kind != envelope.kind)
    {
        return Err(SeriesError::MalformedSeries(format!(
            "record {} is {} inside a {} envelope",
            t.id, t.kind, envelope.kind
        ))
        .into());
    }
    if let Some(issue) = check_series(&envelope.transactions).into_iter().next() {
        return Err(SeriesError::MalformedSeries(issue.to_string()).into());
    }
    for t in &envelope.transactions {
        check_record(t)?;
    }
    Ok(envelope)
}

fn check_record(t: &Transaction) -> Result<()> {
    if t.kind == TransactionKind::Income && (t.has_installments || t.installment_group_id.is_some())
    {
        return Err(SeriesError::MalformedSeries(format!(
            "record {} is an income split into installments",
            t.id
        ))
        .into());
    }
    check_amount(t.amount).with_context(|| format!("Record {}", t.id))?;
    if t.description.trim().is_empty() {
        bail!("Record {} has an empty description", t.id);
    }
    check_expense_fields(t.kind, t.payment_method, t.credit_card_id)
        .with_context(|| format!("Record {}", t.id))
}

fn import_transactions(
    conn: &mut Connection,
    ctx: &UserContext,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let path = arg(sub, "path")?;
    let text = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
    let envelope = parse_envelope(&text)?;
    let kind = envelope.kind;
    let n = store::import_transactions(conn, ctx, envelope.transactions)?;
    println!("Imported {} {} records from {}", n, kind, path);
    Ok(())
}
