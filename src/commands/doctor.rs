// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{TransactionFilter, TransactionKind, UserContext};
use crate::series::{SeriesIssue, check_series};
use crate::store::list_transactions;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

/// Every series integrity problem in the stored records of `ctx`.
pub fn find_issues(conn: &Connection, ctx: &UserContext) -> Result<Vec<(TransactionKind, SeriesIssue)>> {
    let mut out = Vec::new();
    for kind in [TransactionKind::Expense, TransactionKind::Income] {
        let all = list_transactions(conn, ctx, kind, &TransactionFilter::default())?;
        out.extend(check_series(&all).into_iter().map(|i| (kind, i)));
    }
    Ok(out)
}

pub fn handle(conn: &Connection, ctx: &UserContext) -> Result<()> {
    let issues = find_issues(conn, ctx)?;
    if issues.is_empty() {
        println!("✅ doctor: no issues found");
        return Ok(());
    }
    let mut rows = Vec::new();
    for (kind, issue) in issues {
        tracing::warn!(%kind, "{}", issue);
        rows.push(vec![
            kind.to_string(),
            issue.key.map(|k| k.to_string()).unwrap_or_default(),
            issue.record_id.map(|id| id.to_string()).unwrap_or_default(),
            issue.message,
        ]);
    }
    println!("{}", pretty_table(&["Kind", "Series", "Record", "Issue"], rows));
    Ok(())
}
