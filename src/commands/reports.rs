// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use crate::models::{TransactionFilter, TransactionKind, UserContext};
use crate::store::list_transactions;
use crate::utils::{arg, category_name, fmt_money, maybe_print_json, parse_month, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, ctx: &UserContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("monthly", sub)) => monthly(conn, ctx, sub)?,
        Some(("category", sub)) => by_category(conn, ctx, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotals {
    pub month: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

/// Income, expense and net per month of `year`; months without records are
/// left out.
pub fn monthly_totals(conn: &Connection, ctx: &UserContext, year: i32) -> Result<Vec<MonthTotals>> {
    let filter = TransactionFilter {
        years: vec![year],
        ..TransactionFilter::default()
    };
    let mut map: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for kind in [TransactionKind::Income, TransactionKind::Expense] {
        for t in list_transactions(conn, ctx, kind, &filter)? {
            let entry = map
                .entry(t.occurrence_date.format("%Y-%m").to_string())
                .or_insert((Decimal::ZERO, Decimal::ZERO));
            match kind {
                TransactionKind::Income => entry.0 += t.amount,
                TransactionKind::Expense => entry.1 += t.amount,
            }
        }
    }
    Ok(map
        .into_iter()
        .map(|(month, (income, expense))| MonthTotals {
            month,
            income,
            expense,
            net: income - expense,
        })
        .collect())
}

fn monthly(conn: &Connection, ctx: &UserContext, sub: &clap::ArgMatches) -> Result<()> {
    let year = *sub
        .get_one::<i32>("year")
        .ok_or_else(|| anyhow!("Missing required argument --year"))?;
    let data = monthly_totals(conn, ctx, year)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|m| {
                vec![
                    m.month.clone(),
                    fmt_money(&m.income),
                    fmt_money(&m.expense),
                    fmt_money(&m.net),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Month", "Income", "Expense", "Net"], rows)
        );
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub kind: TransactionKind,
    pub category: String,
    pub total: Decimal,
}

/// Totals per category for one `YYYY-MM` month, largest first within each kind.
pub fn category_totals(
    conn: &Connection,
    ctx: &UserContext,
    month: &str,
) -> Result<Vec<CategoryTotal>> {
    let month = parse_month(month)?;
    let (y, m) = month
        .split_once('-')
        .ok_or_else(|| anyhow!("Invalid month '{}'", month))?;
    let filter = TransactionFilter {
        years: vec![y.parse()?],
        months: vec![m.parse()?],
        ..TransactionFilter::default()
    };
    let mut out = Vec::new();
    for kind in [TransactionKind::Expense, TransactionKind::Income] {
        let mut agg: BTreeMap<i64, Decimal> = BTreeMap::new();
        for t in list_transactions(conn, ctx, kind, &filter)? {
            *agg.entry(t.category_id).or_insert(Decimal::ZERO) += t.amount;
        }
        let mut items = Vec::new();
        for (cat, total) in agg {
            items.push(CategoryTotal {
                kind,
                category: category_name(conn, cat)?,
                total,
            });
        }
        items.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        out.extend(items);
    }
    Ok(out)
}

fn by_category(conn: &Connection, ctx: &UserContext, sub: &clap::ArgMatches) -> Result<()> {
    let data = category_totals(conn, ctx, arg(sub, "month")?)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|c| vec![c.kind.to_string(), c.category.clone(), fmt_money(&c.total)])
            .collect();
        println!("{}", pretty_table(&["Kind", "Category", "Total"], rows));
    }
    Ok(())
}
