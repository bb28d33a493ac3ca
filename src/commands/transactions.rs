// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{
    NewTransaction, PaymentMethod, SeriesKey, Transaction, TransactionFilter, TransactionKind,
    TransactionPatch, UserContext,
};
use crate::series::{MutationPlan, Scope};
use crate::store;
use crate::utils::{
    arg, category_name, fmt_money, id_for_bank, id_for_card, id_for_category, id_for_subcategory,
    maybe_print_json, opt_arg, parse_date, parse_decimal, pretty_table,
};
use anyhow::{Result, anyhow, bail};
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    m: &clap::ArgMatches,
) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, ctx, kind, sub)?,
        Some(("list", sub)) => list(conn, ctx, kind, sub)?,
        Some(("series", sub)) => series(conn, ctx, kind, sub)?,
        Some(("show", sub)) => show(conn, ctx, kind, sub)?,
        Some(("edit", sub)) => edit(conn, ctx, kind, sub)?,
        Some(("rm", sub)) => rm(conn, ctx, kind, sub)?,
        Some(("extend", sub)) => extend(conn, ctx, kind, sub)?,
        _ => {}
    }
    Ok(())
}

/// Reference fields named on the command line, resolved to ids.
#[derive(Debug, Default)]
struct Fields {
    category_id: Option<i64>,
    subcategory_id: Option<i64>,
    bank_id: Option<i64>,
    payment_method: Option<PaymentMethod>,
    credit_card_id: Option<i64>,
}

fn resolve_fields(conn: &Connection, sub: &clap::ArgMatches) -> Result<Fields> {
    let category_id = opt_arg(sub, "category")
        .map(|c| id_for_category(conn, c))
        .transpose()?;
    let subcategory_id = match (opt_arg(sub, "subcategory"), category_id) {
        (Some(s), Some(parent)) => Some(id_for_subcategory(conn, parent, s)?),
        (Some(_), None) => bail!("--subcategory needs --category"),
        (None, _) => None,
    };
    let bank_id = opt_arg(sub, "bank")
        .map(|b| id_for_bank(conn, b))
        .transpose()?;
    // Expense-only arguments are not defined on income commands.
    let has = |name: &str| {
        sub.try_get_one::<String>(name)
            .ok()
            .flatten()
            .is_some_and(|s| !s.trim().is_empty())
    };
    let mut payment_method = if has("method") {
        Some(arg(sub, "method")?.parse::<PaymentMethod>()?)
    } else {
        None
    };
    let credit_card_id = if has("card") {
        Some(id_for_card(conn, arg(sub, "card")?)?)
    } else {
        None
    };
    if credit_card_id.is_some() && payment_method.is_none() {
        payment_method = Some(PaymentMethod::Card);
    }
    Ok(Fields {
        category_id,
        subcategory_id,
        bank_id,
        payment_method,
        credit_card_id,
    })
}

pub fn new_transaction_from_args(
    conn: &Connection,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<NewTransaction> {
    let fields = resolve_fields(conn, sub)?;
    let Some(category_id) = fields.category_id else {
        bail!("Missing required argument --category");
    };
    Ok(NewTransaction {
        kind,
        amount: parse_decimal(arg(sub, "amount")?)?,
        description: arg(sub, "description")?.to_string(),
        date: parse_date(arg(sub, "date")?)?,
        category_id,
        subcategory_id: fields.subcategory_id,
        bank_id: fields.bank_id,
        payment_method: fields.payment_method,
        credit_card_id: fields.credit_card_id,
    })
}

pub fn patch_from_args(conn: &Connection, sub: &clap::ArgMatches) -> Result<TransactionPatch> {
    let fields = resolve_fields(conn, sub)?;
    Ok(TransactionPatch {
        amount: opt_arg(sub, "amount").map(parse_decimal).transpose()?,
        description: opt_arg(sub, "description").map(String::from),
        category_id: fields.category_id,
        subcategory_id: fields.subcategory_id,
        bank_id: fields.bank_id,
        payment_method: fields.payment_method,
        credit_card_id: fields.credit_card_id,
    })
}

fn add(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let new = new_transaction_from_args(conn, kind, sub)?;
    let installments = sub
        .try_get_one::<u32>("installments")
        .ok()
        .flatten()
        .copied();

    if let Some(n) = installments {
        let created = store::create_installment_series(conn, ctx, &new, n)?;
        println!(
            "Recorded {} installments of {} for '{}' starting {}",
            created.len(),
            fmt_money(&new.amount),
            new.description,
            new.date
        );
    } else if sub.get_flag("recurring") {
        let until = opt_arg(sub, "until").map(parse_date).transpose()?;
        let created = store::create_recurring_series(conn, ctx, &new, until)?;
        let group = created
            .first()
            .and_then(|t| t.recurring_group_id.clone())
            .unwrap_or_default();
        println!(
            "Recorded recurring {} '{}' ({} occurrences, group {})",
            kind,
            new.description,
            created.len(),
            group
        );
    } else {
        let t = store::insert_single(conn, ctx, &new)?;
        println!(
            "Recorded {} {} on {} '{}' (id {})",
            kind,
            fmt_money(&t.amount),
            t.occurrence_date,
            t.description,
            t.id
        );
    }
    Ok(())
}

pub fn filter_from_args(conn: &Connection, sub: &clap::ArgMatches) -> Result<TransactionFilter> {
    Ok(TransactionFilter {
        months: sub
            .get_many::<u32>("month")
            .map(|v| v.copied().collect())
            .unwrap_or_default(),
        years: sub
            .get_many::<i32>("year")
            .map(|v| v.copied().collect())
            .unwrap_or_default(),
        category_id: opt_arg(sub, "category")
            .map(|c| id_for_category(conn, c))
            .transpose()?,
        description: opt_arg(sub, "description").map(String::from),
        is_recurring: sub.get_one::<bool>("recurring").copied(),
        limit: sub.get_one::<usize>("limit").copied(),
    })
}

fn series_label(t: &Transaction) -> String {
    match t.series_key() {
        Some(SeriesKey::Installment(_)) => t.installment_label(),
        Some(SeriesKey::Recurring(_)) => "recurring".into(),
        Some(SeriesKey::Orphan(_)) => "series?".into(),
        None => String::new(),
    }
}

fn rows_for(conn: &Connection, data: &[Transaction]) -> Result<Vec<Vec<String>>> {
    data.iter()
        .map(|t| -> Result<Vec<String>> {
            Ok(vec![
                t.id.to_string(),
                t.occurrence_date.to_string(),
                t.description.clone(),
                fmt_money(&t.amount),
                category_name(conn, t.category_id)?,
                series_label(t),
                t.payment_method
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            ])
        })
        .collect()
}

const ROW_HEADERS: [&str; 7] = [
    "ID",
    "Date",
    "Description",
    "Amount",
    "Category",
    "Series",
    "Method",
];

fn list(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let filter = filter_from_args(conn, sub)?;
    let data = store::list_transactions(conn, ctx, kind, &filter)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!("{}", pretty_table(&ROW_HEADERS, rows_for(conn, &data)?));
    }
    Ok(())
}

#[derive(Serialize)]
pub struct SeriesRow {
    pub group: String,
    pub first_id: i64,
    pub description: String,
    pub amount: String,
    pub first: String,
    pub last: String,
    pub count: usize,
    pub position: String,
}

pub fn series_rows(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
) -> Result<Vec<SeriesRow>> {
    let view = store::list_series(conn, ctx, kind)?;
    Ok(view
        .series
        .into_iter()
        .map(|s| SeriesRow {
            group: s.key.to_string(),
            first_id: s.representative.id,
            description: s.representative.description.clone(),
            amount: fmt_money(&s.representative.amount),
            first: s.earliest_date.to_string(),
            last: s.latest_date.to_string(),
            count: s.occurrence_count,
            position: s.representative.installment_label(),
        })
        .collect())
}

fn series(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let data = series_rows(conn, ctx, kind)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.group.clone(),
                    r.first_id.to_string(),
                    r.description.clone(),
                    r.amount.clone(),
                    r.first.clone(),
                    r.last.clone(),
                    r.count.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Series", "First ID", "Description", "Amount", "From", "To", "Count"],
                rows
            )
        );
    }
    Ok(())
}

fn show(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let id = id_arg(sub)?;
    let target = store::get_transaction(conn, ctx, kind, id)?;
    let members = match target.series_key() {
        Some(key) => store::series_members(conn, ctx, kind, &key)?,
        None => vec![target],
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &members)? {
        println!("{}", pretty_table(&ROW_HEADERS, rows_for(conn, &members)?));
    }
    Ok(())
}

fn id_arg(sub: &clap::ArgMatches) -> Result<i64> {
    sub.get_one::<i64>("id")
        .copied()
        .ok_or_else(|| anyhow!("Missing required argument --id"))
}

fn scope_of(sub: &clap::ArgMatches) -> Result<Scope> {
    Ok(arg(sub, "scope")?.parse::<Scope>()?)
}

fn describe(plan: &MutationPlan) -> String {
    match &plan.key {
        Some(key) => format!("{} record(s) of {} (scope {})", plan.affected.len(), key, plan.scope),
        None => format!("record {}", plan.target_id),
    }
}

fn edit(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let id = id_arg(sub)?;
    let scope = scope_of(sub)?;
    let patch = patch_from_args(conn, sub)?;
    let plan = store::edit_scoped(conn, ctx, kind, id, scope, &patch)?;
    println!("Updated {}", describe(&plan));
    Ok(())
}

fn rm(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let id = id_arg(sub)?;
    let scope = scope_of(sub)?;
    let plan = store::delete_scoped(conn, ctx, kind, id, scope)?;
    println!("Deleted {}", describe(&plan));
    if plan.key.is_some() && plan.destroys_series {
        println!("Series removed entirely");
    }
    Ok(())
}

fn extend(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let group = arg(sub, "group")?;
    let until = parse_date(arg(sub, "until")?)?;
    let created = store::extend_recurring_series(conn, ctx, kind, group, until)?;
    match (created.first(), created.last()) {
        (Some(first), Some(last)) => println!(
            "Added {} occurrence(s) from {} to {}",
            created.len(),
            first.occurrence_date,
            last.occurrence_date
        ),
        _ => println!("Series already covers {}", until),
    }
    Ok(())
}
