// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence boundary for expenses and incomes.
//!
//! Every call is scoped to an explicit [`UserContext`]. Multi-row writes run
//! inside one SQLite transaction: either every selected row changes or none
//! does.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SeriesError;
use crate::models::{
    NewTransaction, OPEN_END, SeriesKey, Transaction, TransactionFilter, TransactionKind,
    TransactionPatch, UserContext, check_expense_fields,
};
use crate::series::{
    MutationPlan, Scope, SeriesDefinition, SeriesView, generate_occurrences,
    group_and_select_representatives, plan_mutation,
};
use crate::utils::{horizon_months, parse_date, parse_decimal};

const COLUMNS: &str = "id, kind, amount, description, occurrence_date, category_id, \
    subcategory_id, bank_id, payment_method, credit_card_id, is_recurring, has_installments, \
    recurring_group_id, installment_group_id, current_installment, total_installments, \
    start_date, end_date";

fn from_row(r: &Row) -> Result<Transaction> {
    let kind: String = r.get(1)?;
    let amount: String = r.get(2)?;
    let date: String = r.get(4)?;
    let method: Option<String> = r.get(8)?;
    let start: Option<String> = r.get(16)?;
    let end: Option<String> = r.get(17)?;
    let id: i64 = r.get(0)?;
    Ok(Transaction {
        id,
        kind: kind.parse()?,
        amount: parse_decimal(&amount)
            .with_context(|| format!("Invalid amount '{}' on record {}", amount, id))?,
        description: r.get(3)?,
        occurrence_date: parse_date(&date)?,
        category_id: r.get(5)?,
        subcategory_id: r.get(6)?,
        bank_id: r.get(7)?,
        payment_method: method.map(|m| m.parse()).transpose()?,
        credit_card_id: r.get(9)?,
        is_recurring: r.get(10)?,
        has_installments: r.get(11)?,
        recurring_group_id: r.get(12)?,
        installment_group_id: r.get(13)?,
        current_installment: r.get(14)?,
        total_installments: r.get(15)?,
        start_date: start.as_deref().map(parse_date).transpose()?,
        end_date: end.as_deref().map(parse_date).transpose()?,
    })
}

fn query(conn: &Connection, sql: &str, values: Vec<Value>) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(values))?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(from_row(r)?);
    }
    Ok(out)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn scope_values(ctx: &UserContext, kind: TransactionKind) -> Vec<Value> {
    vec![
        Value::Integer(ctx.user_id),
        Value::Text(kind.as_str().to_string()),
    ]
}

pub fn get_transaction(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    id: i64,
) -> Result<Transaction> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id=? AND kind=? AND id=?",
        COLUMNS
    );
    let mut values = scope_values(ctx, kind);
    values.push(Value::Integer(id));
    query(conn, &sql, values)?
        .into_iter()
        .next()
        .ok_or_else(|| SeriesError::NotFound(id).into())
}

/// Records of one kind for `ctx`, ordered by date then id.
pub fn list_transactions(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>> {
    let mut sql = format!(
        "SELECT {} FROM transactions WHERE user_id=? AND kind=?",
        COLUMNS
    );
    let mut values = scope_values(ctx, kind);

    if !filter.months.is_empty() {
        sql.push_str(&format!(
            " AND CAST(substr(occurrence_date,6,2) AS INTEGER) IN ({})",
            placeholders(filter.months.len())
        ));
        values.extend(filter.months.iter().map(|m| Value::Integer(*m as i64)));
    }
    if !filter.years.is_empty() {
        sql.push_str(&format!(
            " AND CAST(substr(occurrence_date,1,4) AS INTEGER) IN ({})",
            placeholders(filter.years.len())
        ));
        values.extend(filter.years.iter().map(|y| Value::Integer(*y as i64)));
    }
    if let Some(cat) = filter.category_id {
        sql.push_str(" AND (category_id=? OR subcategory_id=?)");
        values.push(Value::Integer(cat));
        values.push(Value::Integer(cat));
    }
    if let Some(desc) = filter.description.as_deref().filter(|d| !d.is_empty()) {
        sql.push_str(" AND lower(description) LIKE ?");
        values.push(Value::Text(format!("%{}%", desc.to_lowercase())));
    }
    if let Some(rec) = filter.is_recurring {
        sql.push_str(" AND is_recurring=?");
        values.push(Value::Integer(rec as i64));
    }
    sql.push_str(" ORDER BY occurrence_date, id");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        values.push(Value::Integer(limit as i64));
    }
    query(conn, &sql, values)
}

/// Every stored member of the series `key`, ordered by date then id.
pub fn series_members(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    key: &SeriesKey,
) -> Result<Vec<Transaction>> {
    let mut values = scope_values(ctx, kind);
    let clause = match key {
        SeriesKey::Recurring(g) => {
            values.push(Value::Text(g.clone()));
            "recurring_group_id=?"
        }
        SeriesKey::Installment(g) => {
            values.push(Value::Text(g.clone()));
            "installment_group_id=?"
        }
        SeriesKey::Orphan(id) => {
            values.push(Value::Integer(*id));
            "id=?"
        }
    };
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id=? AND kind=? AND {} ORDER BY occurrence_date, id",
        COLUMNS, clause
    );
    query(conn, &sql, values)
}

/// One summary row per series plus the plain records.
pub fn list_series(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
) -> Result<SeriesView> {
    let all = list_transactions(conn, ctx, kind, &TransactionFilter::default())?;
    Ok(group_and_select_representatives(&all)?)
}

fn insert_row(conn: &Connection, ctx: &UserContext, t: &Transaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(user_id, kind, amount, description, occurrence_date, \
         category_id, subcategory_id, bank_id, payment_method, credit_card_id, is_recurring, \
         has_installments, recurring_group_id, installment_group_id, current_installment, \
         total_installments, start_date, end_date) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
        params![
            ctx.user_id,
            t.kind.as_str(),
            t.amount.to_string(),
            t.description,
            t.occurrence_date.to_string(),
            t.category_id,
            t.subcategory_id,
            t.bank_id,
            t.payment_method.map(|m| m.as_str()),
            t.credit_card_id,
            t.is_recurring,
            t.has_installments,
            t.recurring_group_id,
            t.installment_group_id,
            t.current_installment,
            t.total_installments,
            t.start_date.map(|d| d.to_string()),
            t.end_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn template(new: &NewTransaction, date: NaiveDate) -> Transaction {
    Transaction {
        id: 0,
        kind: new.kind,
        amount: new.amount,
        description: new.description.trim().to_string(),
        occurrence_date: date,
        category_id: new.category_id,
        subcategory_id: new.subcategory_id,
        bank_id: new.bank_id,
        payment_method: new.payment_method,
        credit_card_id: new.credit_card_id,
        is_recurring: false,
        has_installments: false,
        recurring_group_id: None,
        installment_group_id: None,
        current_installment: None,
        total_installments: None,
        start_date: None,
        end_date: None,
    }
}

fn insert_all(conn: &Connection, ctx: &UserContext, rows: Vec<Transaction>) -> Result<Vec<Transaction>> {
    let mut out = Vec::with_capacity(rows.len());
    for mut t in rows {
        t.id = insert_row(conn, ctx, &t)?;
        out.push(t);
    }
    Ok(out)
}

pub fn insert_single(
    conn: &Connection,
    ctx: &UserContext,
    new: &NewTransaction,
) -> Result<Transaction> {
    new.validate()?;
    let mut t = template(new, new.date);
    t.id = insert_row(conn, ctx, &t)?;
    debug!(id = t.id, kind = %t.kind, "inserted record");
    Ok(t)
}

fn generated_until(conn: &Connection, ctx: &UserContext, group: &str) -> Result<Option<NaiveDate>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT generated_until FROM recurring_series WHERE group_id=?1 AND user_id=?2",
            params![group, ctx.user_id],
            |r| r.get(0),
        )
        .optional()?;
    v.as_deref().map(parse_date).transpose()
}

/// Raises the high-water mark of a recurring series; never lowers it.
fn mark_generated(conn: &Connection, ctx: &UserContext, group: &str, date: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT INTO recurring_series(group_id, user_id, generated_until) VALUES (?1, ?2, ?3)
         ON CONFLICT(group_id) DO UPDATE
         SET generated_until=max(generated_until, excluded.generated_until)",
        params![group, ctx.user_id, date.to_string()],
    )?;
    Ok(())
}

/// Writes every installment of a new series up front. `new.amount` is the
/// value of each installment.
pub fn create_installment_series(
    conn: &mut Connection,
    ctx: &UserContext,
    new: &NewTransaction,
    total: u32,
) -> Result<Vec<Transaction>> {
    if new.kind != TransactionKind::Expense {
        bail!("Installments are only supported for expenses");
    }
    new.validate()?;
    let def = SeriesDefinition::monthly_count(new.date, total)?;
    let group = Uuid::new_v4().to_string();
    let rows: Vec<Transaction> = generate_occurrences(&def)
        .zip(1..)
        .map(|(date, n)| Transaction {
            has_installments: true,
            installment_group_id: Some(group.clone()),
            current_installment: Some(n),
            total_installments: Some(total),
            ..template(new, date)
        })
        .collect();

    let tx = conn.transaction()?;
    let created = insert_all(&tx, ctx, rows)?;
    tx.commit()?;
    info!(group = %group, installments = total, "created installment series");
    Ok(created)
}

/// Writes a recurring series. Without `end_date` the series never ends and
/// only the configured horizon of months is written; `extend` adds more.
pub fn create_recurring_series(
    conn: &mut Connection,
    ctx: &UserContext,
    new: &NewTransaction,
    end_date: Option<NaiveDate>,
) -> Result<Vec<Transaction>> {
    new.validate()?;
    let end = end_date.unwrap_or(*OPEN_END);
    let def = SeriesDefinition::monthly_until(new.date, end)?;
    let take = match end_date {
        Some(_) => usize::MAX,
        None => horizon_months(conn)? as usize,
    };
    let group = Uuid::new_v4().to_string();
    let rows: Vec<Transaction> = generate_occurrences(&def)
        .take(take)
        .map(|date| Transaction {
            is_recurring: true,
            recurring_group_id: Some(group.clone()),
            start_date: Some(new.date),
            end_date: Some(end),
            ..template(new, date)
        })
        .collect();

    let tx = conn.transaction()?;
    let created = insert_all(&tx, ctx, rows)?;
    if let Some(last) = created.last() {
        mark_generated(&tx, ctx, &group, last.occurrence_date)?;
    }
    tx.commit()?;
    info!(group = %group, occurrences = created.len(), "created recurring series");
    Ok(created)
}

/// Adds occurrences after the last date ever written for the series, up to
/// `until` and never past the series' own end date. Occurrences removed by
/// deletes are not written again.
pub fn extend_recurring_series(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    group_id: &str,
    until: NaiveDate,
) -> Result<Vec<Transaction>> {
    let tx = conn.transaction()?;
    let key = SeriesKey::Recurring(group_id.to_string());
    let members = series_members(&tx, ctx, kind, &key)?;
    let Some(latest) = members.last() else {
        bail!("Recurring series '{}' not found", group_id);
    };
    // Clamping only ever lowers the day of month, so the date with the
    // highest day still carries the series' original day.
    let start = members
        .iter()
        .map(|m| m.occurrence_date)
        .chain(latest.start_date)
        .max_by_key(|d| (d.day(), Reverse(*d)))
        .unwrap_or(latest.occurrence_date);
    let high = generated_until(&tx, ctx, group_id)?
        .map_or(latest.occurrence_date, |d| d.max(latest.occurrence_date));
    let limit = until.min(latest.end_date.unwrap_or(*OPEN_END));
    if limit <= high {
        return Ok(Vec::new());
    }
    let def = SeriesDefinition::monthly_until(start, limit)?;
    let rows: Vec<Transaction> = generate_occurrences(&def)
        .filter(|d| *d > high)
        .map(|date| Transaction {
            id: 0,
            occurrence_date: date,
            ..latest.clone()
        })
        .collect();
    let created = insert_all(&tx, ctx, rows)?;
    if let Some(last) = created.last() {
        mark_generated(&tx, ctx, group_id, last.occurrence_date)?;
    }
    tx.commit()?;
    info!(group = %group_id, added = created.len(), "extended recurring series");
    Ok(created)
}

/// Inserts already-validated records for `ctx`. Group ids are replaced with
/// fresh ones so imported series never merge into existing ones.
pub fn import_transactions(
    conn: &mut Connection,
    ctx: &UserContext,
    records: Vec<Transaction>,
) -> Result<usize> {
    let mut recurring: HashMap<String, String> = HashMap::new();
    let mut installment: HashMap<String, String> = HashMap::new();
    let rows: Vec<Transaction> = records
        .into_iter()
        .map(|mut t| {
            t.recurring_group_id = t.recurring_group_id.map(|g| {
                recurring
                    .entry(g)
                    .or_insert_with(|| Uuid::new_v4().to_string())
                    .clone()
            });
            t.installment_group_id = t.installment_group_id.map(|g| {
                installment
                    .entry(g)
                    .or_insert_with(|| Uuid::new_v4().to_string())
                    .clone()
            });
            t
        })
        .collect();
    let tx = conn.transaction()?;
    let created = insert_all(&tx, ctx, rows)?;
    for t in &created {
        if let Some(group) = &t.recurring_group_id {
            mark_generated(&tx, ctx, group, t.occurrence_date)?;
        }
    }
    tx.commit()?;
    info!(
        imported = created.len(),
        series = recurring.len() + installment.len(),
        "imported records"
    );
    Ok(created.len())
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn fetch_ids(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    ids: &[i64],
) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id=? AND kind=? AND id IN ({}) ORDER BY id",
        COLUMNS,
        placeholders(ids.len())
    );
    let mut values = scope_values(ctx, kind);
    values.extend(ids.iter().map(|id| Value::Integer(*id)));
    let found = query(conn, &sql, values)?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
        return Err(SeriesError::NotFound(*missing).into());
    }
    Ok(found)
}

fn update_in(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    ids: &[i64],
    patch: &TransactionPatch,
) -> Result<usize> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(0);
    }
    for mut t in fetch_ids(conn, ctx, kind, &ids)? {
        patch.apply(&mut t);
        check_expense_fields(kind, t.payment_method, t.credit_card_id)
            .with_context(|| format!("Update would leave record {} inconsistent", t.id))?;
    }

    let mut sets = Vec::new();
    let mut values = Vec::new();
    if let Some(a) = patch.amount {
        sets.push("amount=?");
        values.push(Value::Text(a.to_string()));
    }
    if let Some(d) = &patch.description {
        sets.push("description=?");
        values.push(Value::Text(d.trim().to_string()));
    }
    if let Some(c) = patch.category_id {
        sets.push("category_id=?");
        values.push(Value::Integer(c));
    }
    if let Some(s) = patch.subcategory_id {
        sets.push("subcategory_id=?");
        values.push(Value::Integer(s));
    }
    if let Some(b) = patch.bank_id {
        sets.push("bank_id=?");
        values.push(Value::Integer(b));
    }
    if let Some(m) = patch.payment_method {
        sets.push("payment_method=?");
        values.push(Value::Text(m.as_str().to_string()));
    }
    if let Some(c) = patch.credit_card_id {
        sets.push("credit_card_id=?");
        values.push(Value::Integer(c));
    } else if patch.clears_card() {
        sets.push("credit_card_id=NULL");
    }
    let sql = format!(
        "UPDATE transactions SET {} WHERE user_id=? AND kind=? AND id IN ({})",
        sets.join(", "),
        placeholders(ids.len())
    );
    values.extend(scope_values(ctx, kind));
    values.extend(ids.iter().map(|id| Value::Integer(*id)));
    let n = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    debug!(updated = n, "applied patch");
    Ok(n)
}

fn delete_in(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    ids: &[i64],
) -> Result<usize> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(0);
    }
    fetch_ids(conn, ctx, kind, &ids)?;
    let sql = format!(
        "DELETE FROM transactions WHERE user_id=? AND kind=? AND id IN ({})",
        placeholders(ids.len())
    );
    let mut values = scope_values(ctx, kind);
    values.extend(ids.iter().map(|id| Value::Integer(*id)));
    let n = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    debug!(deleted = n, "deleted records");
    Ok(n)
}

/// Applies `patch` to every id. Fails with `NotFound` and writes nothing
/// when any id is unknown.
pub fn update_transaction_set(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    ids: &[i64],
    patch: &TransactionPatch,
) -> Result<usize> {
    patch.validate(kind)?;
    let tx = conn.transaction()?;
    let n = update_in(&tx, ctx, kind, ids, patch)?;
    tx.commit()?;
    Ok(n)
}

/// Deletes every id, returning the count. Fails with `NotFound` and deletes
/// nothing when any id is unknown.
pub fn delete_transaction_set(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    ids: &[i64],
) -> Result<usize> {
    let tx = conn.transaction()?;
    let n = delete_in(&tx, ctx, kind, ids)?;
    tx.commit()?;
    Ok(n)
}

fn plan_for(
    conn: &Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    target_id: i64,
    scope: Scope,
) -> Result<MutationPlan> {
    let target = get_transaction(conn, ctx, kind, target_id)?;
    let records = match target.series_key() {
        Some(key) => series_members(conn, ctx, kind, &key)?,
        None => vec![target],
    };
    Ok(plan_mutation(&records, target_id, scope)?)
}

/// Edits the occurrences `scope` selects around `target_id`. Each record
/// keeps its own date and installment position.
pub fn edit_scoped(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    target_id: i64,
    scope: Scope,
    patch: &TransactionPatch,
) -> Result<MutationPlan> {
    patch.validate(kind)?;
    let tx = conn.transaction()?;
    let plan = plan_for(&tx, ctx, kind, target_id, scope)?;
    update_in(&tx, ctx, kind, &plan.affected, patch)?;
    tx.commit()?;
    info!(target = target_id, scope = %scope, updated = plan.affected.len(), "edited series");
    Ok(plan)
}

/// Deletes the occurrences `scope` selects around `target_id`. A recurring
/// remainder gets boundaries matching what is left.
pub fn delete_scoped(
    conn: &mut Connection,
    ctx: &UserContext,
    kind: TransactionKind,
    target_id: i64,
    scope: Scope,
) -> Result<MutationPlan> {
    let tx = conn.transaction()?;
    let plan = plan_for(&tx, ctx, kind, target_id, scope)?;
    delete_in(&tx, ctx, kind, &plan.affected)?;
    if let Some(bounds) = plan.retained_bounds {
        let sql = format!(
            "UPDATE transactions SET start_date=?, end_date=? WHERE user_id=? AND kind=? AND id IN ({})",
            placeholders(plan.retained.len())
        );
        let mut values = vec![
            Value::Text(bounds.start_date.to_string()),
            Value::Text(bounds.end_date.to_string()),
        ];
        values.extend(scope_values(ctx, kind));
        values.extend(plan.retained.iter().map(|id| Value::Integer(*id)));
        tx.execute(&sql, rusqlite::params_from_iter(values))?;
    }
    if let (true, Some(SeriesKey::Recurring(group))) = (plan.destroys_series, &plan.key) {
        tx.execute(
            "DELETE FROM recurring_series WHERE group_id=?1 AND user_id=?2",
            params![group, ctx.user_id],
        )?;
    }
    tx.commit()?;
    info!(
        target = target_id,
        scope = %scope,
        deleted = plan.affected.len(),
        destroyed = plan.destroys_series,
        "deleted from series"
    );
    Ok(plan)
}
