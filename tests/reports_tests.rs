// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use spendwise::commands::reports::{category_totals, monthly_totals};
use spendwise::models::{NewTransaction, TransactionKind, UserContext};
use spendwise::{db, store};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(
        "INSERT INTO categories(id,name) VALUES (1,'Shopping'),(2,'Food'),(3,'Salary');",
    )
    .unwrap();
    conn
}

fn new(kind: TransactionKind, category_id: i64, amount: &str, date: (i32, u32, u32)) -> NewTransaction {
    NewTransaction {
        kind,
        amount: amount.parse().unwrap(),
        description: "entry".into(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        category_id,
        subcategory_id: None,
        bank_id: None,
        payment_method: None,
        credit_card_id: None,
    }
}

#[test]
fn monthly_totals_count_each_installment_in_its_month() {
    let mut conn = setup();
    let ctx = UserContext::new(1);
    store::create_installment_series(
        &mut conn,
        &ctx,
        &new(TransactionKind::Expense, 1, "100", (2024, 1, 20)),
        3,
    )
    .unwrap();
    store::create_recurring_series(
        &mut conn,
        &ctx,
        &new(TransactionKind::Income, 3, "1000", (2024, 1, 5)),
        Some(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()),
    )
    .unwrap();
    store::insert_single(&conn, &ctx, &new(TransactionKind::Expense, 2, "12.5", (2023, 12, 31)))
        .unwrap();

    let totals = monthly_totals(&conn, &ctx, 2024).unwrap();
    let months: Vec<_> = totals.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
    assert_eq!(totals[0].income, Decimal::new(1000, 0));
    assert_eq!(totals[0].expense, Decimal::new(100, 0));
    assert_eq!(totals[0].net, Decimal::new(900, 0));
    assert_eq!(totals[2].income, Decimal::ZERO);
    assert_eq!(totals[2].net, Decimal::new(-100, 0));
}

#[test]
fn category_totals_sort_largest_first() {
    let conn = setup();
    let ctx = UserContext::new(1);
    for (cat, amount) in [(2, "30"), (1, "200"), (2, "45")] {
        store::insert_single(&conn, &ctx, &new(TransactionKind::Expense, cat, amount, (2024, 5, 3)))
            .unwrap();
    }
    store::insert_single(&conn, &ctx, &new(TransactionKind::Expense, 2, "999", (2024, 6, 1)))
        .unwrap();

    let totals = category_totals(&conn, &ctx, "2024-05").unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].category, "Shopping");
    assert_eq!(totals[0].total, Decimal::new(200, 0));
    assert_eq!(totals[1].category, "Food");
    assert_eq!(totals[1].total, Decimal::new(75, 0));
}

#[test]
fn reports_only_see_the_callers_records() {
    let conn = setup();
    store::insert_single(
        &conn,
        &UserContext::new(2),
        &new(TransactionKind::Expense, 1, "50", (2024, 5, 3)),
    )
    .unwrap();
    let ctx = UserContext::new(1);
    assert!(monthly_totals(&conn, &ctx, 2024).unwrap().is_empty());
    assert!(category_totals(&conn, &ctx, "2024-05").unwrap().is_empty());
}
