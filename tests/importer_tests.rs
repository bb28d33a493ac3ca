// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use spendwise::commands::importer::{self, parse_envelope};
use spendwise::error::SeriesError;
use spendwise::models::{
    ENVELOPE_VERSION, NewTransaction, TransactionEnvelope, TransactionFilter, TransactionKind,
    UserContext,
};
use spendwise::{cli, db, store};
use std::io::Write;
use tempfile::NamedTempFile;

fn base_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO categories(id,name) VALUES (1,'Salary')", [])
        .unwrap();
    conn
}

fn salary() -> NewTransaction {
    NewTransaction {
        kind: TransactionKind::Income,
        amount: "5000".parse().unwrap(),
        description: "Salary".into(),
        date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        category_id: 1,
        subcategory_id: None,
        bank_id: None,
        payment_method: None,
        credit_card_id: None,
    }
}

fn record(id: i64, date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "kind": "expense",
        "amount": "300.00",
        "description": "Sofa",
        "occurrence_date": date,
        "category_id": 1,
        "has_installments": true,
        "installment_group_id": "g-sofa",
        "current_installment": id,
        "total_installments": 2
    })
}

fn malformed(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SeriesError>(),
        Some(SeriesError::MalformedSeries(_))
    )
}

#[test]
fn import_round_trip_remaps_group_ids() {
    let mut conn = base_conn();
    let alice = UserContext::new(1);
    let bob = UserContext::new(2);
    let created = store::create_recurring_series(
        &mut conn,
        &alice,
        &salary(),
        Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
    )
    .unwrap();
    let envelope = TransactionEnvelope {
        version: ENVELOPE_VERSION,
        kind: TransactionKind::Income,
        transactions: created.clone(),
    };

    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", serde_json::to_string(&envelope).unwrap()).unwrap();
    let padded = format!("  {}  ", tmp.path().display());

    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "spendwise",
        "--user",
        "2",
        "import",
        "transactions",
        "--path",
        padded.as_str(),
    ]);
    if let Some(("import", import_m)) = matches.subcommand() {
        importer::handle(&mut conn, &bob, import_m).unwrap();
    } else {
        panic!("no import subcommand");
    }

    let imported = store::list_transactions(
        &conn,
        &bob,
        TransactionKind::Income,
        &TransactionFilter::default(),
    )
    .unwrap();
    assert_eq!(imported.len(), 3);
    let group = imported[0].recurring_group_id.clone().unwrap();
    assert_ne!(Some(group.clone()), created[0].recurring_group_id);
    assert!(
        imported
            .iter()
            .all(|t| t.recurring_group_id.as_deref() == Some(group.as_str()))
    );
    assert!(imported.iter().all(|t| t.start_date == created[0].start_date));

    let view = store::list_series(&conn, &bob, TransactionKind::Income).unwrap();
    assert_eq!(view.series.len(), 1);
    assert_eq!(view.series[0].occurrence_count, 3);
}

#[test]
fn rejects_unknown_version() {
    let doc = json!({"version": 2, "kind": "expense", "transactions": []});
    let err = parse_envelope(&doc.to_string()).unwrap_err();
    assert!(malformed(&err));
}

#[test]
fn rejects_unknown_fields() {
    let mut rec = record(1, "2024-01-10");
    rec["currency"] = json!("BRL");
    let doc = json!({"version": 1, "kind": "expense", "transactions": [rec]});
    let err = parse_envelope(&doc.to_string()).unwrap_err();
    assert!(malformed(&err));

    let doc = json!({"version": 1, "kind": "expense", "transactions": [], "extra": true});
    assert!(malformed(&parse_envelope(&doc.to_string()).unwrap_err()));
}

#[test]
fn rejects_kind_mismatch() {
    let doc = json!({
        "version": 1,
        "kind": "income",
        "transactions": [record(1, "2024-01-10")]
    });
    assert!(malformed(&parse_envelope(&doc.to_string()).unwrap_err()));
}

#[test]
fn rejects_inconsistent_installments() {
    let mut second = record(2, "2024-02-10");
    second["current_installment"] = json!(1);
    let doc = json!({
        "version": 1,
        "kind": "expense",
        "transactions": [record(1, "2024-01-10"), second]
    });
    assert!(malformed(&parse_envelope(&doc.to_string()).unwrap_err()));
}

#[test]
fn accepts_consistent_installments() {
    let doc = json!({
        "version": 1,
        "kind": "expense",
        "transactions": [record(1, "2024-01-10"), record(2, "2024-02-10")]
    });
    let envelope = parse_envelope(&doc.to_string()).unwrap();
    assert_eq!(envelope.transactions.len(), 2);
    assert_eq!(envelope.transactions[1].current_installment, Some(2));
}

#[test]
fn failed_import_writes_nothing() {
    let mut conn = base_conn();
    let ctx = UserContext::new(1);
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{{\"version\": 1, \"kind\": \"expense\"").unwrap();
    let path = tmp.path().to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "spendwise",
        "import",
        "transactions",
        "--path",
        path.as_str(),
    ]);
    let Some(("import", import_m)) = matches.subcommand() else {
        panic!("no import subcommand");
    };
    let err = importer::handle(&mut conn, &ctx, import_m).unwrap_err();
    assert!(malformed(&err));
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn rejects_income_installments() {
    let mut rec = record(1, "2024-01-10");
    rec["kind"] = json!("income");
    rec["total_installments"] = json!(1);
    let doc = json!({"version": 1, "kind": "income", "transactions": [rec]});
    assert!(malformed(&parse_envelope(&doc.to_string()).unwrap_err()));
}
