// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Spendwise", "spendwise"));

/// Overrides the platform data directory when set.
pub const DB_ENV: &str = "SPENDWISE_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("spendwise.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- a category with a parent is a subcategory
    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        parent_id INTEGER,
        UNIQUE(name, parent_id),
        FOREIGN KEY(parent_id) REFERENCES categories(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS banks(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS credit_cards(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        bank_id INTEGER,
        FOREIGN KEY(bank_id) REFERENCES banks(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('expense','income')),
        amount TEXT NOT NULL,
        description TEXT NOT NULL,
        occurrence_date TEXT NOT NULL,
        category_id INTEGER NOT NULL,
        subcategory_id INTEGER,
        bank_id INTEGER,
        payment_method TEXT,
        credit_card_id INTEGER,
        is_recurring INTEGER NOT NULL DEFAULT 0,
        has_installments INTEGER NOT NULL DEFAULT 0,
        recurring_group_id TEXT,
        installment_group_id TEXT,
        current_installment INTEGER,
        total_installments INTEGER,
        start_date TEXT,
        end_date TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK(recurring_group_id IS NULL OR installment_group_id IS NULL),
        FOREIGN KEY(category_id) REFERENCES categories(id),
        FOREIGN KEY(subcategory_id) REFERENCES categories(id) ON DELETE SET NULL,
        FOREIGN KEY(bank_id) REFERENCES banks(id) ON DELETE SET NULL,
        FOREIGN KEY(credit_card_id) REFERENCES credit_cards(id) ON DELETE SET NULL
    );
    -- last date ever written for a recurring series, so deleted
    -- occurrences are not regenerated by extend
    CREATE TABLE IF NOT EXISTS recurring_series(
        group_id TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL,
        generated_until TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(occurrence_date);
    CREATE INDEX IF NOT EXISTS idx_transactions_recurring ON transactions(recurring_group_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_installment ON transactions(installment_group_id);
    "#,
    )?;
    Ok(())
}
