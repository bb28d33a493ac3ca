// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Bank, CreditCard};
use crate::utils::{arg, id_for_bank, maybe_print_json, opt_arg, pretty_table};
use anyhow::{Result, bail};
use rusqlite::{Connection, params};

pub fn handle_banks(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg(sub, "name")?;
            conn.execute("INSERT INTO banks(name) VALUES (?1)", params![name])?;
            println!("Added bank '{}'", name);
        }
        Some(("list", sub)) => {
            let banks = list_banks(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &banks)? {
                let data = banks
                    .iter()
                    .map(|b| vec![b.id.to_string(), b.name.clone()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Bank"], data));
            }
        }
        Some(("rm", sub)) => {
            let name = arg(sub, "name")?;
            if conn.execute("DELETE FROM banks WHERE name=?1", params![name])? == 0 {
                bail!("Bank '{}' not found", name);
            }
            println!("Removed bank '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_cards(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg(sub, "name")?;
            let bank_id = opt_arg(sub, "bank")
                .map(|b| id_for_bank(conn, b))
                .transpose()?;
            conn.execute(
                "INSERT INTO credit_cards(name, bank_id) VALUES (?1, ?2)",
                params![name, bank_id],
            )?;
            println!("Added credit card '{}'", name);
        }
        Some(("list", sub)) => {
            let cards = list_cards(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cards)? {
                let banks = list_banks(conn)?;
                let data = cards
                    .iter()
                    .map(|c| {
                        let bank = c
                            .bank_id
                            .and_then(|id| banks.iter().find(|b| b.id == id))
                            .map(|b| b.name.clone())
                            .unwrap_or_default();
                        vec![c.id.to_string(), c.name.clone(), bank]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Card", "Bank"], data));
            }
        }
        Some(("rm", sub)) => {
            let name = arg(sub, "name")?;
            if conn.execute("DELETE FROM credit_cards WHERE name=?1", params![name])? == 0 {
                bail!("Credit card '{}' not found", name);
            }
            println!("Removed credit card '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

pub fn list_banks(conn: &Connection) -> Result<Vec<Bank>> {
    let mut stmt = conn.prepare("SELECT id, name FROM banks ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(Bank {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_cards(conn: &Connection) -> Result<Vec<CreditCard>> {
    let mut stmt = conn.prepare("SELECT id, name, bank_id FROM credit_cards ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(CreditCard {
            id: r.get(0)?,
            name: r.get(1)?,
            bank_id: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
