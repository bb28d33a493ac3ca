// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Category;
use crate::utils::{arg, id_for_category, maybe_print_json, opt_arg, pretty_table};
use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg(sub, "name")?;
            let parent_id = opt_arg(sub, "parent")
                .map(|p| id_for_category(conn, p))
                .transpose()?;
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM categories WHERE name=?1 AND parent_id IS ?2",
                    params![name, parent_id],
                    |r| r.get(0),
                )
                .optional()?;
            if exists.is_some() {
                bail!("Category '{}' already exists", name);
            }
            conn.execute(
                "INSERT INTO categories(name, parent_id) VALUES (?1, ?2)",
                params![name, parent_id],
            )?;
            match opt_arg(sub, "parent") {
                Some(p) => println!("Added subcategory '{}' under '{}'", name, p),
                None => println!("Added category '{}'", name),
            }
        }
        Some(("list", sub)) => {
            let cats = list_categories(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .iter()
                    .map(|c| {
                        let parent = c
                            .parent_id
                            .and_then(|p| cats.iter().find(|x| x.id == p))
                            .map(|x| x.name.clone())
                            .unwrap_or_default();
                        vec![c.id.to_string(), c.name.clone(), parent]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Category", "Parent"], data));
            }
        }
        Some(("rm", sub)) => {
            let name = arg(sub, "name")?;
            let parent_id = opt_arg(sub, "parent")
                .map(|p| id_for_category(conn, p))
                .transpose()?;
            let n = conn.execute(
                "DELETE FROM categories WHERE name=?1 AND parent_id IS ?2",
                params![name, parent_id],
            )?;
            if n == 0 {
                bail!("Category '{}' not found", name);
            }
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

/// Top-level categories first, each followed by its subcategories.
pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.parent_id FROM categories c
         LEFT JOIN categories p ON c.parent_id=p.id
         ORDER BY COALESCE(p.name, c.name), c.parent_id IS NOT NULL, c.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            parent_id: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
