// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{
    DEFAULT_HORIZON_MONTHS, HORIZON_KEY, KNOWN_SETTINGS, arg, get_setting, pretty_table,
    set_setting,
};
use anyhow::{Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let mut rows = Vec::new();
            for key in KNOWN_SETTINGS {
                let value = match get_setting(conn, key)? {
                    Some(v) => v,
                    None if *key == HORIZON_KEY => format!("{} (default)", DEFAULT_HORIZON_MONTHS),
                    None => String::new(),
                };
                rows.push(vec![key.to_string(), value]);
            }
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        Some(("set", sub)) => {
            let key = arg(sub, "key")?;
            let value = arg(sub, "value")?;
            set(conn, key, value)?;
            println!("Set {} = {}", key, value);
        }
        _ => {}
    }
    Ok(())
}

/// Stores a known setting after checking its value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    if !KNOWN_SETTINGS.contains(&key) {
        bail!("Unknown setting '{}' (known: {})", key, KNOWN_SETTINGS.join(", "));
    }
    if key == HORIZON_KEY && !matches!(value.parse::<u32>(), Ok(n) if n > 0) {
        bail!("{} must be a positive whole number of months", HORIZON_KEY);
    }
    set_setting(conn, key, value)
}
