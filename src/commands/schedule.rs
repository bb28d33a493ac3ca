// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::OPEN_END;
use crate::series::{SeriesDefinition, generate_occurrences};
use crate::utils::{arg, maybe_print_json, opt_arg, parse_date, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;

/// Dates a monthly series would produce, at most `limit` of them. With
/// neither `count` nor `until` the series is open-ended.
pub fn preview(
    start: NaiveDate,
    count: Option<u32>,
    until: Option<NaiveDate>,
    limit: usize,
) -> Result<Vec<NaiveDate>> {
    let def = match (count, until) {
        (Some(n), _) => SeriesDefinition::monthly_count(start, n)?,
        (None, Some(end)) => SeriesDefinition::monthly_until(start, end)?,
        (None, None) => SeriesDefinition::monthly_until(start, *OPEN_END)?,
    };
    Ok(generate_occurrences(&def).take(limit).collect())
}

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(arg(m, "start")?)?;
    let count = m.get_one::<u32>("count").copied();
    let until = opt_arg(m, "until").map(parse_date).transpose()?;
    let limit = m.get_one::<usize>("limit").copied().unwrap_or(120);

    let dates: Vec<String> = preview(start, count, until, limit)?
        .iter()
        .map(|d| d.to_string())
        .collect();
    if !maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &dates)? {
        let rows = dates
            .iter()
            .enumerate()
            .map(|(i, d)| vec![(i + 1).to_string(), d.clone()])
            .collect();
        println!("{}", pretty_table(&["#", "Date"], rows));
    }
    Ok(())
}
