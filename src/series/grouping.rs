// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Series identity: which records form a series and which record stands
//! for it in summaries.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{SeriesError, SeriesResult};
use crate::models::{SeriesKey, Transaction};

/// One row per series: the earliest occurrence plus the span of the group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub key: SeriesKey,
    pub representative: Transaction,
    pub occurrence_count: usize,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesView {
    /// Records that belong to no series, in input order.
    pub singles: Vec<Transaction>,
    pub series: Vec<SeriesSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesIssue {
    pub key: Option<SeriesKey>,
    pub record_id: Option<i64>,
    pub message: String,
}

impl fmt::Display for SeriesIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key, self.record_id) {
            (Some(k), Some(id)) => write!(f, "{} (record {}): {}", k, id, self.message),
            (Some(k), None) => write!(f, "{}: {}", k, self.message),
            (None, Some(id)) => write!(f, "record {}: {}", id, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

pub type SeriesGroups = BTreeMap<SeriesKey, Vec<Transaction>>;

/// Splits records into plain records and series groups without validating
/// anything. Group members are ordered by date, then id.
pub fn partition_series(records: &[Transaction]) -> (Vec<Transaction>, SeriesGroups) {
    let mut singles = Vec::new();
    let mut groups: SeriesGroups = BTreeMap::new();
    for record in records {
        if !(record.is_recurring || record.has_installments) {
            singles.push(record.clone());
            continue;
        }
        // Flagged records always have a key; Orphan covers a missing group id.
        let key = record
            .series_key()
            .unwrap_or(SeriesKey::Orphan(record.id));
        groups.entry(key).or_default().push(record.clone());
    }
    for members in groups.values_mut() {
        members.sort_by(|a, b| {
            a.occurrence_date
                .cmp(&b.occurrence_date)
                .then(a.id.cmp(&b.id))
        });
    }
    (singles, groups)
}

pub fn summarize(groups: &SeriesGroups) -> Vec<SeriesSummary> {
    let mut out: Vec<SeriesSummary> = groups
        .iter()
        .filter_map(|(key, members)| {
            let first = members.first()?;
            let last = members.last()?;
            Some(SeriesSummary {
                key: key.clone(),
                representative: first.clone(),
                occurrence_count: members.len(),
                earliest_date: first.occurrence_date,
                latest_date: last.occurrence_date,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        a.earliest_date
            .cmp(&b.earliest_date)
            .then_with(|| a.key.cmp(&b.key))
    });
    out
}

/// Groups `records` into series and selects each series' representative.
///
/// Fails with `MalformedSeries` on the first inconsistent series instead of
/// dropping data; callers that prefer to degrade to per-record display can
/// use [`partition_series`] and [`check_series`] directly.
pub fn group_and_select_representatives(records: &[Transaction]) -> SeriesResult<SeriesView> {
    if let Some(issue) = check_series(records).into_iter().next() {
        return Err(SeriesError::MalformedSeries(issue.to_string()));
    }
    let (singles, groups) = partition_series(records);
    Ok(SeriesView {
        singles,
        series: summarize(&groups),
    })
}

/// Every invariant violation found in `records`, in a stable order.
pub fn check_series(records: &[Transaction]) -> Vec<SeriesIssue> {
    let mut issues = Vec::new();
    for r in records {
        check_record(r, &mut issues);
    }
    let (_, groups) = partition_series(records);
    for (key, members) in &groups {
        match key {
            SeriesKey::Installment(_) => check_installments(key, members, &mut issues),
            SeriesKey::Recurring(_) => check_recurring(key, members, &mut issues),
            SeriesKey::Orphan(_) => {}
        }
    }
    issues
}

fn check_record(r: &Transaction, issues: &mut Vec<SeriesIssue>) {
    let mut push = |message: &str| {
        issues.push(SeriesIssue {
            key: r.series_key(),
            record_id: Some(r.id),
            message: message.to_string(),
        })
    };
    if r.recurring_group_id.is_some() && r.installment_group_id.is_some() {
        push("record has both a recurring and an installment group id");
    }
    if r.is_recurring && r.has_installments {
        push("record is flagged both recurring and installment");
    }
    if r.recurring_group_id.is_some() && !r.is_recurring {
        push("recurring group id set on a record not flagged recurring");
    }
    if r.installment_group_id.is_some() && !r.has_installments {
        push("installment group id set on a record not flagged as installment");
    }
}

fn check_installments(key: &SeriesKey, members: &[Transaction], issues: &mut Vec<SeriesIssue>) {
    let mut push = |record_id: Option<i64>, message: String| {
        issues.push(SeriesIssue {
            key: Some(key.clone()),
            record_id,
            message,
        })
    };
    let totals: HashSet<Option<u32>> = members.iter().map(|m| m.total_installments).collect();
    if totals.len() > 1 {
        push(None, "members disagree on total_installments".into());
    }
    let mut seen = HashSet::new();
    let mut previous: Option<u32> = None;
    for m in members {
        let (Some(current), Some(total)) = (m.current_installment, m.total_installments) else {
            push(Some(m.id), "installment position or total missing".into());
            continue;
        };
        if current == 0 || current > total {
            push(
                Some(m.id),
                format!("installment {} outside 1..={}", current, total),
            );
        }
        if !seen.insert(current) {
            push(Some(m.id), format!("duplicate installment {}", current));
        } else if let Some(p) = previous.filter(|p| current <= *p) {
            push(
                Some(m.id),
                format!("installment {} comes after installment {} in date order", current, p),
            );
        }
        previous = Some(current);
    }
    if let Some(Some(total)) = totals.iter().next() {
        if totals.len() == 1 && members.len() > *total as usize {
            push(
                None,
                format!("{} members for a {}-installment series", members.len(), total),
            );
        }
    }
}

fn check_recurring(key: &SeriesKey, members: &[Transaction], issues: &mut Vec<SeriesIssue>) {
    for m in members {
        if let (Some(start), Some(end)) = (m.start_date, m.end_date) {
            if start > end {
                issues.push(SeriesIssue {
                    key: Some(key.clone()),
                    record_id: Some(m.id),
                    message: format!("start date {} is after end date {}", start, end),
                });
            }
        }
    }
}
