// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{SeriesError, SeriesResult};
use crate::models::{SeriesKey, Transaction};

/// How far an edit or delete reaches across a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Single,
    All,
    /// The target and every later occurrence.
    Future,
    /// The target and every earlier occurrence.
    Past,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Single => "single",
            Scope::All => "all",
            Scope::Future => "future",
            Scope::Past => "past",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = SeriesError;

    fn from_str(s: &str) -> SeriesResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" | "this" => Ok(Scope::Single),
            "all" => Ok(Scope::All),
            "future" => Ok(Scope::Future),
            "past" => Ok(Scope::Past),
            other => Err(SeriesError::InvalidScope(format!(
                "unknown scope '{}' (use single|all|future|past)",
                other
            ))),
        }
    }
}

/// Boundaries a recurring remainder should carry after a `future` or `past`
/// delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetainedBounds {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationPlan {
    pub target_id: i64,
    pub scope: Scope,
    /// `None` when the target is a plain record.
    pub key: Option<SeriesKey>,
    /// Affected ids ordered by occurrence date, then id.
    pub affected: Vec<i64>,
    /// Ids of the series members left untouched.
    pub retained: Vec<i64>,
    /// True when deleting `affected` leaves no row with the group id.
    pub destroys_series: bool,
    pub retained_bounds: Option<RetainedBounds>,
}

/// Selects the records a scoped mutation of `target_id` touches.
///
/// The group and the reference date both come from the target record;
/// records of other groups are never selected.
pub fn plan_mutation(
    records: &[Transaction],
    target_id: i64,
    scope: Scope,
) -> SeriesResult<MutationPlan> {
    let target = records
        .iter()
        .find(|r| r.id == target_id)
        .ok_or(SeriesError::NotFound(target_id))?;
    let key = target.series_key();

    // Only a group id can widen a scope; an orphan flag alone cannot.
    let group_key = match &key {
        Some(k @ (SeriesKey::Recurring(_) | SeriesKey::Installment(_))) => k.clone(),
        _ if scope != Scope::Single => {
            return Err(SeriesError::InvalidScope(format!(
                "record {} has no group id; scope '{}' needs one",
                target_id, scope
            )));
        }
        _ => {
            return Ok(MutationPlan {
                target_id,
                scope,
                key: key.clone(),
                destroys_series: key.is_some(),
                affected: vec![target_id],
                retained: Vec::new(),
                retained_bounds: None,
            });
        }
    };

    let mut members: Vec<&Transaction> =
        records.iter().filter(|r| r.belongs_to(&group_key)).collect();
    members.sort_by(|a, b| {
        a.occurrence_date
            .cmp(&b.occurrence_date)
            .then(a.id.cmp(&b.id))
    });

    let pivot = target.occurrence_date;
    let selected = |r: &Transaction| match scope {
        Scope::Single => r.id == target_id,
        Scope::All => true,
        Scope::Future => r.occurrence_date >= pivot,
        Scope::Past => r.occurrence_date <= pivot,
    };
    let (affected, retained): (Vec<&Transaction>, Vec<&Transaction>) =
        members.iter().copied().partition(|r| selected(r));

    let retained_bounds = match (&group_key, scope) {
        (SeriesKey::Recurring(_), Scope::Future | Scope::Past) => {
            bounds_after(target, &retained, scope)
        }
        _ => None,
    };

    let plan = MutationPlan {
        target_id,
        scope,
        key,
        affected: affected.iter().map(|r| r.id).collect(),
        retained: retained.iter().map(|r| r.id).collect(),
        destroys_series: retained.is_empty(),
        retained_bounds,
    };
    debug!(
        target = target_id,
        scope = %scope,
        affected = plan.affected.len(),
        retained = plan.retained.len(),
        "planned series mutation"
    );
    Ok(plan)
}

fn bounds_after(
    target: &Transaction,
    retained: &[&Transaction],
    scope: Scope,
) -> Option<RetainedBounds> {
    let first = retained.first()?;
    let last = retained.last()?;
    let start = target.start_date.unwrap_or(first.occurrence_date);
    let end = target.end_date.unwrap_or(last.occurrence_date);
    match scope {
        Scope::Future => Some(RetainedBounds {
            start_date: start,
            end_date: last.occurrence_date,
        }),
        Scope::Past => Some(RetainedBounds {
            start_date: first.occurrence_date,
            end_date: end,
        }),
        Scope::Single | Scope::All => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(id: i64, group: Option<&str>, date: NaiveDate) -> Transaction {
        Transaction {
            id,
            kind: TransactionKind::Income,
            amount: Decimal::new(250000, 2),
            description: "salary".into(),
            occurrence_date: date,
            category_id: 2,
            subcategory_id: None,
            bank_id: Some(1),
            payment_method: None,
            credit_card_id: None,
            is_recurring: group.is_some(),
            has_installments: false,
            recurring_group_id: group.map(String::from),
            installment_group_id: None,
            current_installment: None,
            total_installments: None,
            start_date: group.map(|_| d(2024, 1, 5)),
            end_date: group.map(|_| d(2024, 6, 5)),
        }
    }

    fn six_months() -> Vec<Transaction> {
        (1..=6)
            .map(|m| rec(m as i64, Some("pay"), d(2024, m, 5)))
            .collect()
    }

    #[test]
    fn future_and_past_meet_at_target() {
        let records = six_months();
        let future = plan_mutation(&records, 3, Scope::Future).unwrap();
        let past = plan_mutation(&records, 3, Scope::Past).unwrap();
        assert_eq!(future.affected, vec![3, 4, 5, 6]);
        assert_eq!(past.affected, vec![1, 2, 3]);

        let f: HashSet<_> = future.affected.iter().copied().collect();
        let p: HashSet<_> = past.affected.iter().copied().collect();
        assert_eq!(f.union(&p).count(), 6);
        assert_eq!(f.intersection(&p).copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn all_selects_exactly_the_group() {
        let mut records = six_months();
        records.push(rec(40, Some("other"), d(2024, 2, 5)));
        records.push(rec(41, None, d(2024, 2, 5)));
        let plan = plan_mutation(&records, 2, Scope::All).unwrap();
        assert_eq!(plan.affected, vec![1, 2, 3, 4, 5, 6]);
        assert!(plan.destroys_series);
        assert!(plan.retained.is_empty());
    }

    #[test]
    fn never_crosses_into_another_group() {
        let mut records = six_months();
        records.extend((1..=3).map(|m| rec(100 + m as i64, Some("rent"), d(2024, m, 5))));
        for scope in [Scope::Single, Scope::All, Scope::Future, Scope::Past] {
            let plan = plan_mutation(&records, 2, scope).unwrap();
            assert!(plan.affected.iter().all(|id| *id < 100), "{:?}", scope);
        }
    }

    #[test]
    fn single_touches_only_target() {
        let plan = plan_mutation(&six_months(), 4, Scope::Single).unwrap();
        assert_eq!(plan.affected, vec![4]);
        assert_eq!(plan.retained.len(), 5);
        assert!(!plan.destroys_series);
        assert_eq!(plan.retained_bounds, None);
    }

    #[test]
    fn future_truncates_recurring_end() {
        let plan = plan_mutation(&six_months(), 4, Scope::Future).unwrap();
        assert_eq!(
            plan.retained_bounds,
            Some(RetainedBounds {
                start_date: d(2024, 1, 5),
                end_date: d(2024, 3, 5),
            })
        );
    }

    #[test]
    fn past_moves_recurring_start() {
        let plan = plan_mutation(&six_months(), 2, Scope::Past).unwrap();
        assert_eq!(
            plan.retained_bounds,
            Some(RetainedBounds {
                start_date: d(2024, 3, 5),
                end_date: d(2024, 6, 5),
            })
        );
    }

    #[test]
    fn unknown_target_is_not_found() {
        assert_eq!(
            plan_mutation(&six_months(), 99, Scope::All),
            Err(SeriesError::NotFound(99))
        );
    }

    #[test]
    fn plain_record_only_allows_single() {
        let records = vec![rec(1, None, d(2024, 1, 1))];
        assert!(plan_mutation(&records, 1, Scope::Single).is_ok());
        for scope in [Scope::All, Scope::Future, Scope::Past] {
            assert!(matches!(
                plan_mutation(&records, 1, scope),
                Err(SeriesError::InvalidScope(_))
            ));
        }
    }

    #[test]
    fn flagged_record_without_group_only_allows_single() {
        let mut orphan = rec(5, None, d(2024, 3, 5));
        orphan.is_recurring = true;
        let records = vec![orphan];
        let plan = plan_mutation(&records, 5, Scope::Single).unwrap();
        assert_eq!(plan.affected, vec![5]);
        assert_eq!(plan.key, Some(SeriesKey::Orphan(5)));
        for scope in [Scope::All, Scope::Future, Scope::Past] {
            assert!(matches!(
                plan_mutation(&records, 5, scope),
                Err(SeriesError::InvalidScope(_))
            ));
        }
    }

    #[test]
    fn parses_scope_names() {
        assert_eq!("Future".parse::<Scope>().unwrap(), Scope::Future);
        assert_eq!(" all ".parse::<Scope>().unwrap(), Scope::All);
        assert!("sometimes".parse::<Scope>().is_err());
    }
}
