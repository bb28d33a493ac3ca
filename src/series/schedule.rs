// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Occurrence dates for a series definition.
//!
//! Dates are `NaiveDate` end to end, so there is no time-of-day or zone to
//! shift a day across a boundary.

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::error::{SeriesError, SeriesResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesBound {
    /// Last admissible date, inclusive.
    Until(NaiveDate),
    /// Exact number of occurrences.
    Count(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesDefinition {
    start_date: NaiveDate,
    cadence: Cadence,
    bound: SeriesBound,
}

impl SeriesDefinition {
    pub fn new(start_date: NaiveDate, cadence: Cadence, bound: SeriesBound) -> SeriesResult<Self> {
        match bound {
            SeriesBound::Count(0) => Err(SeriesError::MalformedSeries(
                "an installment series needs at least one installment".into(),
            )),
            SeriesBound::Until(end) if end < start_date => Err(SeriesError::MalformedSeries(
                format!("start date {} is after end date {}", start_date, end),
            )),
            _ => Ok(Self {
                start_date,
                cadence,
                bound,
            }),
        }
    }

    pub fn monthly_until(start_date: NaiveDate, end_date: NaiveDate) -> SeriesResult<Self> {
        Self::new(start_date, Cadence::Monthly, SeriesBound::Until(end_date))
    }

    pub fn monthly_count(start_date: NaiveDate, count: u32) -> SeriesResult<Self> {
        Self::new(start_date, Cadence::Monthly, SeriesBound::Count(count))
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn bound(&self) -> SeriesBound {
        self.bound
    }

    /// Date of the occurrence at zero-based `index`, ignoring the bound.
    pub fn nth_date(&self, index: u32) -> Option<NaiveDate> {
        match self.cadence {
            // checked_add_months clamps to the last day of shorter months.
            // Stepping from the anchor rather than the previous date keeps
            // the 31st on the 31st after passing through February.
            Cadence::Monthly => self.start_date.checked_add_months(Months::new(index)),
        }
    }
}

/// Lazy, finite sequence of occurrence dates. Cloning restarts from the
/// current position, so a fresh call to `generate_occurrences` always
/// yields the same dates.
#[derive(Debug, Clone)]
pub struct Occurrences {
    definition: SeriesDefinition,
    index: u32,
    done: bool,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.done {
            return None;
        }
        if let SeriesBound::Count(n) = self.definition.bound {
            if self.index >= n {
                self.done = true;
                return None;
            }
        }
        let Some(date) = self.definition.nth_date(self.index) else {
            self.done = true;
            return None;
        };
        if let SeriesBound::Until(end) = self.definition.bound {
            if date > end {
                self.done = true;
                return None;
            }
        }
        self.index += 1;
        Some(date)
    }
}

pub fn generate_occurrences(definition: &SeriesDefinition) -> Occurrences {
    Occurrences {
        definition: *definition,
        index: 0,
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn clamps_to_month_end_in_leap_year() {
        let def = SeriesDefinition::monthly_count(d(2024, 1, 31), 3).unwrap();
        let dates: Vec<_> = generate_occurrences(&def).collect();
        assert_eq!(dates, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31)]);
    }

    #[test]
    fn clamps_to_28th_outside_leap_year() {
        let def = SeriesDefinition::monthly_count(d(2025, 1, 30), 4).unwrap();
        let dates: Vec<_> = generate_occurrences(&def).collect();
        assert_eq!(
            dates,
            vec![d(2025, 1, 30), d(2025, 2, 28), d(2025, 3, 30), d(2025, 4, 30)]
        );
    }

    #[test]
    fn until_bound_is_inclusive() {
        let def = SeriesDefinition::monthly_until(d(2024, 3, 15), d(2024, 6, 15)).unwrap();
        let dates: Vec<_> = generate_occurrences(&def).collect();
        assert_eq!(
            dates,
            vec![d(2024, 3, 15), d(2024, 4, 15), d(2024, 5, 15), d(2024, 6, 15)]
        );
    }

    #[test]
    fn until_before_next_step_stops_early() {
        let def = SeriesDefinition::monthly_until(d(2024, 3, 15), d(2024, 5, 14)).unwrap();
        assert_eq!(generate_occurrences(&def).count(), 2);
    }

    #[test]
    fn crosses_year_boundary() {
        let def = SeriesDefinition::monthly_count(d(2024, 11, 5), 3).unwrap();
        let dates: Vec<_> = generate_occurrences(&def).collect();
        assert_eq!(dates, vec![d(2024, 11, 5), d(2024, 12, 5), d(2025, 1, 5)]);
    }

    #[test]
    fn same_input_same_output() {
        let def = SeriesDefinition::monthly_count(d(2024, 8, 31), 12).unwrap();
        let a: Vec<_> = generate_occurrences(&def).collect();
        let b: Vec<_> = generate_occurrences(&def).collect();
        assert_eq!(a, b);

        let iter = generate_occurrences(&def);
        let restarted: Vec<_> = iter.clone().collect();
        assert_eq!(restarted, a);
    }

    #[test]
    fn rejects_empty_and_inverted_definitions() {
        assert!(matches!(
            SeriesDefinition::monthly_count(d(2024, 1, 1), 0),
            Err(SeriesError::MalformedSeries(_))
        ));
        assert!(matches!(
            SeriesDefinition::monthly_until(d(2024, 2, 1), d(2024, 1, 1)),
            Err(SeriesError::MalformedSeries(_))
        ));
    }

    #[test]
    fn single_day_range_yields_start() {
        let def = SeriesDefinition::monthly_until(d(2024, 2, 1), d(2024, 2, 1)).unwrap();
        assert_eq!(generate_occurrences(&def).collect::<Vec<_>>(), vec![d(2024, 2, 1)]);
    }
}
