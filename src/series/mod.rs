// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurring and installment series engine. Everything here is a pure
//! function of its inputs; persistence lives in `crate::store`.

pub mod grouping;
pub mod planner;
pub mod schedule;

pub use grouping::{
    SeriesIssue, SeriesSummary, SeriesView, check_series, group_and_select_representatives,
    partition_series,
};
pub use planner::{MutationPlan, RetainedBounds, Scope, plan_mutation};
pub use schedule::{Cadence, Occurrences, SeriesBound, SeriesDefinition, generate_occurrences};
