// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Logic errors raised by the series engine.
///
/// These are never retried and never swallowed: a caller that receives one
/// must abandon the whole operation rather than apply part of a scope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Transaction {0} not found")]
    NotFound(i64),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Malformed series: {0}")]
    MalformedSeries(String),
}

pub type SeriesResult<T> = std::result::Result<T, SeriesError>;
