// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `end_date` stored on recurring series that never end.
pub static OPEN_END: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX));

/// Explicit owner of every store call. Nothing reads the current user from
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: i64,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "expenses" => Ok(TransactionKind::Expense),
            "income" | "incomes" => Ok(TransactionKind::Income),
            other => Err(anyhow!("Unknown transaction kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Pix,
    Cash,
    Debit,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "pix" => Ok(PaymentMethod::Pix),
            "cash" => Ok(PaymentMethod::Cash),
            "debit" => Ok(PaymentMethod::Debit),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(anyhow!(
                "Unknown payment method '{}' (use card|pix|cash|debit|transfer)",
                other
            )),
        }
    }
}

/// Identity of a series. Recurring and installment ids are separate
/// namespaces; `Orphan` covers flagged records that carry no group id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum SeriesKey {
    Recurring(String),
    Installment(String),
    Orphan(i64),
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKey::Recurring(id) => write!(f, "recurring:{}", id),
            SeriesKey::Installment(id) => write!(f, "installment:{}", id),
            SeriesKey::Orphan(id) => write!(f, "record:{}", id),
        }
    }
}

/// One stored expense or income row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub id: i64,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub occurrence_date: NaiveDate,
    pub category_id: i64,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
    #[serde(default)]
    pub bank_id: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub credit_card_id: Option<i64>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub has_installments: bool,
    #[serde(default)]
    pub recurring_group_id: Option<String>,
    #[serde(default)]
    pub installment_group_id: Option<String>,
    #[serde(default)]
    pub current_installment: Option<u32>,
    #[serde(default)]
    pub total_installments: Option<u32>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Transaction {
    /// The series this record belongs to, or `None` for a plain record.
    pub fn series_key(&self) -> Option<SeriesKey> {
        if let Some(g) = &self.recurring_group_id {
            return Some(SeriesKey::Recurring(g.clone()));
        }
        if let Some(g) = &self.installment_group_id {
            return Some(SeriesKey::Installment(g.clone()));
        }
        if self.is_recurring || self.has_installments {
            return Some(SeriesKey::Orphan(self.id));
        }
        None
    }

    pub fn belongs_to(&self, key: &SeriesKey) -> bool {
        match key {
            SeriesKey::Recurring(g) => self.recurring_group_id.as_deref() == Some(g.as_str()),
            SeriesKey::Installment(g) => self.installment_group_id.as_deref() == Some(g.as_str()),
            SeriesKey::Orphan(id) => self.id == *id,
        }
    }

    pub fn installment_label(&self) -> String {
        match (self.current_installment, self.total_installments) {
            (Some(c), Some(t)) => format!("{}/{}", c, t),
            _ => String::new(),
        }
    }
}

pub const ENVELOPE_VERSION: u32 = 1;

/// Versioned interchange document for exports and imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionEnvelope {
    pub version: u32,
    pub kind: TransactionKind,
    pub transactions: Vec<Transaction>,
}

/// Field values for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub bank_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub credit_card_id: Option<i64>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        check_amount(self.amount)?;
        if self.description.trim().is_empty() {
            bail!("Description must not be empty");
        }
        check_expense_fields(self.kind, self.payment_method, self.credit_card_id)
    }
}

/// Changes applied uniformly to every record selected by a scope. Dates and
/// installment positions are deliberately absent: each record keeps its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub bank_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub credit_card_id: Option<i64>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self == &TransactionPatch::default()
    }

    pub fn validate(&self, kind: TransactionKind) -> Result<()> {
        if self.is_empty() {
            bail!("Nothing to update");
        }
        if let Some(a) = self.amount {
            check_amount(a)?;
        }
        if let Some(d) = &self.description {
            if d.trim().is_empty() {
                bail!("Description must not be empty");
            }
        }
        if kind == TransactionKind::Income
            && (self.payment_method.is_some() || self.credit_card_id.is_some())
        {
            bail!("Payment method and credit card only apply to expenses");
        }
        Ok(())
    }

    /// Moving away from card payment drops the card unless one is given.
    pub fn clears_card(&self) -> bool {
        self.credit_card_id.is_none()
            && self
                .payment_method
                .is_some_and(|m| m != PaymentMethod::Card)
    }

    pub fn apply(&self, t: &mut Transaction) {
        if let Some(a) = self.amount {
            t.amount = a;
        }
        if let Some(d) = &self.description {
            t.description = d.clone();
        }
        if let Some(c) = self.category_id {
            t.category_id = c;
        }
        if let Some(s) = self.subcategory_id {
            t.subcategory_id = Some(s);
        }
        if let Some(b) = self.bank_id {
            t.bank_id = Some(b);
        }
        if let Some(m) = self.payment_method {
            t.payment_method = Some(m);
        }
        if self.clears_card() {
            t.credit_card_id = None;
        }
        if let Some(c) = self.credit_card_id {
            t.credit_card_id = Some(c);
        }
    }
}

/// Query parameters accepted by `store::list_transactions`.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub months: Vec<u32>,
    pub years: Vec<i32>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub is_recurring: Option<bool>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: i64,
    pub name: String,
    pub bank_id: Option<i64>,
}

pub(crate) fn check_amount(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        bail!("Amount must not be negative (got {})", amount);
    }
    Ok(())
}

pub(crate) fn check_expense_fields(
    kind: TransactionKind,
    method: Option<PaymentMethod>,
    card: Option<i64>,
) -> Result<()> {
    if kind == TransactionKind::Income && (method.is_some() || card.is_some()) {
        bail!("Payment method and credit card only apply to expenses");
    }
    if card.is_some() && method != Some(PaymentMethod::Card) {
        bail!("A credit card requires payment method 'card'");
    }
    Ok(())
}
