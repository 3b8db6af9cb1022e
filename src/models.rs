use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ledger column order. The CSV header and the SQLite columns both follow it.
pub const LEDGER_COLUMNS: [&str; 6] = [
    "Date",
    "Amount",
    "Source",
    "Client Name",
    "Email Subject",
    "Processed Date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    Zelle,
    Venmo,
    CashApp,
    PayPal,
}

impl Provider {
    /// Classification order. The first provider that matches a message wins.
    pub const ALL: [Provider; 4] = [
        Provider::Zelle,
        Provider::Venmo,
        Provider::CashApp,
        Provider::PayPal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zelle => "Zelle",
            Self::Venmo => "Venmo",
            Self::CashApp => "CashApp",
            Self::PayPal => "PayPal",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown payment source '{s}'"))
    }
}

/// Mailbox-unique identifier of a message (an IMAP UID for the real mailbox).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for MessageId {
    fn from(uid: u32) -> Self {
        Self(uid.to_string())
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A fetched message, decoded just far enough for classification and extraction.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: MessageId,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub date_header: String,
}

/// A value pulled out of message text, or the fallback used in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T> {
    Parsed(T),
    Defaulted { value: T, reason: String },
}

impl<T> Extracted<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Parsed(v) => v,
            Self::Defaulted { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Parsed(v) => v,
            Self::Defaulted { value, .. } => value,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub provider: Provider,
    pub payer_name: String,
    pub email_subject: String,
    pub processed_at: NaiveDateTime,
}

impl PaymentRecord {
    pub fn to_row(&self) -> [String; 6] {
        [
            self.date.format(DATE_FORMAT).to_string(),
            self.amount.to_string(),
            self.provider.name().to_string(),
            self.payer_name.clone(),
            self.email_subject.clone(),
            self.processed_at.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }

    /// Rebuild a record from ledger fields in `LEDGER_COLUMNS` order.
    /// `row` is the 1-based data row number, used only for error reporting.
    pub fn from_row<S: AsRef<str>>(row: usize, fields: &[S]) -> Result<Self, StorageError> {
        let corrupt = |reason: String| StorageError::CorruptRow { row, reason };
        if fields.len() < LEDGER_COLUMNS.len() {
            return Err(corrupt(format!(
                "expected {} columns, found {}",
                LEDGER_COLUMNS.len(),
                fields.len()
            )));
        }
        let field = |i: usize| fields[i].as_ref().trim();

        let date = NaiveDate::parse_from_str(field(0), DATE_FORMAT)
            .map_err(|e| corrupt(format!("bad date '{}': {e}", field(0))))?;
        let amount = Decimal::from_str(field(1))
            .map_err(|e| corrupt(format!("bad amount '{}': {e}", field(1))))?;
        let provider = Provider::from_str(field(2)).map_err(corrupt)?;
        let processed_at = NaiveDateTime::parse_from_str(field(5), TIMESTAMP_FORMAT)
            .map_err(|e| corrupt(format!("bad processed date '{}': {e}", field(5))))?;

        Ok(Self {
            date,
            amount,
            provider,
            payer_name: field(3).to_string(),
            email_subject: fields[4].as_ref().to_string(),
            processed_at,
        })
    }

    /// The content-equality key used to spot a payment already in the ledger.
    pub fn matches(&self, date: NaiveDate, amount: Decimal, provider: Provider, payer_name: &str) -> bool {
        self.date == date
            && self.amount == amount
            && self.provider == provider
            && self.payer_name == payer_name
    }
}
