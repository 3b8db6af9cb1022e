use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::classifier::classify;
use crate::error::ExtractionError;
use crate::models::{Extracted, PaymentRecord, Provider, RawMessage};
use crate::providers::{self, NamePattern};

pub const UNKNOWN_PAYER: &str = "Unknown";

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Pull the first dollar amount out of `text` as an exact decimal.
pub fn extract_amount(text: &str, pattern: &Regex) -> Result<Decimal, ExtractionError> {
    let raw = pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .ok_or(ExtractionError::AmountNotFound)?
        .as_str();
    let cleaned = raw.replace(',', "");
    Decimal::from_str(&cleaned).map_err(|_| ExtractionError::AmountMalformed(raw.to_string()))
}

/// First non-empty alternative of the name pattern, trimmed, or `"Unknown"`.
pub fn extract_payer_name(text: &str, pattern: &NamePattern) -> Extracted<String> {
    let Some(caps) = pattern.regex.captures(text) else {
        return Extracted::Defaulted {
            value: UNKNOWN_PAYER.to_string(),
            reason: "no payer name in message".to_string(),
        };
    };
    pattern
        .groups
        .iter()
        .filter_map(|g| caps.name(g))
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
        .map(|s| Extracted::Parsed(s.to_string()))
        .unwrap_or_else(|| Extracted::Defaulted {
            value: UNKNOWN_PAYER.to_string(),
            reason: "payer name pattern matched without a name".to_string(),
        })
}

/// Parse an RFC 5322 `Date:` header into the calendar date in the sender's
/// own offset. Unparseable headers fall back to today.
pub fn parse_message_date(header: &str) -> Extracted<NaiveDate> {
    let trimmed = strip_trailing_comment(header.trim());
    match DateTime::parse_from_rfc2822(trimmed) {
        Ok(dt) => Extracted::Parsed(dt.date_naive()),
        Err(e) => {
            warn!("Failed to parse email date '{header}': {e}");
            Extracted::Defaulted {
                value: Local::now().date_naive(),
                reason: format!("unparseable date header '{header}': {e}"),
            }
        }
    }
}

// "Tue, 1 Jul 2025 10:00:00 -0400 (EDT)" carries a zone comment chrono rejects.
fn strip_trailing_comment(header: &str) -> &str {
    match (header.rfind('('), header.ends_with(')')) {
        (Some(idx), true) => header[..idx].trim_end(),
        _ => header,
    }
}

// ---------------------------------------------------------------------------
// Record construction
// ---------------------------------------------------------------------------

pub fn build_record(raw: &RawMessage, provider: Provider, amount: Decimal, payer_name: String) -> PaymentRecord {
    let date = parse_message_date(&raw.date_header);
    if date.is_defaulted() {
        debug!(message = %raw.id, "Payment dated {} in place of its header date", date.value());
    }
    PaymentRecord {
        date: date.into_value(),
        amount,
        provider,
        payer_name,
        email_subject: raw.subject.clone(),
        processed_at: Local::now().naive_local(),
    }
}

/// Run one message through classification and extraction.
///
/// `Ok(None)` means the message is not a payment notification.
pub fn process_message(raw: &RawMessage) -> Result<Option<PaymentRecord>, ExtractionError> {
    let Some(provider) = classify(&raw.from, &raw.subject) else {
        return Ok(None);
    };
    let pattern = providers::lookup(provider);
    let text = format!("{} {}", raw.body, raw.subject);

    let amount = extract_amount(&text, &pattern.amount)?;
    let payer = extract_payer_name(&text, &pattern.payer);
    if let Extracted::Defaulted { value, reason } = &payer {
        debug!(message = %raw.id, "{provider} payer recorded as '{value}': {reason}");
    }

    Ok(Some(build_record(raw, provider, amount, payer.into_value())))
}
