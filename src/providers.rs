use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::models::Provider;

const AMOUNT_PATTERN: &str = r"\$([0-9,]+\.?[0-9]*)";

// Two or three alphabetic words, e.g. "John Smith" or "Mary Ann Lee".
const NAME: &str = r"[A-Za-z]+\s+[A-Za-z]+(?:\s+[A-Za-z]+)?";

/// A payer-name pattern with named alternatives, tried in `groups` order.
pub struct NamePattern {
    pub regex: Regex,
    pub groups: &'static [&'static str],
}

pub struct ProviderPattern {
    pub provider: Provider,
    pub sender_addresses: &'static [&'static str],
    pub subject_keywords: &'static [&'static str],
    pub amount: Regex,
    pub payer: NamePattern,
}

impl ProviderPattern {
    pub fn matches_sender(&self, from: &str) -> bool {
        let from = from.to_lowercase();
        self.sender_addresses.iter().any(|s| from.contains(s))
    }

    pub fn matches_subject(&self, subject: &str) -> bool {
        let subject = subject.to_lowercase();
        self.subject_keywords.iter().any(|k| subject.contains(k))
    }
}

fn name_pattern(verb: &str) -> NamePattern {
    let source = format!(r"(?P<actor>{NAME})\s+{verb}\s+you|from\s+(?P<origin>{NAME})");
    let regex = RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .expect("payer pattern is a valid regex");
    NamePattern {
        regex,
        groups: &["actor", "origin"],
    }
}

fn pattern_for(provider: Provider) -> ProviderPattern {
    const SENT_KEYWORDS: &[&str] = &["sent you", "received", "payment"];
    const PAID_KEYWORDS: &[&str] = &["paid you", "charged you", "payment"];

    let sender_addresses: &'static [&'static str] = match provider {
        Provider::Zelle => &["noreply@zellepay.com", "alert@zellepay.com"],
        Provider::Venmo => &["venmo@venmo.com", "notifications@venmo.com"],
        Provider::CashApp => &["cash@square.com", "support@cash.app"],
        Provider::PayPal => &["service@paypal.com", "paypal@e.paypal.com"],
    };
    let (subject_keywords, verb): (&'static [&'static str], &str) = match provider {
        Provider::Venmo => (PAID_KEYWORDS, "paid"),
        _ => (SENT_KEYWORDS, "sent"),
    };
    ProviderPattern {
        provider,
        sender_addresses,
        subject_keywords,
        amount: Regex::new(AMOUNT_PATTERN).expect("amount pattern is a valid regex"),
        payer: name_pattern(verb),
    }
}

fn table() -> &'static [ProviderPattern] {
    static TABLE: OnceLock<Vec<ProviderPattern>> = OnceLock::new();
    TABLE.get_or_init(|| Provider::ALL.into_iter().map(pattern_for).collect())
}

/// Every provider's pattern, in classification order.
pub fn patterns() -> &'static [ProviderPattern] {
    table()
}

pub fn lookup(provider: Provider) -> &'static ProviderPattern {
    // The table is built from Provider::ALL, so every provider is present.
    let idx = Provider::ALL
        .iter()
        .position(|p| *p == provider)
        .unwrap_or_default();
    &table()[idx]
}

/// Union of all providers' sender addresses, sorted and deduplicated.
pub fn all_sender_addresses() -> Vec<&'static str> {
    table()
        .iter()
        .flat_map(|p| p.sender_addresses.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
