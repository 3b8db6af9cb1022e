use crate::models::Provider;
use crate::providers;

/// Decide which provider sent a message, if any.
///
/// A provider matches when the sender contains one of its addresses and the
/// subject contains one of its keywords, both case-insensitively. Providers
/// are tried in `Provider::ALL` order and the first match wins; ordinary
/// non-payment mail yields `None`.
pub fn classify(from: &str, subject: &str) -> Option<Provider> {
    providers::patterns()
        .iter()
        .find(|p| p.matches_sender(from) && p.matches_subject(subject))
        .map(|p| p.provider)
}
