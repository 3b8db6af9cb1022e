pub mod imap_mailbox;

use mail_parser::MessageParser;

use crate::error::MailError;
use crate::models::{MessageId, RawMessage};

/// The inbox as the tracker sees it.
pub trait MailSource {
    /// Identifiers of every message from `address`.
    fn search_by_sender(&mut self, address: &str) -> Result<Vec<MessageId>, MailError>;

    /// `Ok(None)` when the message has vanished or cannot be decoded.
    fn fetch_message(&mut self, id: &MessageId) -> Result<Option<RawMessage>, MailError>;

    /// Open and close a session without doing anything else.
    fn verify(&mut self) -> Result<(), MailError>;
}

/// Decode an RFC 822 message into the fields the extractor needs.
pub fn parse_raw_message(id: MessageId, bytes: &[u8]) -> Option<RawMessage> {
    let parsed = MessageParser::default().parse(bytes)?;

    let from = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .and_then(|addr| addr.address().or_else(|| addr.name()))
        .unwrap_or_default()
        .to_string();
    let subject = parsed.subject().unwrap_or_default().to_string();
    let body = parsed
        .body_text(0)
        .map(|b| b.into_owned())
        .unwrap_or_default();
    let date_header = parsed.date().map(|d| d.to_rfc822()).unwrap_or_default();

    Some(RawMessage {
        id,
        from,
        subject,
        body,
        date_header,
    })
}
