use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info, warn};

use crate::error::MailError;
use crate::models::{MessageId, RawMessage};
use crate::settings::Credentials;

use super::{parse_raw_message, MailSource};

type Session = imap::Session<TlsStream<TcpStream>>;

const MAILBOX: &str = "INBOX";

/// Connect, read and write deadline for every socket operation.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// IMAP-over-TLS inbox. Every operation runs in its own session that is
/// logged out before returning, on success and on error.
pub struct ImapMailbox {
    server: String,
    port: u16,
    credentials: Credentials,
    timeout: Duration,
}

impl ImapMailbox {
    pub fn new(server: &str, port: u16, credentials: Credentials) -> Self {
        Self {
            server: server.to_string(),
            port,
            credentials,
            timeout: IO_TIMEOUT,
        }
    }

    fn connect_tcp(&self) -> Result<TcpStream, MailError> {
        let addrs = (self.server.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| MailError::Connection(format!("{}: {e}", self.server)))?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(tcp) => {
                    tcp.set_read_timeout(Some(self.timeout))
                        .and_then(|_| tcp.set_write_timeout(Some(self.timeout)))
                        .map_err(|e| MailError::Connection(format!("{}: {e}", self.server)))?;
                    return Ok(tcp);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(MailError::Connection(match last_err {
            Some(e) => format!("{}:{}: {e}", self.server, self.port),
            None => format!("{}: no address found", self.server),
        }))
    }

    fn open(&self) -> Result<Session, MailError> {
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| MailError::Connection(format!("TLS setup failed: {e}")))?;
        let tcp = self.connect_tcp()?;
        let stream = tls
            .connect(&self.server, tcp)
            .map_err(|e| MailError::Connection(format!("TLS handshake with {} failed: {e}", self.server)))?;
        let mut client = imap::Client::new(stream);
        client
            .read_greeting()
            .map_err(|e| MailError::Connection(format!("No IMAP greeting from {}: {e}", self.server)))?;
        let session = client
            .login(&self.credentials.email_address, self.credentials.password())
            .map_err(|(e, _)| MailError::Connection(format!("IMAP login failed: {e}")))?;
        info!("Connected to {} as {}", self.server, self.credentials.email_address);
        Ok(session)
    }

    fn with_session<T>(
        &self,
        op: impl FnOnce(&mut Session) -> imap::error::Result<T>,
    ) -> Result<T, MailError> {
        let mut session = self.open()?;
        // Read-only: fetching must not flip the \Seen flag on the user's mail.
        let result = session.examine(MAILBOX).and_then(|_| op(&mut session));
        if let Err(e) = session.logout() {
            warn!("Error closing email connection: {e}");
        }
        result.map_err(|e| MailError::Protocol(e.to_string()))
    }
}

/// IMAP quoted string for a SEARCH argument.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl MailSource for ImapMailbox {
    fn search_by_sender(&mut self, address: &str) -> Result<Vec<MessageId>, MailError> {
        let query = format!("FROM {}", quote(address));
        let mut uids: Vec<u32> = self
            .with_session(|s| s.uid_search(&query))?
            .into_iter()
            .collect();
        uids.sort_unstable();
        debug!("Found {} emails from {address}", uids.len());
        Ok(uids.into_iter().map(MessageId::from).collect())
    }

    fn fetch_message(&mut self, id: &MessageId) -> Result<Option<RawMessage>, MailError> {
        let bytes = self.with_session(|s| {
            let fetches = s.uid_fetch(&id.0, "RFC822")?;
            Ok(fetches.iter().next().and_then(|f| f.body()).map(|b| b.to_vec()))
        })?;
        let Some(bytes) = bytes else {
            warn!("Message {id} has no body");
            return Ok(None);
        };
        let raw = parse_raw_message(id.clone(), &bytes);
        if raw.is_none() {
            warn!("Message {id} could not be decoded");
        }
        Ok(raw)
    }

    fn verify(&mut self) -> Result<(), MailError> {
        self.with_session(|_| Ok(()))
    }
}
