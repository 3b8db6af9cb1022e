use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{PennyError, Result};

pub const DEFAULT_IMAP_SERVER: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_CHECK_INTERVAL: u64 = 300;

pub const ENV_EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
pub const ENV_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
pub const ENV_IMAP_SERVER: &str = "IMAP_SERVER";
pub const ENV_IMAP_PORT: &str = "IMAP_PORT";
pub const ENV_LEDGER_PATH: &str = "LEDGER_PATH";
/// Older name for `LEDGER_PATH`, still honoured when that is unset.
pub const ENV_EXCEL_FILE_PATH: &str = "EXCEL_FILE_PATH";
pub const ENV_CHECK_INTERVAL: &str = "CHECK_INTERVAL";

/// Persisted preferences. The mailbox password is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub email_address: String,
    #[serde(default = "default_imap_server")]
    pub imap_server: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

fn default_imap_server() -> String {
    DEFAULT_IMAP_SERVER.to_string()
}

fn default_imap_port() -> u16 {
    DEFAULT_IMAP_PORT
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL
}

fn default_ledger_path() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("penny")
        .join("payments.csv")
        .to_string_lossy()
        .to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email_address: String::new(),
            imap_server: default_imap_server(),
            imap_port: default_imap_port(),
            ledger_path: default_ledger_path(),
            check_interval: default_check_interval(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("penny")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PennyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Mailbox login. The password is wiped from memory on drop.
pub struct Credentials {
    pub email_address: String,
    password: String,
}

impl Credentials {
    pub fn new(email_address: String, password: String) -> Self {
        Self {
            email_address,
            password,
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email_address", &self.email_address)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub imap_server: String,
    pub imap_port: u16,
    pub ledger_path: PathBuf,
    pub check_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} is not set"),
            Self::Invalid { key, value, reason } => write!(f, "{key}='{value}' is invalid: {reason}"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn positive<T: std::str::FromStr + PartialOrd + Default>(
    key: &'static str,
    raw: String,
    problems: &mut Vec<ConfigProblem>,
) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Some(v),
        _ => {
            problems.push(ConfigProblem::Invalid {
                key,
                value: raw,
                reason: "expected a positive integer",
            });
            None
        }
    }
}

/// Only the ledger location; commands that never touch the mailbox use this.
pub fn resolve_ledger_path(settings: &Settings, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    let raw = non_empty(env(ENV_LEDGER_PATH))
        .or_else(|| non_empty(env(ENV_EXCEL_FILE_PATH)))
        .unwrap_or_else(|| settings.ledger_path.clone());
    PathBuf::from(shellexpand_path(&raw))
}

/// Merge the settings file with environment overrides and validate the
/// result, collecting every problem rather than stopping at the first.
pub fn resolve(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
) -> std::result::Result<Config, Vec<ConfigProblem>> {
    let mut problems = Vec::new();

    let email_address = non_empty(env(ENV_EMAIL_ADDRESS))
        .or_else(|| non_empty(Some(settings.email_address.clone())));
    if email_address.is_none() {
        problems.push(ConfigProblem::Missing(ENV_EMAIL_ADDRESS));
    }
    let password = non_empty(env(ENV_EMAIL_PASSWORD));
    if password.is_none() {
        problems.push(ConfigProblem::Missing(ENV_EMAIL_PASSWORD));
    }

    let imap_server = non_empty(env(ENV_IMAP_SERVER)).unwrap_or_else(|| settings.imap_server.clone());
    let imap_port = match non_empty(env(ENV_IMAP_PORT)) {
        Some(raw) => positive::<u16>(ENV_IMAP_PORT, raw, &mut problems),
        None => Some(settings.imap_port),
    };
    let check_interval = match non_empty(env(ENV_CHECK_INTERVAL)) {
        Some(raw) => positive::<u64>(ENV_CHECK_INTERVAL, raw, &mut problems),
        None if settings.check_interval == 0 => {
            problems.push(ConfigProblem::Invalid {
                key: ENV_CHECK_INTERVAL,
                value: "0".to_string(),
                reason: "expected a positive integer",
            });
            None
        }
        None => Some(settings.check_interval),
    };
    let ledger_path = resolve_ledger_path(settings, &env);

    match (email_address, password, imap_port, check_interval) {
        (Some(email_address), Some(password), Some(imap_port), Some(secs)) if problems.is_empty() => {
            Ok(Config {
                credentials: Credentials::new(email_address, password),
                imap_server,
                imap_port,
                ledger_path,
                check_interval: Duration::from_secs(secs),
            })
        }
        _ => Err(problems),
    }
}

/// Settings file plus the process environment.
pub fn load_config() -> Result<Config> {
    Ok(resolve(&load_settings(), |key| std::env::var(key).ok())?)
}

pub fn load_ledger_path() -> PathBuf {
    resolve_ledger_path(&load_settings(), |key| std::env::var(key).ok())
}
