use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Records per insert batch unless `MIGRATE_BATCH_SIZE` says otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Export directory unless `BUBBLE_EXPORT_DIR` says otherwise.
pub const DEFAULT_EXPORT_DIR: &str = "./bubble-exports";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set for the hosted API target")]
    MissingHosted(&'static str),
    #[error("{0} must be set for a direct database connection")]
    MissingDirect(&'static str),
}

fn lookup_string(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn lookup_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup_string(lookup, key)
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Which store receives the migrated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Hosted PostgREST-style API (`SUPABASE_URL`, `SUPABASE_KEY`).
    Hosted,
    /// Direct Postgres connection (`DATABASE_URL`).
    Direct,
}

/// Credentials for the selected store.
#[derive(Clone, PartialEq, Eq)]
pub enum Target {
    Hosted { url: String, key: String },
    Direct { database_url: String },
}

impl Target {
    pub fn from_env(mode: Mode) -> Result<Self, ConfigError> {
        Self::from_lookup(mode, process_env)
    }

    /// Resolve credentials through `lookup`; a missing value is fatal.
    pub fn from_lookup(
        mode: Mode,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        match mode {
            Mode::Hosted => {
                let url = lookup_string(&lookup, "SUPABASE_URL")
                    .ok_or(ConfigError::MissingHosted("SUPABASE_URL"))?;
                let key = lookup_string(&lookup, "SUPABASE_KEY")
                    .ok_or(ConfigError::MissingHosted("SUPABASE_KEY"))?;
                Ok(Target::Hosted { url, key })
            }
            Mode::Direct => {
                let database_url = lookup_string(&lookup, "DATABASE_URL")
                    .ok_or(ConfigError::MissingDirect("DATABASE_URL"))?;
                Ok(Target::Direct { database_url })
            }
        }
    }

    pub fn database_url(&self) -> Option<&str> {
        match self {
            Target::Direct { database_url } => Some(database_url),
            Target::Hosted { .. } => None,
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Hosted { url, .. } => f
                .debug_struct("Hosted")
                .field("url", url)
                .field("key", &"<redacted>")
                .finish(),
            Target::Direct { .. } => f
                .debug_struct("Direct")
                .field("database_url", &"<redacted>")
                .finish(),
        }
    }
}

/// Run settings that need no credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub export_dir: PathBuf,
    pub batch_size: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            export_dir: lookup_string(&lookup, "BUBBLE_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
            batch_size: lookup_usize(&lookup, "MIGRATE_BATCH_SIZE", DEFAULT_BATCH_SIZE),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
