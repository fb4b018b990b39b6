use crate::db::error::DbError;
use crate::models::types::{AccountId, ItemEntry, QuestId, SessionId, SpellId};
use thiserror::Error;

pub type AppResult<T> = Result<T, VaultError>;

/// Every failure a vault operation can report back to the host. None of them is fatal to
/// the process; callers turn them into a status line and an allow/deny answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("not found: {0}")]
    NotFound(NotFound),

    /// Vault (or inventory plus vault) holds less than required
    #[error("insufficient quantity of item {entry}: have {have}, need {need}")]
    InsufficientFunds { entry: ItemEntry, have: u32, need: u32 },

    /// The vault count of an entry cannot go past u32::MAX
    #[error("vault count of item {entry} would overflow: have {have}, adding {add}")]
    Overflow { entry: ItemEntry, have: u32, add: u32 },

    /// Host inventory rejected the placement
    #[error("no inventory space for {count} x item {entry}")]
    NoSpace { entry: ItemEntry, count: u32 },

    /// Blocked by the materialization guard
    #[error("session {0} is busy materializing")]
    Reentrant(SessionId),

    #[error("abyssal storage is disabled")]
    Disabled,

    /// The ledger could not be read (only account loads can hit this)
    #[error("ledger unavailable: {0}")]
    Storage(String),
}

impl From<InfraError> for VaultError {
    fn from(e: InfraError) -> Self {
        VaultError::Storage(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    Account(AccountId),
    Item(ItemEntry),
    Spell(SpellId),
    Quest(QuestId),
    Session(SessionId),
}

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFound::Account(id) => write!(f, "account {id}"),
            NotFound::Item(id) => write!(f, "item {id}"),
            NotFound::Spell(id) => write!(f, "spell {id}"),
            NotFound::Quest(id) => write!(f, "quest {id}"),
            NotFound::Session(id) => write!(f, "session {id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("ledger writer is gone")]
    WriterClosed,
}

impl InfraError {
    pub(crate) fn from_env(key: &str, msg: impl Into<String>) -> Self {
        InfraError::Config {
            path: ".env".into(),
            source: ConfigErrorKind::InvalidEnv(key.to_string(), msg.into()),
        }
    }
}
