use crate::error::{AppResult, NotFound, VaultError};
use crate::host::PlayerHost;
use crate::models::types::{ItemEntry, SessionId, SpellId};
use crate::state::registry::{Registry, SessionHandle};
use std::sync::Arc;
use thiserror::Error;

mod craft;
mod deposit;
mod sync;
mod withdraw;

pub const MESSAGE_PREFIX: &str = "Abyssal Storage: ";

pub type CommandResult = Result<CommandOutcome, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    Rejected,
    Partial,
}

/// Status line for the player plus how the command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub message: String,
    pub disposition: Disposition,
}

impl CommandOutcome {
    fn new(disposition: Disposition, text: impl AsRef<str>) -> Self {
        Self {
            message: format!("{MESSAGE_PREFIX}{}", text.as_ref()),
            disposition,
        }
    }

    pub fn success(text: impl AsRef<str>) -> Self {
        Self::new(Disposition::Success, text)
    }

    pub fn rejected(text: impl AsRef<str>) -> Self {
        Self::new(Disposition::Rejected, text)
    }

    pub fn partial(text: impl AsRef<str>) -> Self {
        Self::new(Disposition::Partial, text)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl CommandError {
    /// Every failure ends up as a rejected status line.
    pub fn into_outcome(self) -> CommandOutcome {
        let text = match &self {
            CommandError::Vault(VaultError::Disabled) => "The vault is disabled.".to_string(),
            CommandError::Vault(VaultError::NotFound(NotFound::Session(_))) => "No active vault session.".to_string(),
            CommandError::Vault(VaultError::Reentrant(_)) => "Busy, try again in a moment.".to_string(),
            other => format!("{other}."),
        };
        CommandOutcome::rejected(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultCommand {
    Withdraw { entry: ItemEntry, count: Option<u32> },
    DepositAll,
    Sync,
    Craft { spell: SpellId, count: Option<u32> },
}

/// Command context passed to command handlers
pub struct CmdCtx {
    /// Global service registry
    pub registry: Arc<Registry>,
    /// Session the command was issued from
    pub session_id: SessionId,
}

impl CmdCtx {
    pub fn new(registry: Arc<Registry>, session_id: SessionId) -> Self {
        Self { registry, session_id }
    }

    fn session(&self) -> AppResult<Arc<SessionHandle>> {
        self.registry.ensure_enabled()?;
        self.registry.session(self.session_id)
    }
}

pub fn process_command(cmd: VaultCommand, ctx: &CmdCtx, player: &mut dyn PlayerHost) -> CommandOutcome {
    let result = match cmd {
        VaultCommand::Withdraw { entry, count } => withdraw::withdraw(ctx, player, entry, count),
        VaultCommand::DepositAll => deposit::deposit_all(ctx, player),
        VaultCommand::Sync => sync::sync(ctx),
        VaultCommand::Craft { spell, count } => craft::craft(ctx, player, spell, count),
    };

    result.unwrap_or_else(|e| {
        tracing::debug!(session = %ctx.session_id, command = ?cmd, error = %e, "vault command rejected");
        e.into_outcome()
    })
}
