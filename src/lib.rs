pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod host;
pub mod models;
pub mod protocol;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `abyssal_vault::Registry`, etc.)
pub use commands::{CmdCtx, CommandOutcome, Disposition, VaultCommand, process_command};
pub use hooks::{Acquisition, ActionOutcome, RequirementCheck};
pub use state::{registry::Registry, session::SessionState};
