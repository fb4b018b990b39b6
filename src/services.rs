mod ledger_writer;
pub mod materializer;
mod policy;
mod vault;

pub use ledger_writer::{LedgerHandle, LedgerJob, start_ledger_writer};
pub use materializer::Deposited;
pub use policy::AutoStorePolicy;
pub use vault::VaultCache;
