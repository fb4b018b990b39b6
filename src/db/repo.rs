mod ledger;
mod ledger_db;
mod ledger_mem;

pub use ledger::{LedgerRepo, LedgerRow};
pub use ledger_db::LedgerRepository;
pub use ledger_mem::MemoryLedger;
