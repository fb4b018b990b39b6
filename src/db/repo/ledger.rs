use crate::db::DbResult;
use crate::models::types::{AccountId, ItemEntry};
use std::collections::HashMap;

/// One persisted `(account, item, count)` tuple. A row only exists while `count > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRow {
    pub account_id: AccountId,
    pub entry: ItemEntry,
    pub count: u32,
}

#[async_trait::async_trait]
pub trait LedgerRepo: Send + Sync {
    /// All rows for an account, keyed by item entry
    async fn load_account(&self, account_id: AccountId) -> DbResult<HashMap<ItemEntry, u32>>;

    /// Additive upsert: creates the row with `delta` or adds `delta` to the stored count
    async fn add_count(&self, account_id: AccountId, entry: ItemEntry, delta: u32) -> DbResult<()>;

    /// Overwrite the count of an existing row (`count` must be > 0)
    async fn set_count(&self, account_id: AccountId, entry: ItemEntry, count: u32) -> DbResult<()>;

    async fn delete_row(&self, account_id: AccountId, entry: ItemEntry) -> DbResult<()>;

    /// Accounts that own at least one row
    async fn list_accounts(&self) -> DbResult<Vec<AccountId>>;
}
