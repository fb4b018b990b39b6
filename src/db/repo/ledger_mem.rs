use crate::db::error::DbError;
use crate::db::repo::ledger::{LedgerRepo, LedgerRow};
use crate::db::DbResult;
use crate::models::types::{AccountId, ItemEntry};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ephemeral ledger. Same semantics as the Postgres table, nothing survives the process.
#[derive(Default)]
pub struct MemoryLedger {
    rows: DashMap<(AccountId, ItemEntry), u32>,
    fail_writes: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a row, bypassing the write path.
    pub fn seed(&self, account_id: AccountId, entry: ItemEntry, count: u32) {
        if count > 0 {
            self.rows.insert((account_id, entry), count);
        }
    }

    pub fn row(&self, account_id: AccountId, entry: ItemEntry) -> Option<u32> {
        self.rows.get(&(account_id, entry)).map(|c| *c)
    }

    pub fn rows(&self) -> Vec<LedgerRow> {
        let mut rows: Vec<LedgerRow> = self
            .rows
            .iter()
            .map(|r| LedgerRow {
                account_id: r.key().0,
                entry: r.key().1,
                count: *r.value(),
            })
            .collect();
        rows.sort_by_key(|r| (r.account_id, r.entry));
        rows
    }

    /// Make every following write fail, to exercise the writer's error path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Validation("memory ledger is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerRepo for MemoryLedger {
    async fn load_account(&self, account_id: AccountId) -> DbResult<HashMap<ItemEntry, u32>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.key().0 == account_id)
            .map(|r| (r.key().1, *r.value()))
            .collect())
    }

    async fn add_count(&self, account_id: AccountId, entry: ItemEntry, delta: u32) -> DbResult<()> {
        self.check_writable()?;
        if delta == 0 {
            return Err(DbError::Validation("additive upsert with zero delta".into()));
        }
        let mut count = self.rows.entry((account_id, entry)).or_insert(0);
        *count = count
            .checked_add(delta)
            .ok_or_else(|| DbError::Validation(format!("count of {entry} would exceed u32")))?;
        Ok(())
    }

    async fn set_count(&self, account_id: AccountId, entry: ItemEntry, count: u32) -> DbResult<()> {
        self.check_writable()?;
        if count == 0 {
            return Err(DbError::CheckViolation);
        }
        // UPDATE semantics: a missing row stays missing
        if let Some(mut existing) = self.rows.get_mut(&(account_id, entry)) {
            *existing = count;
        }
        Ok(())
    }

    async fn delete_row(&self, account_id: AccountId, entry: ItemEntry) -> DbResult<()> {
        self.check_writable()?;
        self.rows.remove(&(account_id, entry));
        Ok(())
    }

    async fn list_accounts(&self) -> DbResult<Vec<AccountId>> {
        let mut accounts: Vec<AccountId> = self.rows.iter().map(|r| r.key().0).collect();
        accounts.sort();
        accounts.dedup();
        Ok(accounts)
    }
}
