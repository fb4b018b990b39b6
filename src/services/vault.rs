use crate::error::{AppResult, InfraError, NotFound, VaultError};
use crate::models::types::{AccountId, ItemEntry};
use crate::services::ledger_writer::{LedgerHandle, LedgerJob};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type AccountItems = Arc<Mutex<HashMap<ItemEntry, u32>>>;

/// In-memory mirror of the ledger for every resident account.
///
/// Each account has its own critical section. Every mutation updates memory and issues the
/// matching ledger write while holding it, so the order in which writes reach the store is
/// the order in which the mutations happened.
pub struct VaultCache {
    accounts: DashMap<AccountId, AccountItems>,
    ledger: LedgerHandle,
}

impl VaultCache {
    pub fn new(ledger: LedgerHandle) -> Self {
        Self {
            accounts: DashMap::new(),
            ledger,
        }
    }

    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    /// Make an account resident. Concurrent loads of the same account install a single map.
    pub async fn load(&self, account_id: AccountId) -> Result<(), InfraError> {
        if self.accounts.contains_key(&account_id) {
            return Ok(());
        }

        let items = self.ledger.load(account_id).await?;
        let rows = items.len();

        let mut installed = true;
        self.accounts
            .entry(account_id)
            .and_modify(|_| installed = false)
            .or_insert_with(|| Arc::new(Mutex::new(items)));

        if installed {
            tracing::debug!(account = %account_id, rows, "vault account loaded");
        }
        Ok(())
    }

    pub fn unload(&self, account_id: AccountId) {
        if self.accounts.remove(&account_id).is_some() {
            tracing::debug!(account = %account_id, "vault account unloaded");
        }
    }

    pub fn is_loaded(&self, account_id: AccountId) -> bool {
        self.accounts.contains_key(&account_id)
    }

    fn account(&self, account_id: AccountId) -> AppResult<AccountItems> {
        self.accounts
            .get(&account_id)
            .map(|e| e.value().clone())
            .ok_or(VaultError::NotFound(NotFound::Account(account_id)))
    }

    /// Add `count` to the vault. Returns the new total. A deposit that would push the count
    /// past u32::MAX changes nothing and issues no write.
    pub fn deposit(&self, account_id: AccountId, entry: ItemEntry, count: u32) -> AppResult<u32> {
        if count == 0 {
            return Ok(self.count(account_id, entry));
        }
        let account = self.account(account_id)?;
        let mut items = account.lock();

        let have = items.get(&entry).copied().unwrap_or(0);
        let total = have.checked_add(count).ok_or(VaultError::Overflow {
            entry,
            have,
            add: count,
        })?;
        items.insert(entry, total);

        self.ledger.issue(LedgerJob::Add {
            account_id,
            entry,
            delta: count,
        });

        tracing::debug!(account = %account_id, entry = %entry, count, total, "vault deposit");
        Ok(total)
    }

    /// Take exactly `count` out of the vault or nothing at all. Returns what is left.
    pub fn withdraw(&self, account_id: AccountId, entry: ItemEntry, count: u32) -> AppResult<u32> {
        let account = self.account(account_id)?;
        let mut items = account.lock();

        let have = items.get(&entry).copied().unwrap_or(0);
        if have == 0 {
            return Err(VaultError::NotFound(NotFound::Item(entry)));
        }
        if count == 0 {
            return Ok(have);
        }
        if have < count {
            return Err(VaultError::InsufficientFunds {
                entry,
                have,
                need: count,
            });
        }

        let left = have - count;
        if left == 0 {
            items.remove(&entry);
            self.ledger.issue(LedgerJob::Delete { account_id, entry });
        } else {
            items.insert(entry, left);
            self.ledger.issue(LedgerJob::Set {
                account_id,
                entry,
                count: left,
            });
        }

        tracing::debug!(account = %account_id, entry = %entry, count, left, "vault withdraw");
        Ok(left)
    }

    /// How many more of `entry` the vault can take. 0 when the account is not resident.
    pub fn headroom(&self, account_id: AccountId, entry: ItemEntry) -> u32 {
        match self.accounts.get(&account_id) {
            Some(account) => u32::MAX - account.lock().get(&entry).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// 0 when the item is absent or the account is not resident.
    pub fn count(&self, account_id: AccountId, entry: ItemEntry) -> u32 {
        match self.accounts.get(&account_id) {
            Some(account) => account.lock().get(&entry).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Point-in-time copy, ordered by entry. Empty when the account is not resident.
    pub fn snapshot(&self, account_id: AccountId) -> BTreeMap<ItemEntry, u32> {
        match self.accounts.get(&account_id) {
            Some(account) => account.lock().iter().map(|(e, c)| (*e, *c)).collect(),
            None => BTreeMap::new(),
        }
    }
}
