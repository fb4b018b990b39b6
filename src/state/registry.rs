use crate::config::Config;
use crate::error::{AppResult, NotFound, VaultError};
use crate::host::{AddonTransport, Catalog};
use crate::models::types::{AccountId, ItemEntry, SessionId};
use crate::protocol::{AddonFramer, VaultMessage};
use crate::services::{AutoStorePolicy, LedgerHandle, VaultCache};
use crate::state::session::SessionState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One live session. The state is only ever locked with `try_lock`, so a host callback that
/// re-enters the session mid-operation is reported instead of deadlocking.
pub struct SessionHandle {
    pub session_id: SessionId,
    pub account_id: AccountId,
    state: Mutex<SessionState>,
}

impl SessionHandle {
    fn new(session_id: SessionId, account_id: AccountId) -> Self {
        Self {
            session_id,
            account_id,
            state: Mutex::new(SessionState::new(session_id, account_id)),
        }
    }

    pub fn try_state(&self) -> AppResult<MutexGuard<'_, SessionState>> {
        self.state.try_lock().ok_or_else(|| {
            tracing::warn!(session = %self.session_id, "re-entrant session event rejected");
            VaultError::Reentrant(self.session_id)
        })
    }
}

pub struct Registry {
    pub config: Arc<Config>,
    pub vault: Arc<VaultCache>,
    pub policy: AutoStorePolicy,
    pub catalog: Arc<dyn Catalog>,
    pub framer: AddonFramer,
    transport: Arc<dyn AddonTransport>,
    enabled: AtomicBool,
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
    account_sessions: DashMap<AccountId, usize>,
}

impl Registry {
    pub fn new(
        config: Arc<Config>,
        ledger: LedgerHandle,
        catalog: Arc<dyn Catalog>,
        transport: Arc<dyn AddonTransport>,
    ) -> Self {
        let vault_cfg = &config.vault;
        Self {
            vault: Arc::new(VaultCache::new(ledger)),
            policy: AutoStorePolicy::new(vault_cfg.auto_store_categories.iter().copied()),
            framer: AddonFramer::new(vault_cfg.addon_prefix.clone(), vault_cfg.max_message_len),
            enabled: AtomicBool::new(vault_cfg.enabled),
            catalog,
            transport,
            config,
            sessions: DashMap::new(),
            account_sessions: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Runtime switch, for a host that reloads its configuration.
    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::Relaxed) != enabled {
            tracing::info!(enabled, "abyssal storage toggled");
        }
    }

    pub fn ensure_enabled(&self) -> AppResult<()> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(VaultError::Disabled)
        }
    }

    pub fn session(&self, session_id: SessionId) -> AppResult<Arc<SessionHandle>> {
        self.sessions
            .get(&session_id)
            .map(|s| s.value().clone())
            .ok_or(VaultError::NotFound(NotFound::Session(session_id)))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Live sessions of `account_id`.
    pub fn account_session_count(&self, account_id: AccountId) -> usize {
        self.account_sessions.get(&account_id).map(|c| *c).unwrap_or(0)
    }

    pub(crate) fn register_session(&self, account_id: AccountId) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle::new(SessionId::new(), account_id));
        self.sessions.insert(handle.session_id, handle.clone());
        *self.account_sessions.entry(account_id).or_insert(0) += 1;
        handle
    }

    pub(crate) fn remove_session(&self, session_id: SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.remove(&session_id).map(|(_, handle)| handle)
    }

    /// Drop one reference to `account_id`; the last one out unloads the account. The count and
    /// the unload happen under the same entry lock, so a concurrent login either sees the
    /// account still referenced or finds it gone and loads it again.
    pub(crate) fn release_account(&self, account_id: AccountId) -> usize {
        match self.account_sessions.entry(account_id) {
            Entry::Occupied(mut e) => {
                let left = e.get().saturating_sub(1);
                if left == 0 {
                    e.remove();
                    self.vault.unload(account_id);
                } else {
                    *e.get_mut() = left;
                }
                left
            }
            Entry::Vacant(_) => 0,
        }
    }

    pub fn send(&self, session_id: SessionId, message: &VaultMessage) {
        for chunk in self.framer.frame_message(message) {
            self.transport.deliver(session_id, chunk);
        }
    }

    pub fn send_count(&self, session_id: SessionId, entry: ItemEntry, count: u32) {
        self.send(session_id, &VaultMessage::for_count(entry, count));
    }

    pub fn send_full_sync(&self, session_id: SessionId, account_id: AccountId) {
        let snapshot = self.vault.snapshot(account_id);
        tracing::debug!(session = %session_id, account = %account_id, items = snapshot.len(), "full vault sync");
        self.send(session_id, &VaultMessage::sync(&snapshot));
    }
}
