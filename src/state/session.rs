use crate::models::types::{AccountId, ItemEntry, ItemInstanceId, SessionId, SpellId};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

/// Where a session is in the materialize / craft cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Materializing,
    AwaitingMultiCraft,
}

/// An auto-deposit that could not run inside the acquisition event itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeposit {
    pub entry: ItemEntry,
    pub count: u32,
}

/// Why an acquired item stayed in the bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AutoStoreOff,
    /// Created by the vault itself, during the current pull or an earlier one of this cycle
    Materialized,
    NotEligible,
}

/// What to do after a cast finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CraftStep {
    /// More casts of the batch remain, re-issue the cast
    Continue { spell: SpellId, remaining: u32 },
    /// Run the re-vault pass
    Revault,
}

/// Ephemeral vault state of one logged in session. Never shared between sessions and never
/// persisted; it references the account only by id.
#[derive(Debug)]
pub struct SessionState {
    session_id: SessionId,
    account_id: AccountId,
    auto_store_enabled: bool,
    is_materializing: bool,
    materialized: BTreeSet<ItemInstanceId>,
    pending_deposits: Vec<PendingDeposit>,
    pending_crafts: u32,
    pending_spell: Option<SpellId>,
}

impl SessionState {
    pub fn new(session_id: SessionId, account_id: AccountId) -> Self {
        Self {
            session_id,
            account_id,
            auto_store_enabled: true,
            is_materializing: false,
            materialized: BTreeSet::new(),
            pending_deposits: Vec::new(),
            pending_crafts: 0,
            pending_spell: None,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn phase(&self) -> Phase {
        if self.is_materializing {
            Phase::Materializing
        } else if self.pending_crafts > 0 {
            Phase::AwaitingMultiCraft
        } else {
            Phase::Idle
        }
    }

    pub fn set_auto_store(&mut self, enabled: bool) {
        self.auto_store_enabled = enabled;
    }

    /// Raise the re-entrancy guard. It drops back to its previous value when the returned
    /// guard goes out of scope, whichever way the scope is left.
    pub fn begin_materializing(&mut self) -> MaterializeGuard<'_> {
        let previous = self.is_materializing;
        self.is_materializing = true;
        MaterializeGuard { state: self, previous }
    }

    pub fn record_materialized(&mut self, id: ItemInstanceId) {
        self.materialized.insert(id);
    }

    pub fn has_materialized(&self) -> bool {
        !self.materialized.is_empty()
    }

    pub fn forget_materialized(&mut self, id: ItemInstanceId) {
        self.materialized.remove(&id);
    }

    pub fn take_materialized(&mut self) -> Vec<ItemInstanceId> {
        std::mem::take(&mut self.materialized).into_iter().collect()
    }

    /// Why an acquisition event for `instance` must not be auto-deposited, if it must not.
    /// Eligibility of the item itself is the policy's call.
    pub fn acquisition_skip(&self, instance: ItemInstanceId) -> Option<SkipReason> {
        if !self.auto_store_enabled {
            Some(SkipReason::AutoStoreOff)
        } else if self.is_materializing || self.materialized.contains(&instance) {
            Some(SkipReason::Materialized)
        } else {
            None
        }
    }

    pub fn enqueue_deposit(&mut self, entry: ItemEntry, count: u32) {
        if count > 0 {
            self.pending_deposits.push(PendingDeposit { entry, count });
        }
    }

    pub fn pending_deposits(&self) -> &[PendingDeposit] {
        &self.pending_deposits
    }

    /// Move the queue out so draining cannot observe its own side effects.
    pub fn take_pending_deposits(&mut self) -> Vec<PendingDeposit> {
        std::mem::take(&mut self.pending_deposits)
    }

    pub fn start_batch(&mut self, spell: SpellId, crafts: u32) {
        self.pending_crafts = crafts;
        self.pending_spell = Some(spell);
    }

    /// Advance the batch counter for a completed cast of `spell`.
    pub fn complete_cast(&mut self, spell: SpellId) -> CraftStep {
        if self.pending_crafts > 0 && self.pending_spell == Some(spell) {
            self.pending_crafts -= 1;
            if self.pending_crafts > 0 {
                return CraftStep::Continue {
                    spell,
                    remaining: self.pending_crafts,
                };
            }
        }
        CraftStep::Revault
    }

    /// Terminal reset after a re-vault pass.
    pub fn finish_cycle(&mut self) {
        self.materialized.clear();
        self.pending_crafts = 0;
        self.pending_spell = None;
        self.auto_store_enabled = true;
    }
}

/// Scoped re-entrancy guard. Derefs to the session so the guarded region can keep working on it.
pub struct MaterializeGuard<'a> {
    state: &'a mut SessionState,
    previous: bool,
}

impl Deref for MaterializeGuard<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        self.state
    }
}

impl DerefMut for MaterializeGuard<'_> {
    fn deref_mut(&mut self) -> &mut SessionState {
        self.state
    }
}

impl Drop for MaterializeGuard<'_> {
    fn drop(&mut self) {
        self.state.is_materializing = self.previous;
    }
}
