//! Entry points the game host calls on session events.
//!
//! Every hook runs to completion on the calling thread. Only session start suspends, because
//! it may have to read the account from the ledger.

use crate::error::{AppResult, NotFound, VaultError};
use crate::host::PlayerHost;
use crate::models::item::ItemStack;
use crate::models::requirement::ItemRequirement;
use crate::models::types::{AccountId, QuestId, SessionId, SpellId};
use crate::services::{Deposited, materializer};
use crate::state::registry::Registry;
use crate::state::session::{CraftStep, Phase};

pub use crate::state::session::SkipReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Will be deposited on the next tick
    Queued,
    Skipped(SkipReason),
}

/// Answer to a quest or spell precondition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementCheck {
    /// Bags already hold enough, or the vault covered the gap
    Satisfied { materialized: Vec<ItemRequirement> },
    /// The vault cannot close the gap. Nothing was materialized; the host's own check decides.
    Uncovered(VaultError),
    /// Materialization had to be aborted. The action must not go ahead.
    Denied(VaultError),
    /// The vault stayed out of it (disabled, busy, unknown quest or spell)
    Skipped(VaultError),
}

impl RequirementCheck {
    pub fn allows(&self) -> bool {
        !matches!(self, RequirementCheck::Denied(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Nothing of ours was involved
    Untouched,
    /// The next cast of a batch was issued
    Continued { remaining: u32 },
    Revaulted(Vec<Deposited>),
}

impl Registry {
    /// Register a session for `account_id`, make the account resident and push a full sync.
    pub async fn on_session_start(&self, account_id: AccountId) -> AppResult<SessionId> {
        self.ensure_enabled()?;

        let handle = self.register_session(account_id);
        if let Err(e) = self.vault.load(account_id).await {
            tracing::error!(account = %account_id, error = %e, "vault load failed");
            self.remove_session(handle.session_id);
            self.release_account(account_id);
            return Err(e.into());
        }

        tracing::info!(session = %handle.session_id, account = %account_id, "vault session started");
        self.send_full_sync(handle.session_id, account_id);
        Ok(handle.session_id)
    }

    /// Final re-vault, then forget the session. The account is unloaded with its last session.
    /// Runs even while the feature is disabled so nothing materialized is left behind.
    pub fn on_session_end(&self, session_id: SessionId, player: &mut dyn PlayerHost) -> AppResult<Vec<Deposited>> {
        let handle = self.session(session_id)?;
        let returned = {
            let mut state = handle.try_state()?;
            let returned = materializer::revault(&self.vault, &mut state, player);
            state.finish_cycle();
            returned
        };

        self.remove_session(session_id);
        let left = self.release_account(handle.account_id);
        tracing::info!(
            session = %session_id,
            account = %handle.account_id,
            returned = returned.len(),
            sessions_left = left,
            "vault session ended"
        );
        Ok(returned)
    }

    /// Decide whether a freshly acquired stack goes to the vault. Never destroys anything
    /// itself; eligible stacks are queued for the next tick.
    pub fn on_item_acquired(&self, session_id: SessionId, player: &dyn PlayerHost, item: ItemStack) -> AppResult<Acquisition> {
        self.ensure_enabled()?;
        let handle = self.session(session_id)?;
        let mut state = handle.try_state()?;

        if let Some(reason) = state.acquisition_skip(item.instance_id) {
            return Ok(Acquisition::Skipped(reason));
        }

        let template = self.catalog.item(item.entry);
        if !self.policy.should_auto_store(template.as_ref(), player) {
            return Ok(Acquisition::Skipped(SkipReason::NotEligible));
        }

        state.enqueue_deposit(item.entry, item.count);
        tracing::debug!(session = %session_id, entry = %item.entry, count = item.count, "auto-deposit queued");
        Ok(Acquisition::Queued)
    }

    /// Drain the deferred deposits and push an update for each one that went through.
    pub fn on_periodic_tick(&self, session_id: SessionId, player: &mut dyn PlayerHost) -> AppResult<Vec<Deposited>> {
        self.ensure_enabled()?;
        let handle = self.session(session_id)?;
        let mut state = handle.try_state()?;

        let deposited = materializer::drain_pending(&self.vault, &mut state, player)?;
        for d in &deposited {
            self.send_count(session_id, d.entry, d.total);
        }
        Ok(deposited)
    }

    /// Pull whatever the bags are missing out of the vault, all of it or none of it.
    pub fn on_requirement_check(
        &self,
        session_id: SessionId,
        player: &mut dyn PlayerHost,
        requirements: &[ItemRequirement],
    ) -> RequirementCheck {
        if let Err(e) = self.ensure_enabled() {
            return RequirementCheck::Skipped(e);
        }
        let handle = match self.session(session_id) {
            Ok(h) => h,
            Err(e) => return RequirementCheck::Skipped(e),
        };
        let mut state = match handle.try_state() {
            Ok(s) => s,
            Err(e) => return RequirementCheck::Skipped(e),
        };

        let deficits = match materializer::plan_deficits(&self.vault, state.account_id(), player, requirements) {
            Ok(d) => d,
            Err(e) => return RequirementCheck::Uncovered(e),
        };
        if deficits.is_empty() {
            return RequirementCheck::Satisfied { materialized: Vec::new() };
        }

        match materializer::materialize(&self.vault, &mut state, player, &deficits) {
            Ok(materialized) => {
                for m in &materialized {
                    self.send_count(session_id, m.entry, self.vault.count(handle.account_id, m.entry));
                }
                RequirementCheck::Satisfied { materialized }
            }
            Err(e @ VaultError::NoSpace { .. }) => RequirementCheck::Denied(e),
            Err(e) => RequirementCheck::Uncovered(e),
        }
    }

    pub fn on_quest_complete_check(&self, session_id: SessionId, player: &mut dyn PlayerHost, quest_id: QuestId) -> RequirementCheck {
        let Some(quest) = self.catalog.quest(quest_id) else {
            return RequirementCheck::Skipped(VaultError::NotFound(NotFound::Quest(quest_id)));
        };
        self.on_requirement_check(session_id, player, quest.required_items())
    }

    pub fn on_spell_cast_check(&self, session_id: SessionId, player: &mut dyn PlayerHost, spell_id: SpellId) -> RequirementCheck {
        let Some(spell) = self.catalog.spell(spell_id) else {
            return RequirementCheck::Skipped(VaultError::NotFound(NotFound::Spell(spell_id)));
        };
        if !spell.has_reagents() {
            return RequirementCheck::Satisfied { materialized: Vec::new() };
        }
        self.on_requirement_check(session_id, player, spell.reagents())
    }

    /// A cast finished. Either chain the next cast of a batch or put the leftovers back.
    pub fn on_action_completed(
        &self,
        session_id: SessionId,
        player: &mut dyn PlayerHost,
        spell_id: SpellId,
    ) -> AppResult<ActionOutcome> {
        self.ensure_enabled()?;
        let handle = self.session(session_id)?;
        let mut state = handle.try_state()?;

        if state.phase() == Phase::Idle && !state.has_materialized() {
            return Ok(ActionOutcome::Untouched);
        }

        match state.complete_cast(spell_id) {
            CraftStep::Continue { spell, remaining } => {
                // The cast may call straight back into our hooks
                drop(state);
                tracing::debug!(session = %session_id, spell = %spell, remaining, "continuing craft batch");
                player.cast_spell(spell);
                Ok(ActionOutcome::Continued { remaining })
            }
            CraftStep::Revault => {
                let returned = materializer::revault(&self.vault, &mut state, player);
                state.finish_cycle();
                drop(state);
                for d in &returned {
                    self.send_count(session_id, d.entry, d.total);
                }
                Ok(ActionOutcome::Revaulted(returned))
            }
        }
    }
}
