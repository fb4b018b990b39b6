//! Moving vault items into a player's bags and back.
//!
//! Everything here expects the caller to hold the session state exclusively. The functions
//! that create or destroy items raise the materialization guard themselves.

use crate::error::{AppResult, NotFound, VaultError};
use crate::host::PlayerHost;
use crate::models::requirement::{ItemRequirement, aggregate};
use crate::models::types::{AccountId, ItemEntry, ItemInstanceId};
use crate::services::VaultCache;
use crate::state::session::SessionState;

/// Items that went back into the vault. `total` is the vault count after the deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposited {
    pub entry: ItemEntry,
    pub count: u32,
    pub total: u32,
}

struct Created {
    entry: ItemEntry,
    count: u32,
    instances: Vec<ItemInstanceId>,
}

/// How many of each required entry must come out of the vault. Fails without side effects
/// when any single deficit cannot be covered.
pub fn plan_deficits(
    vault: &VaultCache,
    account_id: AccountId,
    player: &dyn PlayerHost,
    requirements: &[ItemRequirement],
) -> AppResult<Vec<ItemRequirement>> {
    let mut deficits = Vec::new();
    for req in aggregate(requirements) {
        let held = player.item_count(req.entry);
        if held >= req.count {
            continue;
        }
        let missing = req.count - held;
        let in_vault = vault.count(account_id, req.entry);
        if in_vault < missing {
            return Err(VaultError::InsufficientFunds {
                entry: req.entry,
                have: held.saturating_add(in_vault),
                need: req.count,
            });
        }
        deficits.push(ItemRequirement::new(req.entry, missing));
    }
    Ok(deficits)
}

/// Materialize every deficit or none of them. On failure, whatever this call already created
/// is destroyed and credited back before the error is returned.
pub fn materialize(
    vault: &VaultCache,
    state: &mut SessionState,
    player: &mut dyn PlayerHost,
    deficits: &[ItemRequirement],
) -> AppResult<Vec<ItemRequirement>> {
    let account_id = state.account_id();
    let mut guard = state.begin_materializing();
    let mut created: Vec<Created> = Vec::new();

    for req in deficits {
        match create_from_vault(vault, account_id, player, req.entry, req.count) {
            Ok(done) => {
                for id in &done.instances {
                    guard.record_materialized(*id);
                }
                created.push(done);
            }
            Err(e) => {
                tracing::warn!(
                    session = %guard.session_id(),
                    entry = %req.entry,
                    count = req.count,
                    error = %e,
                    "materialization aborted"
                );
                roll_back(vault, &mut guard, player, created);
                return Err(e);
            }
        }
    }

    Ok(created
        .iter()
        .map(|c| ItemRequirement::new(c.entry, c.count))
        .collect())
}

/// Create `count` of `entry` in the bags and take the same amount out of the vault.
fn create_from_vault(
    vault: &VaultCache,
    account_id: AccountId,
    player: &mut dyn PlayerHost,
    entry: ItemEntry,
    count: u32,
) -> AppResult<Created> {
    let no_space = VaultError::NoSpace { entry, count };
    let dest = player.can_store(entry, count).ok_or_else(|| no_space.clone())?;

    let stacks = player.store_new_item(&dest, entry, count);
    let stored: u32 = stacks.iter().map(|s| s.count).sum();
    if stacks.is_empty() || stored == 0 {
        return Err(no_space);
    }

    if let Err(e) = vault.withdraw(account_id, entry, stored) {
        // Another session of the account got there first
        player.destroy_item_count(entry, stored);
        return Err(e);
    }

    Ok(Created {
        entry,
        count: stored,
        instances: stacks.iter().map(|s| s.instance_id).collect(),
    })
}

fn roll_back(vault: &VaultCache, state: &mut SessionState, player: &mut dyn PlayerHost, created: Vec<Created>) {
    let account_id = state.account_id();
    for c in created {
        for id in &c.instances {
            state.forget_materialized(*id);
        }
        let take = c.count.min(vault.headroom(account_id, c.entry));
        let removed = player.destroy_item_count(c.entry, take);
        if removed == 0 {
            continue;
        }
        if let Err(e) = vault.deposit(account_id, c.entry, removed) {
            tracing::error!(account = %account_id, entry = %c.entry, count = removed, error = %e, "rollback deposit failed");
        }
    }
}

/// Return every materialized instance still in the bags to the vault. The materialized set is
/// empty afterwards. Leaves the bags untouched when the account is not resident, and leaves
/// whatever a full vault entry cannot take.
pub fn revault(vault: &VaultCache, state: &mut SessionState, player: &mut dyn PlayerHost) -> Vec<Deposited> {
    let account_id = state.account_id();
    if !vault.is_loaded(account_id) {
        tracing::warn!(account = %account_id, "re-vault skipped, account not resident");
        return Vec::new();
    }

    let mut guard = state.begin_materializing();
    let mut out = Vec::new();
    for id in guard.take_materialized() {
        let Some(stack) = player.item_by_instance(id) else {
            continue;
        };
        let take = stack.count.min(vault.headroom(account_id, stack.entry));
        let removed = player.destroy_item_count(stack.entry, take);
        if removed == 0 {
            continue;
        }
        match vault.deposit(account_id, stack.entry, removed) {
            Ok(total) => out.push(Deposited {
                entry: stack.entry,
                count: removed,
                total,
            }),
            Err(e) => {
                tracing::error!(account = %account_id, entry = %stack.entry, count = removed, error = %e, "re-vault deposit failed")
            }
        }
    }

    if !out.is_empty() {
        tracing::debug!(session = %guard.session_id(), stacks = out.len(), "re-vaulted materialized items");
    }
    out
}

/// Run the deferred auto-deposits. Each request is clamped to what the player still holds and
/// to what the vault can still take; the rest stays in the bags.
pub fn drain_pending(vault: &VaultCache, state: &mut SessionState, player: &mut dyn PlayerHost) -> AppResult<Vec<Deposited>> {
    let account_id = state.account_id();
    if state.pending_deposits().is_empty() {
        return Ok(Vec::new());
    }
    // Keep the queue until the account is back
    if !vault.is_loaded(account_id) {
        return Err(VaultError::NotFound(NotFound::Account(account_id)));
    }

    let mut guard = state.begin_materializing();
    let mut out = Vec::new();
    for pending in guard.take_pending_deposits() {
        let count = pending
            .count
            .min(player.item_count(pending.entry))
            .min(vault.headroom(account_id, pending.entry));
        if count == 0 {
            continue;
        }
        let removed = player.destroy_item_count(pending.entry, count);
        if removed == 0 {
            continue;
        }
        let total = vault.deposit(account_id, pending.entry, removed)?;
        out.push(Deposited {
            entry: pending.entry,
            count: removed,
            total,
        });
    }
    Ok(out)
}
