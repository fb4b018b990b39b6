use crate::commands::{CmdCtx, CommandOutcome, CommandResult};
use crate::error::{NotFound, VaultError};
use crate::host::PlayerHost;
use crate::models::types::ItemEntry;
use std::collections::BTreeMap;

/// Deposit every eligible stack in the bags. Entries are handled independently, so one
/// failure does not hold back the rest.
pub fn deposit_all(ctx: &CmdCtx, player: &mut dyn PlayerHost) -> CommandResult {
    let handle = ctx.session()?;
    let mut state = handle.try_state()?;
    let registry = &ctx.registry;
    let account_id = handle.account_id;

    if !registry.vault.is_loaded(account_id) {
        return Err(VaultError::NotFound(NotFound::Account(account_id)).into());
    }

    // Totals first, destroying while scanning would skip stacks of the same entry
    let mut totals: BTreeMap<ItemEntry, u32> = BTreeMap::new();
    for stack in player.inventory() {
        let template = registry.catalog.item(stack.entry);
        if registry.policy.should_auto_store(template.as_ref(), player) {
            *totals.entry(stack.entry).or_insert(0) += stack.count;
        }
    }

    let mut deposited = 0usize;
    {
        let _guard = state.begin_materializing();
        for (entry, count) in totals {
            // A full vault entry keeps the surplus in the bags
            let count = count.min(registry.vault.headroom(account_id, entry));
            if count == 0 {
                continue;
            }
            let removed = player.destroy_item_count(entry, count);
            if removed == 0 {
                continue;
            }
            match registry.vault.deposit(account_id, entry, removed) {
                Ok(_) => deposited += 1,
                Err(e) => tracing::warn!(account = %account_id, entry = %entry, count = removed, error = %e, "deposit-all entry failed"),
            }
        }
    }

    state.set_auto_store(true);
    drop(state);

    registry.send_full_sync(ctx.session_id, account_id);
    Ok(CommandOutcome::success(format!("Deposited {deposited} item stacks.")))
}
