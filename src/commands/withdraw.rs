use crate::commands::{CmdCtx, CommandError, CommandOutcome, CommandResult};
use crate::host::PlayerHost;
use crate::models::item::item_link;
use crate::models::types::ItemEntry;

/// Permanently move items from the vault into the bags, one max-size stack at a time.
pub fn withdraw(ctx: &CmdCtx, player: &mut dyn PlayerHost, entry: ItemEntry, count: Option<u32>) -> CommandResult {
    let handle = ctx.session()?;
    let mut state = handle.try_state()?;
    let vault = &ctx.registry.vault;
    let account_id = handle.account_id;

    let in_vault = vault.count(account_id, entry);
    if in_vault == 0 {
        return Ok(CommandOutcome::rejected("Item not found in vault."));
    }
    let wanted = match count {
        Some(0) => return Err(CommandError::InvalidArgs("count must be positive".into())),
        Some(n) => n.min(in_vault),
        None => in_vault,
    };
    let Some(template) = ctx.registry.catalog.item(entry) else {
        return Ok(CommandOutcome::rejected("Invalid item."));
    };

    // The player asked for these, don't send them straight back
    state.set_auto_store(false);

    let max_stack = template.max_stack();
    let mut withdrawn = 0u32;
    {
        let _guard = state.begin_materializing();
        while withdrawn < wanted {
            let batch = (wanted - withdrawn).min(max_stack);
            let Some(dest) = player.can_store(entry, batch) else {
                break;
            };
            let stored: u32 = player.store_new_item(&dest, entry, batch).iter().map(|s| s.count).sum();
            if stored == 0 {
                break;
            }
            if let Err(e) = vault.withdraw(account_id, entry, stored) {
                tracing::warn!(account = %account_id, entry = %entry, count = stored, error = %e, "withdraw raced, undoing stack");
                player.destroy_item_count(entry, stored);
                break;
            }
            withdrawn += stored;
        }
    }

    if withdrawn == 0 {
        return Ok(CommandOutcome::rejected("Not enough bag space."));
    }

    ctx.registry.send_count(ctx.session_id, entry, vault.count(account_id, entry));
    tracing::debug!(session = %ctx.session_id, entry = %entry, withdrawn, wanted, "vault withdraw command");

    let text = format!("Withdrew {} x{withdrawn}.", item_link(entry, Some(&template)));
    if withdrawn < wanted {
        Ok(CommandOutcome::partial(format!("{text} Not enough bag space.")))
    } else {
        Ok(CommandOutcome::success(text))
    }
}
