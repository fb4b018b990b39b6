use crate::commands::{CmdCtx, CommandOutcome, CommandResult};
use crate::error::VaultError;
use crate::host::PlayerHost;
use crate::models::requirement::{ItemRequirement, aggregate};
use crate::models::types::{ItemEntry, SpellId};
use crate::services::materializer;

struct Reagent {
    entry: ItemEntry,
    per_craft: u32,
    in_bags: u32,
    in_vault: u32,
    max_stack: u32,
}

impl Reagent {
    fn needs_vault(&self, crafts: u32) -> bool {
        self.in_bags < self.per_craft.saturating_mul(crafts)
    }
}

/// Pull reagents for up to `count` crafts out of the vault and start the first cast. The
/// remaining casts are chained from the action-completed hook.
pub fn craft(ctx: &CmdCtx, player: &mut dyn PlayerHost, spell_id: SpellId, count: Option<u32>) -> CommandResult {
    let handle = ctx.session()?;
    let registry = &ctx.registry;

    let Some(spell) = registry.catalog.spell(spell_id) else {
        return Ok(CommandOutcome::rejected("Invalid spell."));
    };
    if !spell.has_reagents() {
        return Ok(CommandOutcome::rejected("Spell has no reagents."));
    }

    let requested = count.unwrap_or(1).max(1);
    let mut state = handle.try_state()?;
    let account_id = handle.account_id;

    let reagents: Vec<Reagent> = aggregate(spell.reagents())
        .into_iter()
        .map(|r| Reagent {
            entry: r.entry,
            per_craft: r.count,
            in_bags: player.item_count(r.entry),
            in_vault: registry.vault.count(account_id, r.entry),
            max_stack: registry.catalog.item(r.entry).map(|t| t.max_stack()).unwrap_or(1),
        })
        .collect();

    if reagents.iter().any(|r| r.in_bags.saturating_add(r.in_vault) < r.per_craft) {
        return Ok(CommandOutcome::rejected("Not enough reagents."));
    }

    // One slot per reagent coming from the vault, one for the product
    let vault_types = reagents.iter().filter(|r| r.needs_vault(1)).count() as u32;
    if player.free_slots() < vault_types + 1 {
        return Ok(CommandOutcome::rejected(
            "Not enough bag space (need room for reagents + product).",
        ));
    }

    let mut batch = requested;
    for r in &reagents {
        batch = batch.min(r.in_bags.saturating_add(r.in_vault) / r.per_craft);
    }
    // At most one max stack of each reagent comes out of the vault
    for r in &reagents {
        if r.needs_vault(batch) {
            batch = batch.min(r.in_bags.saturating_add(r.in_vault.min(r.max_stack)) / r.per_craft);
        }
    }
    if batch == 0 {
        return Ok(CommandOutcome::rejected("Not enough reagents."));
    }

    let deficits: Vec<ItemRequirement> = reagents
        .iter()
        .filter(|r| r.needs_vault(batch))
        .map(|r| ItemRequirement::new(r.entry, r.per_craft * batch - r.in_bags))
        .collect();

    match materializer::materialize(&registry.vault, &mut state, player, &deficits) {
        Ok(materialized) => {
            for m in &materialized {
                registry.send_count(ctx.session_id, m.entry, registry.vault.count(account_id, m.entry));
            }
        }
        Err(VaultError::NoSpace { .. }) => {
            return Ok(CommandOutcome::rejected("Not enough bag space for reagents."));
        }
        Err(e) => return Err(e.into()),
    }

    state.set_auto_store(false);
    state.start_batch(spell_id, batch);
    drop(state);

    tracing::debug!(session = %ctx.session_id, spell = %spell_id, batch, requested, "craft batch started");
    player.cast_spell(spell_id);

    if batch < requested {
        Ok(CommandOutcome::partial(format!("Crafting x{batch} of {requested}.")))
    } else {
        Ok(CommandOutcome::success(format!("Crafting x{batch}.")))
    }
}
