use crate::models::types::{ItemEntry, QuestId, SpellId};

/// Reagent slots a spell can carry
pub const MAX_SPELL_REAGENTS: usize = 8;
/// Item objectives a quest can carry
pub const MAX_QUEST_ITEM_OBJECTIVES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRequirement {
    pub entry: ItemEntry,
    pub count: u32,
}

impl ItemRequirement {
    pub fn new(entry: ItemEntry, count: u32) -> Self {
        Self { entry, count }
    }
}

#[derive(Debug, Clone)]
pub struct SpellInfo {
    pub id: SpellId,
    reagents: Vec<ItemRequirement>,
}

impl SpellInfo {
    /// Empty slots (entry 0 or count 0) are dropped, anything past the fixed arity is ignored.
    pub fn new(id: SpellId, reagents: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            id,
            reagents: fixed_arity(reagents, MAX_SPELL_REAGENTS),
        }
    }

    pub fn reagents(&self) -> &[ItemRequirement] {
        &self.reagents
    }

    pub fn has_reagents(&self) -> bool {
        !self.reagents.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Quest {
    pub id: QuestId,
    required_items: Vec<ItemRequirement>,
}

impl Quest {
    pub fn new(id: QuestId, required_items: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            id,
            required_items: fixed_arity(required_items, MAX_QUEST_ITEM_OBJECTIVES),
        }
    }

    pub fn required_items(&self) -> &[ItemRequirement] {
        &self.required_items
    }
}

fn fixed_arity(slots: impl IntoIterator<Item = (u32, u32)>, arity: usize) -> Vec<ItemRequirement> {
    slots
        .into_iter()
        .take(arity)
        .filter(|(entry, count)| *entry != 0 && *count != 0)
        .map(|(entry, count)| ItemRequirement::new(ItemEntry(entry), count))
        .collect()
}

/// Merge duplicate entries, keeping first-seen order.
pub fn aggregate(reqs: &[ItemRequirement]) -> Vec<ItemRequirement> {
    let mut out: Vec<ItemRequirement> = Vec::with_capacity(reqs.len());
    for req in reqs.iter().filter(|r| r.count > 0) {
        match out.iter_mut().find(|r| r.entry == req.entry) {
            Some(existing) => existing.count = existing.count.saturating_add(req.count),
            None => out.push(*req),
        }
    }
    out
}
