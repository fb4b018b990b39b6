//! Contracts the game host fulfils for us. The vault never reaches into host objects on its
//! own; every operation receives the player it works on.

use crate::models::item::{ItemStack, ItemTemplate};
use crate::models::requirement::{Quest, SpellInfo};
use crate::models::types::{ItemEntry, ItemInstanceId, QuestId, SessionId, SpellId};

/// Where the host intends to put a new stack. Opaque to us, handed back to `store_new_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDest {
    /// (slot position, count) pairs
    pub positions: Vec<(u16, u32)>,
}

/// One player's inventory and spell book, valid for the duration of a single event.
pub trait PlayerHost {
    /// Total count of `entry` across the player's bags
    fn item_count(&self, entry: ItemEntry) -> u32;

    /// Can `count` new items of `entry` be placed?
    fn can_store(&self, entry: ItemEntry, count: u32) -> Option<StoreDest>;

    /// Create the items at `dest`. Returns every stack that was created, empty on failure.
    fn store_new_item(&mut self, dest: &StoreDest, entry: ItemEntry, count: u32) -> Vec<ItemStack>;

    /// Best effort. Returns how many were actually removed.
    fn destroy_item_count(&mut self, entry: ItemEntry, count: u32) -> u32;

    fn item_by_instance(&self, id: ItemInstanceId) -> Option<ItemStack>;

    /// Every stack in the backpack and equipped bags
    fn inventory(&self) -> Vec<ItemStack>;

    fn free_slots(&self) -> u32;

    /// Is `entry` still needed by one of the player's active quest objectives?
    fn has_quest_for_item(&self, entry: ItemEntry) -> bool;

    /// Ask the host to (re)issue a cast on the player
    fn cast_spell(&mut self, spell: SpellId);
}

/// Static game data lookups.
pub trait Catalog: Send + Sync {
    fn item(&self, entry: ItemEntry) -> Option<ItemTemplate>;
    fn quest(&self, id: QuestId) -> Option<Quest>;
    fn spell(&self, id: SpellId) -> Option<SpellInfo>;
}

/// Fire-and-forget delivery of a framed addon message to the client behind `session`.
pub trait AddonTransport: Send + Sync {
    fn deliver(&self, session: SessionId, message: String);
}
