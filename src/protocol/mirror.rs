use crate::models::types::ItemEntry;
use crate::protocol::VaultMessage;
use std::collections::{BTreeMap, HashMap};

/// What an addon knows about the vault after applying the messages it received.
///
/// A `SYNC` chunk only upserts, because one full sync may arrive as several chunks. A client
/// that wants to drop entries it missed a `DEL` for calls [`VaultMirror::reset`] before
/// applying the first chunk of a fresh sync (sent on login and after `sync` or deposit-all).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VaultMirror {
    items: HashMap<ItemEntry, u32>,
}

impl VaultMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: &VaultMessage) {
        match message {
            VaultMessage::Sync(records) => {
                for (entry, count) in records {
                    self.set(*entry, *count);
                }
            }
            VaultMessage::Update { entry, count } => self.set(*entry, *count),
            VaultMessage::Delete { entry } => {
                self.items.remove(entry);
            }
        }
    }

    /// Forget everything, ahead of a fresh full sync.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    fn set(&mut self, entry: ItemEntry, count: u32) {
        if count == 0 {
            self.items.remove(&entry);
        } else {
            self.items.insert(entry, count);
        }
    }

    pub fn count(&self, entry: ItemEntry) -> u32 {
        self.items.get(&entry).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_snapshot(&self) -> BTreeMap<ItemEntry, u32> {
        self.items.iter().map(|(e, c)| (*e, *c)).collect()
    }
}
