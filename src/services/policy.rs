use crate::host::PlayerHost;
use crate::models::item::{ItemClass, ItemTemplate};
use std::collections::HashSet;

/// Decides which items go to the vault on their own. Used by both the automatic deposit path
/// and deposit-all, so the two can never disagree about the same item.
#[derive(Debug, Clone)]
pub struct AutoStorePolicy {
    categories: HashSet<ItemClass>,
}

impl AutoStorePolicy {
    pub fn new(categories: impl IntoIterator<Item = ItemClass>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    pub fn allows_category(&self, class: ItemClass) -> bool {
        self.categories.contains(&class)
    }

    pub fn should_auto_store(&self, template: Option<&ItemTemplate>, player: &dyn PlayerHost) -> bool {
        let Some(template) = template else {
            return false;
        };

        if !self.allows_category(template.class) {
            return false;
        }

        // Quest items stay in the bags so objectives keep counting them
        !player.has_quest_for_item(template.entry)
    }
}
