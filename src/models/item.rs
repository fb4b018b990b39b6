use crate::models::types::{ItemEntry, ItemInstanceId};
use serde::{Deserialize, Serialize};

/// Item category as reported by the host's item template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    Consumable,
    Container,
    Weapon,
    Gem,
    Armor,
    Reagent,
    Projectile,
    TradeGoods,
    Recipe,
    Quiver,
    Quest,
    Key,
    Miscellaneous,
    Glyph,
}

impl ItemClass {
    /// Map the host's numeric class id. Unknown ids land in `Miscellaneous`.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => ItemClass::Consumable,
            1 => ItemClass::Container,
            2 => ItemClass::Weapon,
            3 => ItemClass::Gem,
            4 => ItemClass::Armor,
            5 => ItemClass::Reagent,
            6 => ItemClass::Projectile,
            7 => ItemClass::TradeGoods,
            9 => ItemClass::Recipe,
            11 => ItemClass::Quiver,
            12 => ItemClass::Quest,
            13 => ItemClass::Key,
            16 => ItemClass::Glyph,
            _ => ItemClass::Miscellaneous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemClass::Consumable => "consumable",
            ItemClass::Container => "container",
            ItemClass::Weapon => "weapon",
            ItemClass::Gem => "gem",
            ItemClass::Armor => "armor",
            ItemClass::Reagent => "reagent",
            ItemClass::Projectile => "projectile",
            ItemClass::TradeGoods => "trade_goods",
            ItemClass::Recipe => "recipe",
            ItemClass::Quiver => "quiver",
            ItemClass::Quest => "quest",
            ItemClass::Key => "key",
            ItemClass::Miscellaneous => "miscellaneous",
            ItemClass::Glyph => "glyph",
        }
    }
}

impl std::str::FromStr for ItemClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let class = match s.to_ascii_lowercase().as_str() {
            "consumable" => ItemClass::Consumable,
            "container" => ItemClass::Container,
            "weapon" => ItemClass::Weapon,
            "gem" => ItemClass::Gem,
            "armor" => ItemClass::Armor,
            "reagent" => ItemClass::Reagent,
            "projectile" => ItemClass::Projectile,
            "trade_goods" | "tradegoods" => ItemClass::TradeGoods,
            "recipe" => ItemClass::Recipe,
            "quiver" => ItemClass::Quiver,
            "quest" => ItemClass::Quest,
            "key" => ItemClass::Key,
            "miscellaneous" | "misc" => ItemClass::Miscellaneous,
            "glyph" => ItemClass::Glyph,
            other => return Err(format!("unknown item class '{other}'")),
        };
        Ok(class)
    }
}

impl std::fmt::Display for ItemClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemQuality {
    Poor,
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Artifact,
    Heirloom,
}

impl ItemQuality {
    /// ARGB colour the client uses for links of this quality
    pub fn color(&self) -> u32 {
        match self {
            ItemQuality::Poor => 0xff9d9d9d,
            ItemQuality::Common => 0xffffffff,
            ItemQuality::Uncommon => 0xff1eff00,
            ItemQuality::Rare => 0xff0070dd,
            ItemQuality::Epic => 0xffa335ee,
            ItemQuality::Legendary => 0xffff8000,
            ItemQuality::Artifact | ItemQuality::Heirloom => 0xffe6cc80,
        }
    }
}

/// Read-only view of the host's item template.
#[derive(Debug, Clone)]
pub struct ItemTemplate {
    pub entry: ItemEntry,
    pub name: String,
    pub class: ItemClass,
    pub quality: ItemQuality,
    /// Largest stack the host allows in a single slot (always >= 1)
    pub max_stack: u32,
}

impl ItemTemplate {
    pub fn max_stack(&self) -> u32 {
        self.max_stack.max(1)
    }
}

/// A concrete stack sitting in a player's bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub instance_id: ItemInstanceId,
    pub entry: ItemEntry,
    pub count: u32,
}

/// Build a clickable chat link like `|cff1eff00|Hitem:2589:0:0:0:0:0:0:0:0:0|h[Linen Cloth]|h|r`.
pub fn item_link(entry: ItemEntry, template: Option<&ItemTemplate>) -> String {
    match template {
        Some(t) => format!(
            "|c{:08x}|Hitem:{}:0:0:0:0:0:0:0:0:0|h[{}]|h|r",
            t.quality.color(),
            entry,
            t.name
        ),
        None => format!("[Item #{entry}]"),
    }
}
