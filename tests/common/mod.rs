#![allow(dead_code)]

use abyssal_vault::config::{Config, VaultConfig};
use abyssal_vault::db::repo::MemoryLedger;
use abyssal_vault::error::AppResult;
use abyssal_vault::host::{AddonTransport, Catalog, PlayerHost, StoreDest};
use abyssal_vault::models::item::{ItemClass, ItemQuality, ItemStack, ItemTemplate};
use abyssal_vault::models::requirement::{Quest, SpellInfo};
use abyssal_vault::models::types::{AccountId, ItemEntry, ItemInstanceId, QuestId, SessionId, SpellId};
use abyssal_vault::protocol::{VaultMessage, VaultMirror};
use abyssal_vault::services::start_ledger_writer;
use abyssal_vault::{Acquisition, Registry};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const LINEN: ItemEntry = ItemEntry(2589);
pub const THREAD: ItemEntry = ItemEntry(2320);
pub const ORE: ItemEntry = ItemEntry(2770);
pub const SWORD: ItemEntry = ItemEntry(25);
pub const QUEST_ITEM: ItemEntry = ItemEntry(3300);

pub const BANDAGE: SpellId = SpellId(3275);
pub const NO_REAGENTS: SpellId = SpellId(133);
pub const DELIVERY: QuestId = QuestId(60);

pub struct FakeCatalog {
    items: HashMap<ItemEntry, ItemTemplate>,
    spells: HashMap<SpellId, SpellInfo>,
    quests: HashMap<QuestId, Quest>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        let mut items = HashMap::new();
        for (entry, name, class, max_stack) in [
            (LINEN, "Linen Cloth", ItemClass::TradeGoods, 20),
            (THREAD, "Coarse Thread", ItemClass::TradeGoods, 20),
            (ORE, "Copper Ore", ItemClass::TradeGoods, 20),
            (SWORD, "Worn Shortsword", ItemClass::Weapon, 1),
            (QUEST_ITEM, "Sealed Letter", ItemClass::TradeGoods, 20),
        ] {
            items.insert(
                entry,
                ItemTemplate {
                    entry,
                    name: name.to_string(),
                    class,
                    quality: ItemQuality::Common,
                    max_stack,
                },
            );
        }

        let spells = HashMap::from([
            (BANDAGE, SpellInfo::new(BANDAGE, [(LINEN.get(), 2), (THREAD.get(), 1)])),
            (NO_REAGENTS, SpellInfo::new(NO_REAGENTS, [])),
        ]);
        let quests = HashMap::from([(DELIVERY, Quest::new(DELIVERY, [(ORE.get(), 10)]))]);

        Self { items, spells, quests }
    }
}

impl Catalog for FakeCatalog {
    fn item(&self, entry: ItemEntry) -> Option<ItemTemplate> {
        self.items.get(&entry).cloned()
    }

    fn quest(&self, id: QuestId) -> Option<Quest> {
        self.quests.get(&id).cloned()
    }

    fn spell(&self, id: SpellId) -> Option<SpellInfo> {
        self.spells.get(&id).cloned()
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(SessionId, String)>>,
}

impl RecordingTransport {
    pub fn take(&self) -> Vec<(SessionId, String)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Decoded messages for one session, in send order
    pub fn messages(&self, session: SessionId, registry: &Registry) -> Vec<VaultMessage> {
        self.take()
            .into_iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, m)| registry.framer.decode(&m).unwrap())
            .collect()
    }

    pub fn mirror(&self, session: SessionId, registry: &Registry) -> VaultMirror {
        let mut mirror = VaultMirror::default();
        for m in self.messages(session, registry) {
            mirror.apply(&m);
        }
        mirror
    }
}

impl AddonTransport for RecordingTransport {
    fn deliver(&self, session: SessionId, message: String) {
        self.sent.lock().push((session, message));
    }
}

/// Bags with a fixed number of slots. Every created stack takes its own slot.
pub struct FakePlayer {
    slots: usize,
    max_stack: u32,
    stacks: Vec<ItemStack>,
    next_instance: u64,
    quest_items: HashSet<ItemEntry>,
    pub casts: Vec<SpellId>,
    /// When set, every created stack is reported back to the vault like a host callback would
    pub echo: Option<(Arc<Registry>, SessionId)>,
    pub echoes: Vec<AppResult<Acquisition>>,
}

impl FakePlayer {
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            max_stack: 20,
            stacks: Vec::new(),
            next_instance: 1,
            quest_items: HashSet::new(),
            casts: Vec::new(),
            echo: None,
            echoes: Vec::new(),
        }
    }

    pub fn with_quest_item(mut self, entry: ItemEntry) -> Self {
        self.quest_items.insert(entry);
        self
    }

    /// Loot: put items in the bags without going through the vault
    pub fn give(&mut self, entry: ItemEntry, count: u32) -> Vec<ItemStack> {
        self.create(entry, count)
    }

    /// Items leaving the bags behind the vault's back (trade, vendor, consumption)
    pub fn lose(&mut self, entry: ItemEntry, count: u32) -> u32 {
        self.destroy_item_count(entry, count)
    }

    pub fn item_count_of(&self, entry: ItemEntry) -> u32 {
        self.item_count(entry)
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    fn create(&mut self, entry: ItemEntry, count: u32) -> Vec<ItemStack> {
        let mut created = Vec::new();
        let mut left = count;
        while left > 0 {
            let n = left.min(self.max_stack);
            let stack = ItemStack {
                instance_id: ItemInstanceId(self.next_instance),
                entry,
                count: n,
            };
            self.next_instance += 1;
            self.stacks.push(stack);
            created.push(stack);
            left -= n;
        }
        created
    }

    fn slots_needed(&self, count: u32) -> usize {
        count.div_ceil(self.max_stack) as usize
    }
}

impl PlayerHost for FakePlayer {
    fn item_count(&self, entry: ItemEntry) -> u32 {
        self.stacks.iter().filter(|s| s.entry == entry).map(|s| s.count).sum()
    }

    fn can_store(&self, _entry: ItemEntry, count: u32) -> Option<StoreDest> {
        let free = self.slots.saturating_sub(self.stacks.len());
        (self.slots_needed(count) <= free).then(|| StoreDest {
            positions: vec![(self.stacks.len() as u16, count)],
        })
    }

    fn store_new_item(&mut self, dest: &StoreDest, entry: ItemEntry, count: u32) -> Vec<ItemStack> {
        if dest.positions.is_empty() || self.can_store(entry, count).is_none() {
            return Vec::new();
        }
        let created = self.create(entry, count);
        if let Some((registry, session)) = self.echo.clone() {
            for stack in &created {
                let result = registry.on_item_acquired(session, &*self, *stack);
                self.echoes.push(result);
            }
        }
        created
    }

    fn destroy_item_count(&mut self, entry: ItemEntry, count: u32) -> u32 {
        let mut left = count;
        for stack in self.stacks.iter_mut().rev().filter(|s| s.entry == entry) {
            let n = stack.count.min(left);
            stack.count -= n;
            left -= n;
            if left == 0 {
                break;
            }
        }
        self.stacks.retain(|s| s.count > 0);
        count - left
    }

    fn item_by_instance(&self, id: ItemInstanceId) -> Option<ItemStack> {
        self.stacks.iter().find(|s| s.instance_id == id).copied()
    }

    fn inventory(&self) -> Vec<ItemStack> {
        self.stacks.clone()
    }

    fn free_slots(&self) -> u32 {
        self.slots.saturating_sub(self.stacks.len()) as u32
    }

    fn has_quest_for_item(&self, entry: ItemEntry) -> bool {
        self.quest_items.contains(&entry)
    }

    fn cast_spell(&mut self, spell: SpellId) {
        self.casts.push(spell);
    }
}

pub struct Harness {
    pub ledger: Arc<MemoryLedger>,
    pub registry: Arc<Registry>,
    pub transport: Arc<RecordingTransport>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(VaultConfig::default())
    }

    pub fn with_config(vault: VaultConfig) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let transport = Arc::new(RecordingTransport::default());
        let config = Arc::new(Config {
            database_url: String::new(),
            vault,
        });
        let registry = Arc::new(Registry::new(
            config,
            start_ledger_writer(ledger.clone()),
            Arc::new(FakeCatalog::new()),
            transport.clone(),
        ));
        Self {
            ledger,
            registry,
            transport,
        }
    }

    /// Seed the store, then log a session in and drop its initial sync.
    pub async fn login(&self, account: AccountId, seed: &[(ItemEntry, u32)]) -> SessionId {
        for (entry, count) in seed {
            self.ledger.seed(account, *entry, *count);
        }
        let session = self.registry.on_session_start(account).await.unwrap();
        self.transport.take();
        session
    }

    pub fn vault(&self, account: AccountId, entry: ItemEntry) -> u32 {
        self.registry.vault.count(account, entry)
    }

    /// Wait until the writer caught up, then read the durable row.
    pub async fn row(&self, account: AccountId, entry: ItemEntry) -> Option<u32> {
        self.registry.vault.ledger().flush().await.unwrap();
        self.ledger.row(account, entry)
    }
}
