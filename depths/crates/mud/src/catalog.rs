use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Key,
    #[default]
    Misc,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub damage: u32,
    #[serde(default)]
    pub armor: u32,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub description: String,
}

impl ItemDef {
    /// What a vendor pays for this item.
    pub fn resale_value(&self) -> u32 {
        (self.value / 2).max(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcRole {
    #[default]
    Monster,
    Vendor,
    QuestGiver,
    Trainer,
}

impl NpcRole {
    /// Service NPCs are never valid combat targets.
    pub fn attackable(self) -> bool {
        self == NpcRole::Monster
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpcDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_health")]
    pub health: i32,
    #[serde(default = "default_true")]
    pub hostile: bool,
    #[serde(default)]
    pub role: NpcRole,
    #[serde(default)]
    pub experience: u32,
    /// Added to the level for the damage of this NPC's own attacks.
    #[serde(default)]
    pub damage: u32,
    /// Gold awarded to the killer, as an inclusive `[min, max]`.
    #[serde(default)]
    pub gold: [u32; 2],
    #[serde(default)]
    pub loot: Vec<LootEntry>,
    /// Item ids a vendor sells.
    #[serde(default)]
    pub wares: Vec<String>,
    #[serde(default = "default_markup")]
    pub markup: f64,
}

impl NpcDef {
    /// Asking price for `item` from this vendor.
    pub fn price_of(&self, item: &ItemDef) -> u32 {
        (item.value as f64 * self.markup).round() as u32
    }
}

/// An item an NPC may drop on death.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LootEntry {
    pub item_id: String,
    /// Drop probability in `[0, 1]`.
    pub chance: f64,
}

fn default_level() -> u32 {
    1
}

fn default_markup() -> f64 {
    1.2
}

fn default_health() -> i32 {
    10
}

fn default_true() -> bool {
    true
}

/// Static item and NPC templates referenced by id from rooms and characters.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<String, ItemDef>,
    npcs: BTreeMap<String, NpcDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced definition if the id was already present.
    pub fn insert_item(&mut self, item: ItemDef) -> Option<ItemDef> {
        self.items.insert(item.id.clone(), item)
    }

    pub fn insert_npc(&mut self, npc: NpcDef) -> Option<NpcDef> {
        self.npcs.insert(npc.id.clone(), npc)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn npc(&self, id: &str) -> Option<&NpcDef> {
        self.npcs.get(id)
    }

    /// Display name for an item id, falling back to the id itself for
    /// unknown items so they remain addressable.
    pub fn item_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.items.get(id).map(|i| i.name.as_str()).unwrap_or(id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }
}
