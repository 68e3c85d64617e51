use serde::{Deserialize, Serialize};

pub const STARTING_GOLD: u32 = 100;
pub const STARTING_STAT: u32 = 15;
pub const STARTING_HEALTH: i32 = 100;
pub const EXPERIENCE_PER_LEVEL: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<String>,
    pub armor: Option<String>,
}

/// Full mutable state of a character, persisted as one blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub experience: u32,
    pub room_id: String,
    pub health: i32,
    pub max_health: i32,
    pub strength: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub equipped: Equipment,
}

impl CharacterState {
    pub fn new(name: impl Into<String>, start_room: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: 1,
            experience: 0,
            room_id: start_room.into(),
            health: STARTING_HEALTH,
            max_health: STARTING_HEALTH,
            strength: STARTING_STAT,
            gold: STARTING_GOLD,
            inventory: Vec::new(),
            equipped: Equipment::default(),
        }
    }

    /// Add experience, raising the level at each threshold. Returns true if
    /// the character levelled up.
    pub fn gain_experience(&mut self, amount: u32) -> bool {
        self.experience = self.experience.saturating_add(amount);
        let level = 1 + self.experience / EXPERIENCE_PER_LEVEL;
        if level > self.level {
            let gained = (level - self.level) as i32;
            self.level = level;
            self.max_health += gained * 10;
            self.health = self.max_health;
            true
        } else {
            false
        }
    }

    /// Remove one carried instance of `item_id`. Returns false if absent.
    pub fn take_item(&mut self, item_id: &str) -> bool {
        match self.inventory.iter().position(|i| i == item_id) {
            Some(pos) => {
                self.inventory.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn is_equipped(&self, item_id: &str) -> bool {
        self.equipped.weapon.as_deref() == Some(item_id)
            || self.equipped.armor.as_deref() == Some(item_id)
    }
}
