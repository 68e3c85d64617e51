//! Mutable world state: what is in each room right now.
//!
//! The set of rooms is fixed after load, so the map itself needs no lock.
//! Each room guards its own contents; an operation touching two rooms takes
//! both locks in room-id order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use session::SessionId;
use space::LockInfo;
use tracing::warn;

use crate::catalog::{Catalog, NpcDef};
use crate::content::{LairRecord, RoomRecord};
use crate::error::GameError;

/// One live copy of an NPC template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcInstance {
    pub instance_id: u64,
    pub npc_id: String,
    pub name: String,
    pub health: i32,
    pub max_health: i32,
}

#[derive(Debug, Clone, Default)]
pub struct RoomContents {
    pub items: Vec<String>,
    pub npcs: Vec<NpcInstance>,
    pub players: BTreeMap<SessionId, String>,
    pub locked_exits: BTreeMap<String, LockInfo>,
}

impl RoomContents {
    pub fn count_npcs(&self, npc_id: &str) -> usize {
        self.npcs.iter().filter(|n| n.npc_id == npc_id).count()
    }
}

#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub title: String,
    pub description: String,
    pub safe: bool,
    pub light_level: i32,
    /// Direction -> target, including external placeholders.
    pub exits: BTreeMap<String, String>,
    pub lairs: Vec<LairRecord>,
    contents: Mutex<RoomContents>,
}

impl Room {
    pub fn contents(&self) -> MutexGuard<'_, RoomContents> {
        self.contents.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A copy of the current contents, for rendering outside the lock.
    pub fn snapshot(&self) -> RoomContents {
        self.contents().clone()
    }
}

/// Something that can occupy a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Player { session_id: SessionId, name: String },
    Item(String),
    Npc(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpcHit {
    /// Already gone, e.g. killed by someone else first.
    Missing,
    Wounded { remaining: i32 },
    Killed(NpcInstance),
}

#[derive(Debug, Default)]
pub struct WorldState {
    rooms: HashMap<String, Room>,
    next_npc_id: AtomicU64,
}

impl WorldState {
    /// Build live rooms from content. Room NPC lists and lairs are
    /// populated immediately.
    pub fn from_records(records: &[RoomRecord], catalog: &Catalog) -> Self {
        let mut state = WorldState {
            rooms: HashMap::with_capacity(records.len()),
            next_npc_id: AtomicU64::new(1),
        };

        for record in records {
            let mut contents = RoomContents {
                items: record.items.clone(),
                locked_exits: record.locked_exits.clone(),
                ..Default::default()
            };

            let spawns = record.npcs.iter().map(String::as_str).chain(
                record
                    .lairs
                    .iter()
                    .flat_map(|l| std::iter::repeat(l.mob_id.as_str()).take(l.max_mobs)),
            );
            for npc_id in spawns {
                match catalog.npc(npc_id) {
                    Some(def) => contents.npcs.push(state.instantiate(def)),
                    None => warn!(room = %record.id, npc = npc_id, "unknown npc in room"),
                }
            }

            for item in &contents.items {
                if catalog.item(item).is_none() {
                    warn!(room = %record.id, item = %item, "unknown item in room");
                }
            }

            let room = Room {
                id: record.id.clone(),
                title: record.title.clone(),
                description: record.description.clone(),
                safe: record.safe,
                light_level: record.light_level,
                exits: record
                    .exits
                    .iter()
                    .map(|(dir, spec)| (dir.clone(), spec.target().to_string()))
                    .collect(),
                lairs: record.lairs.clone(),
                contents: Mutex::new(contents),
            };
            state.rooms.insert(room.id.clone(), room);
        }

        state
    }

    fn instantiate(&self, def: &NpcDef) -> NpcInstance {
        NpcInstance {
            instance_id: self.next_npc_id.fetch_add(1, Ordering::Relaxed),
            npc_id: def.id.clone(),
            name: def.name.clone(),
            health: def.health,
            max_health: def.health,
        }
    }

    pub fn room(&self, id: &str) -> Result<&Room, GameError> {
        self.rooms
            .get(id)
            .ok_or_else(|| GameError::NotFound(format!("There is no place called '{}'.", id)))
    }

    pub fn contains_room(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Run `f` with the room's contents locked.
    pub fn with_room<R>(&self, id: &str, f: impl FnOnce(&mut RoomContents) -> R) -> Result<R, GameError> {
        let room = self.room(id)?;
        let mut contents = room.contents();
        Ok(f(&mut contents))
    }

    /// Move an entity between rooms under both room locks, so it is never
    /// seen in both rooms or in neither.
    pub fn move_entity(&self, entity: &EntityRef, from: &str, to: &str) -> Result<(), GameError> {
        let from_room = self.room(from)?;
        let to_room = self.room(to)?;
        if from == to {
            return Ok(());
        }

        let (mut src, mut dst) = if from < to {
            let src = from_room.contents();
            let dst = to_room.contents();
            (src, dst)
        } else {
            let dst = to_room.contents();
            let src = from_room.contents();
            (src, dst)
        };

        match entity {
            EntityRef::Player { session_id, name } => {
                if src.players.remove(session_id).is_none() {
                    return Err(GameError::not_found(format!("{} is not in {}.", name, from)));
                }
                dst.players.insert(*session_id, name.clone());
            }
            EntityRef::Item(item_id) => {
                let Some(pos) = src.items.iter().position(|i| i == item_id) else {
                    return Err(GameError::not_found(format!("{} is not in {}.", item_id, from)));
                };
                let item = src.items.remove(pos);
                dst.items.push(item);
            }
            EntityRef::Npc(instance_id) => {
                let Some(pos) = src.npcs.iter().position(|n| n.instance_id == *instance_id) else {
                    return Err(GameError::not_found(format!("npc {} is not in {}.", instance_id, from)));
                };
                let npc = src.npcs.remove(pos);
                dst.npcs.push(npc);
            }
        }
        Ok(())
    }

    pub fn add_item_to_room(&self, room_id: &str, item_id: &str) -> Result<(), GameError> {
        self.with_room(room_id, |c| c.items.push(item_id.to_string()))
    }

    /// Returns false if the item was no longer there.
    pub fn remove_item_from_room(&self, room_id: &str, item_id: &str) -> Result<bool, GameError> {
        self.with_room(room_id, |c| match c.items.iter().position(|i| i == item_id) {
            Some(pos) => {
                c.items.remove(pos);
                true
            }
            None => false,
        })
    }

    pub fn spawn_npc_from_lair(&self, room_id: &str, def: &NpcDef) -> Result<NpcInstance, GameError> {
        let room = self.room(room_id)?;
        let npc = self.instantiate(def);
        room.contents().npcs.push(npc.clone());
        tracing::debug!(room = room_id, npc = %def.id, instance = npc.instance_id, "npc spawned");
        Ok(npc)
    }

    pub fn remove_npc(&self, room_id: &str, instance_id: u64) -> Result<Option<NpcInstance>, GameError> {
        self.with_room(room_id, |c| {
            c.npcs
                .iter()
                .position(|n| n.instance_id == instance_id)
                .map(|pos| c.npcs.remove(pos))
        })
    }

    /// Apply damage and remove the NPC if it dies, in one locked step.
    pub fn damage_npc(&self, room_id: &str, instance_id: u64, amount: i32) -> Result<NpcHit, GameError> {
        self.with_room(room_id, |c| {
            let Some(pos) = c.npcs.iter().position(|n| n.instance_id == instance_id) else {
                return NpcHit::Missing;
            };
            let npc = &mut c.npcs[pos];
            npc.health -= amount;
            if npc.health <= 0 {
                NpcHit::Killed(c.npcs.remove(pos))
            } else {
                NpcHit::Wounded {
                    remaining: npc.health,
                }
            }
        })
    }

    pub fn place_player(&self, room_id: &str, session_id: SessionId, name: &str) -> Result<(), GameError> {
        self.with_room(room_id, |c| {
            c.players.insert(session_id, name.to_string());
        })
    }

    pub fn remove_player(&self, room_id: &str, session_id: SessionId) -> Result<bool, GameError> {
        self.with_room(room_id, |c| c.players.remove(&session_id).is_some())
    }

    pub fn players_in(&self, room_id: &str) -> Result<Vec<(SessionId, String)>, GameError> {
        self.with_room(room_id, |c| {
            c.players.iter().map(|(sid, name)| (*sid, name.clone())).collect()
        })
    }

    /// Drop the lock on an exit. Returns false if it was not locked.
    pub fn unlock_exit(&self, room_id: &str, direction: &str) -> Result<bool, GameError> {
        self.with_room(room_id, |c| c.locked_exits.remove(direction).is_some())
    }
}
