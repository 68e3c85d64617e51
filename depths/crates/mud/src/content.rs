use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use space::{Edge, EdgeType, LockInfo, WorldGraph};
use thiserror::Error;
use tracing::warn;

use crate::catalog::{Catalog, ItemDef, NpcDef};

/// Exit targets with this prefix refer to content outside the loaded world.
pub const EXTERNAL_PREFIX: &str = "external:";

pub fn is_external(target: &str) -> bool {
    target.starts_with(EXTERNAL_PREFIX)
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },

    #[error("no rooms found under {}", .0.display())]
    NoRooms(PathBuf),

    #[error("start room '{0}' does not exist")]
    MissingStartRoom(String),
}

/// An exit is either a bare target id or a detailed descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExitSpec {
    Target(String),
    Detailed {
        to: String,
        #[serde(default, rename = "type")]
        edge_type: Option<EdgeType>,
        #[serde(default)]
        weight: Option<u32>,
    },
}

impl ExitSpec {
    pub fn target(&self) -> &str {
        match self {
            ExitSpec::Target(to) | ExitSpec::Detailed { to, .. } => to.as_str(),
        }
    }

    fn edge_type(&self, direction: &str) -> EdgeType {
        match self {
            ExitSpec::Detailed {
                edge_type: Some(t), ..
            } => *t,
            _ if direction == "up" || direction == "down" => EdgeType::Climb,
            _ => EdgeType::Normal,
        }
    }

    fn weight(&self, direction: &str, edge_type: EdgeType) -> u32 {
        match self {
            ExitSpec::Detailed {
                weight: Some(w), ..
            } => *w,
            _ if edge_type == EdgeType::Climb && direction == "up" => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LairRecord {
    pub mob_id: String,
    /// Seconds before a missing mob is replaced.
    #[serde(default = "default_respawn")]
    pub respawn_time: u64,
    #[serde(default = "default_max_mobs")]
    pub max_mobs: usize,
}

fn default_respawn() -> u64 {
    300
}

fn default_max_mobs() -> usize {
    1
}

fn default_light() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub safe: bool,
    #[serde(default = "default_light")]
    pub light_level: i32,
    #[serde(default)]
    pub exits: BTreeMap<String, ExitSpec>,
    #[serde(default)]
    pub locked_exits: BTreeMap<String, LockInfo>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub npcs: Vec<String>,
    #[serde(default)]
    pub lairs: Vec<LairRecord>,
}

/// Everything read from a content directory.
#[derive(Debug, Clone, Default)]
pub struct WorldContent {
    pub rooms: Vec<RoomRecord>,
    pub catalog: Catalog,
}

impl WorldContent {
    /// Load `rooms/*.json` (one room per file), plus optional `items.json`
    /// and `npcs.json` arrays. Files are read in name order.
    pub fn load_dir(path: &Path) -> Result<Self, ContentError> {
        if !path.is_dir() {
            return Err(ContentError::NotADirectory(path.to_path_buf()));
        }

        let mut content = WorldContent::default();

        let items_path = path.join("items.json");
        if items_path.is_file() {
            for item in read_json::<Vec<ItemDef>>(&items_path)? {
                let id = item.id.clone();
                if content.catalog.insert_item(item).is_some() {
                    return Err(ContentError::Duplicate { kind: "item", id });
                }
            }
        }

        let npcs_path = path.join("npcs.json");
        if npcs_path.is_file() {
            for npc in read_json::<Vec<NpcDef>>(&npcs_path)? {
                let id = npc.id.clone();
                if content.catalog.insert_npc(npc).is_some() {
                    return Err(ContentError::Duplicate { kind: "npc", id });
                }
            }
        }

        let rooms_dir = path.join("rooms");
        let mut seen = BTreeSet::new();
        for file in json_files(&rooms_dir)? {
            let room: RoomRecord = read_json(&file)?;
            if !seen.insert(room.id.clone()) {
                return Err(ContentError::Duplicate {
                    kind: "room",
                    id: room.id,
                });
            }
            content.rooms.push(room);
        }

        if content.rooms.is_empty() {
            return Err(ContentError::NoRooms(rooms_dir));
        }

        tracing::info!(
            rooms = content.rooms.len(),
            items = content.catalog.item_count(),
            npcs = content.catalog.npc_count(),
            "world content loaded from {}",
            path.display()
        );
        Ok(content)
    }

    /// Build the exit graph. Unknown targets are kept (and reported by
    /// `WorldGraph::validate`); external placeholders are not graph edges.
    pub fn build_graph(&self) -> WorldGraph {
        let mut graph = WorldGraph::new();
        for room in &self.rooms {
            graph.add_room(room.id.clone());
        }

        for room in &self.rooms {
            for (direction, spec) in &room.exits {
                let target = spec.target();
                if is_external(target) {
                    continue;
                }
                if !graph.contains_room(target) {
                    warn!(room = %room.id, %direction, %target, "exit points to an unknown room");
                }

                let edge_type = spec.edge_type(direction);
                let mut edge = Edge::new(room.id.clone(), target, direction.clone())
                    .with_type(edge_type)
                    .with_weight(spec.weight(direction, edge_type));
                if let Some(lock) = room.locked_exits.get(direction) {
                    edge = edge.with_lock(lock.clone());
                }
                if let Err(e) = graph.add_edge(edge) {
                    warn!(room = %room.id, %direction, "skipping exit: {}", e);
                }
            }

            for direction in room.locked_exits.keys() {
                if !room.exits.contains_key(direction) {
                    warn!(room = %room.id, %direction, "lock declared on a missing exit");
                }
            }
        }

        graph
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    if files.is_empty() {
        warn!("Content directory is empty: {}", dir.display());
    }
    Ok(files)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
