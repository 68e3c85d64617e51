use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

pub type RoomId = String;

const DEFAULT_LOCK_TEXT: &str = "The way is locked.";

/// How an exit may be traversed. Path queries ignore the type; only the
/// exit-traversal layer enforces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[default]
    Normal,
    Hidden,
    Door,
    Locked,
    Climb,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeType::Normal => "normal",
            EdgeType::Hidden => "hidden",
            EdgeType::Door => "door",
            EdgeType::Locked => "locked",
            EdgeType::Climb => "climb",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub required_key: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl LockInfo {
    pub fn new(required_key: impl Into<String>) -> Self {
        Self {
            required_key: required_key.into(),
            description: None,
        }
    }

    /// Text shown to a player who bumps into the lock.
    pub fn message(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_LOCK_TEXT)
    }
}

/// A directed arc between two rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: RoomId,
    pub to: RoomId,
    pub direction: String,
    pub edge_type: EdgeType,
    pub weight: u32,
    pub hidden: bool,
    pub lock: Option<LockInfo>,
}

impl Edge {
    pub fn new(from: impl Into<RoomId>, to: impl Into<RoomId>, direction: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            direction: direction.into(),
            edge_type: EdgeType::Normal,
            weight: 1,
            hidden: false,
            lock: None,
        }
    }

    pub fn with_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = edge_type;
        if edge_type == EdgeType::Hidden {
            self.hidden = true;
        }
        self
    }

    /// Weights below 1 are raised to 1.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight.max(1);
        self
    }

    pub fn with_lock(mut self, lock: LockInfo) -> Self {
        self.lock = Some(lock);
        self.edge_type = EdgeType::Locked;
        self
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

/// A resolved route between two rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Rooms visited, starting room first and goal last.
    pub rooms: Vec<RoomId>,
    /// Exit direction taken out of each room except the last.
    pub directions: Vec<String>,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    DanglingEdge {
        from: RoomId,
        direction: String,
        to: RoomId,
    },
    NoReversePath {
        from: RoomId,
        to: RoomId,
    },
    OrphanRoom(RoomId),
}

impl GraphIssue {
    /// One-way passages are legitimate content; everything else is a defect.
    pub fn is_error(&self) -> bool {
        !matches!(self, GraphIssue::NoReversePath { .. })
    }
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::DanglingEdge { from, direction, to } => {
                write!(f, "exit {} of {} points to missing room {}", direction, from, to)
            }
            GraphIssue::NoReversePath { from, to } => {
                write!(f, "{} -> {} has no path back", from, to)
            }
            GraphIssue::OrphanRoom(room) => write!(f, "room {} has no exits in or out", room),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStats {
    pub rooms: usize,
    pub edges: usize,
    pub avg_connections: f64,
}

/// Rooms are nodes keyed by id; edges refer to rooms only by id, so the
/// structure never holds references between rooms.
#[derive(Debug, Clone, Default)]
pub struct WorldGraph {
    rooms: BTreeSet<RoomId>,
    edges: BTreeMap<RoomId, Vec<Edge>>,
}

struct Search<'g> {
    dist: HashMap<&'g str, u32>,
    prev: HashMap<&'g str, &'g Edge>,
}

impl WorldGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room node. Returns false if it was already present.
    pub fn add_room(&mut self, id: impl Into<RoomId>) -> bool {
        self.rooms.insert(id.into())
    }

    pub fn contains_room(&self, id: &str) -> bool {
        self.rooms.contains(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.iter()
    }

    /// Insert an edge, replacing any existing edge with the same origin and
    /// direction. The target room need not exist yet; `validate` reports it
    /// if it never appears.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !self.rooms.contains(&edge.from) {
            return Err(GraphError::RoomNotFound(edge.from));
        }
        let mut edge = edge;
        edge.weight = edge.weight.max(1);
        let out = self.edges.entry(edge.from.clone()).or_default();
        match out.iter_mut().find(|e| e.direction == edge.direction) {
            Some(existing) => *existing = edge,
            None => out.push(edge),
        }
        Ok(())
    }

    pub fn neighbors(&self, room: &str) -> Result<&[Edge], GraphError> {
        self.require(room)?;
        Ok(self.edges.get(room).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn exit(&self, room: &str, direction: &str) -> Result<Option<&Edge>, GraphError> {
        Ok(self.neighbors(room)?.iter().find(|e| e.direction == direction))
    }

    /// Lock or unlock an existing exit. An unlocked former lock becomes a door.
    pub fn set_lock(
        &mut self,
        room: &str,
        direction: &str,
        lock: Option<LockInfo>,
    ) -> Result<(), GraphError> {
        self.require(room)?;
        let edge = self
            .edges
            .get_mut(room)
            .and_then(|out| out.iter_mut().find(|e| e.direction == direction))
            .ok_or_else(|| GraphError::ExitNotFound {
                room: room.to_string(),
                direction: direction.to_string(),
            })?;
        edge.edge_type = if lock.is_some() {
            EdgeType::Locked
        } else {
            EdgeType::Door
        };
        edge.lock = lock;
        Ok(())
    }

    pub fn shortest_path(&self, start: &str, goal: &str) -> Result<Option<Vec<RoomId>>, GraphError> {
        Ok(self.shortest_route(start, goal)?.map(|route| route.rooms))
    }

    /// Dijkstra over edge weights. Hidden and locked edges are searchable.
    /// Returns `Ok(None)` when the goal cannot be reached.
    pub fn shortest_route(&self, start: &str, goal: &str) -> Result<Option<Route>, GraphError> {
        let start = self.require(start)?;
        let goal = self.require(goal)?;
        let search = self.search(start, Some(goal), None);

        let Some(&cost) = search.dist.get(goal) else {
            return Ok(None);
        };

        let mut rooms = vec![goal.to_string()];
        let mut directions = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            let Some(edge) = search.prev.get(cursor) else {
                break;
            };
            directions.push(edge.direction.clone());
            rooms.push(edge.from.clone());
            cursor = edge.from.as_str();
        }
        rooms.reverse();
        directions.reverse();

        Ok(Some(Route {
            rooms,
            directions,
            cost,
        }))
    }

    /// Weighted distance from `start` to `goal`, if reachable.
    pub fn distance(&self, start: &str, goal: &str) -> Result<Option<u32>, GraphError> {
        let start = self.require(start)?;
        let goal = self.require(goal)?;
        Ok(self.search(start, Some(goal), None).dist.get(goal).copied())
    }

    /// All rooms whose weighted distance from `center` is at most `radius`,
    /// including `center` itself.
    pub fn rooms_within_distance(
        &self,
        center: &str,
        radius: u32,
    ) -> Result<BTreeSet<RoomId>, GraphError> {
        let center = self.require(center)?;
        let search = self.search(center, None, Some(radius));
        Ok(search.dist.keys().map(|r| r.to_string()).collect())
    }

    /// Unweighted reachability from `start`, ignoring missing targets.
    pub fn reachable_from(&self, start: &str) -> Result<BTreeSet<RoomId>, GraphError> {
        let start = self.require(start)?;
        Ok(self.reachable(start).into_iter().map(str::to_string).collect())
    }

    /// Structural problems in the loaded graph. Never fails; an empty result
    /// means the graph is clean.
    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();
        let mut incoming: HashSet<&str> = HashSet::new();
        let mut reach_cache: HashMap<&str, HashSet<&str>> = HashMap::new();

        for (from, out) in &self.edges {
            for edge in out {
                if !self.rooms.contains(&edge.to) {
                    issues.push(GraphIssue::DanglingEdge {
                        from: from.clone(),
                        direction: edge.direction.clone(),
                        to: edge.to.clone(),
                    });
                    continue;
                }
                incoming.insert(edge.to.as_str());

                let direct_back = self
                    .edges
                    .get(&edge.to)
                    .is_some_and(|back| back.iter().any(|b| b.to == *from));
                if direct_back {
                    continue;
                }
                let reach = reach_cache
                    .entry(edge.to.as_str())
                    .or_insert_with(|| self.reachable(edge.to.as_str()));
                if !reach.contains(from.as_str()) {
                    issues.push(GraphIssue::NoReversePath {
                        from: from.clone(),
                        to: edge.to.clone(),
                    });
                }
            }
        }

        for room in &self.rooms {
            let has_out = self.edges.get(room).is_some_and(|out| !out.is_empty());
            if !has_out && !incoming.contains(room.as_str()) {
                issues.push(GraphIssue::OrphanRoom(room.clone()));
            }
        }

        issues
    }

    pub fn stats(&self) -> GraphStats {
        let rooms = self.room_count();
        let edges = self.edge_count();
        let avg_connections = if rooms == 0 {
            0.0
        } else {
            edges as f64 / rooms as f64
        };
        GraphStats {
            rooms,
            edges,
            avg_connections,
        }
    }

    fn require<'g>(&'g self, room: &str) -> Result<&'g str, GraphError> {
        self.rooms
            .get(room)
            .map(String::as_str)
            .ok_or_else(|| GraphError::RoomNotFound(room.to_string()))
    }

    fn out_edges(&self, room: &str) -> &[Edge] {
        self.edges.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    // Heap entries order by (cost, room id), so equal-cost frontiers expand
    // in id order and the chosen predecessor is reproducible.
    fn search<'g>(&'g self, start: &'g str, goal: Option<&str>, radius: Option<u32>) -> Search<'g> {
        let mut dist: HashMap<&'g str, u32> = HashMap::new();
        let mut prev: HashMap<&'g str, &'g Edge> = HashMap::new();
        let mut heap = BinaryHeap::new();

        dist.insert(start, 0);
        heap.push(Reverse((0u32, start)));

        while let Some(Reverse((cost, room))) = heap.pop() {
            if cost > dist.get(room).copied().unwrap_or(u32::MAX) {
                continue;
            }
            if goal == Some(room) {
                break;
            }
            for edge in self.out_edges(room) {
                if !self.rooms.contains(&edge.to) {
                    continue;
                }
                let next = cost.saturating_add(edge.weight);
                if radius.is_some_and(|r| next > r) {
                    continue;
                }
                let target = edge.to.as_str();
                if next < dist.get(target).copied().unwrap_or(u32::MAX) {
                    dist.insert(target, next);
                    prev.insert(target, edge);
                    heap.push(Reverse((next, target)));
                }
            }
        }

        Search { dist, prev }
    }

    fn reachable<'g>(&'g self, start: &'g str) -> HashSet<&'g str> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(room) = queue.pop_front() {
            for edge in self.out_edges(room) {
                if self.rooms.contains(&edge.to) && seen.insert(edge.to.as_str()) {
                    queue.push_back(edge.to.as_str());
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(rooms: &[&str]) -> WorldGraph {
        let mut graph = WorldGraph::new();
        for room in rooms {
            graph.add_room(*room);
        }
        graph
    }

    fn link(graph: &mut WorldGraph, from: &str, to: &str, dir: &str, weight: u32) {
        graph
            .add_edge(Edge::new(from, to, dir).with_weight(weight))
            .unwrap();
    }

    /// a -1- b -1- c, plus a direct a -5- c shortcut that is more expensive.
    fn setup_triangle() -> WorldGraph {
        let mut g = graph_with(&["a", "b", "c"]);
        link(&mut g, "a", "b", "east", 1);
        link(&mut g, "b", "a", "west", 1);
        link(&mut g, "b", "c", "east", 1);
        link(&mut g, "c", "b", "west", 1);
        link(&mut g, "a", "c", "north", 5);
        link(&mut g, "c", "a", "south", 5);
        g
    }

    #[test]
    fn unknown_room_is_not_found() {
        let g = setup_triangle();
        assert_eq!(
            g.neighbors("nowhere"),
            Err(GraphError::RoomNotFound("nowhere".into()))
        );
        assert!(g.shortest_path("a", "nowhere").is_err());
        assert!(g.rooms_within_distance("nowhere", 3).is_err());
    }

    #[test]
    fn add_edge_requires_origin() {
        let mut g = graph_with(&["a"]);
        let err = g.add_edge(Edge::new("x", "a", "north")).unwrap_err();
        assert_eq!(err, GraphError::RoomNotFound("x".into()));
    }

    #[test]
    fn add_edge_is_upsert_by_direction() {
        let mut g = graph_with(&["a", "b", "c"]);
        link(&mut g, "a", "b", "north", 1);
        link(&mut g, "a", "c", "north", 3);
        let out = g.neighbors("a").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, "c");
        assert_eq!(out[0].weight, 3);
    }

    #[test]
    fn zero_weight_is_raised_to_one() {
        let mut g = graph_with(&["a", "b"]);
        g.add_edge(Edge::new("a", "b", "up").with_weight(0)).unwrap();
        assert_eq!(g.neighbors("a").unwrap()[0].weight, 1);
    }

    #[test]
    fn shortest_path_prefers_cheaper_chain() {
        let g = setup_triangle();
        let route = g.shortest_route("a", "c").unwrap().unwrap();
        assert_eq!(route.rooms, vec!["a", "b", "c"]);
        assert_eq!(route.directions, vec!["east", "east"]);
        assert_eq!(route.cost, 2);
    }

    #[test]
    fn path_cost_matches_edge_sum_and_distance() {
        let g = setup_triangle();
        let route = g.shortest_route("c", "a").unwrap().unwrap();
        let summed: u32 = route
            .rooms
            .windows(2)
            .map(|pair| {
                g.neighbors(&pair[0])
                    .unwrap()
                    .iter()
                    .filter(|e| e.to == pair[1])
                    .map(|e| e.weight)
                    .min()
                    .unwrap()
            })
            .sum();
        assert_eq!(summed, route.cost);
        assert_eq!(g.distance("c", "a").unwrap(), Some(route.cost));
        // No other route beats it: the direct south exit costs 5.
        assert!(route.cost <= 5);
    }

    #[test]
    fn triangle_inequality_holds_across_chain() {
        let g = setup_triangle();
        let ab = g.distance("a", "b").unwrap().unwrap();
        let bc = g.distance("b", "c").unwrap().unwrap();
        let ac = g.distance("a", "c").unwrap().unwrap();
        assert!(ac <= ab + bc);
    }

    #[test]
    fn path_to_self_is_single_room() {
        let g = setup_triangle();
        let route = g.shortest_route("b", "b").unwrap().unwrap();
        assert_eq!(route.rooms, vec!["b"]);
        assert!(route.directions.is_empty());
        assert_eq!(route.cost, 0);
    }

    #[test]
    fn unreachable_until_edge_added() {
        let mut g = graph_with(&["a", "b"]);
        assert_eq!(g.shortest_path("a", "b").unwrap(), None);
        link(&mut g, "a", "b", "down", 1);
        assert_eq!(
            g.shortest_path("a", "b").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        // Edges are directional.
        assert_eq!(g.shortest_path("b", "a").unwrap(), None);
    }

    #[test]
    fn equal_cost_routes_resolve_deterministically() {
        // Two equal-cost two-hop routes a->m1->z and a->m2->z.
        let mut g = graph_with(&["a", "m1", "m2", "z"]);
        link(&mut g, "a", "m2", "east", 1);
        link(&mut g, "a", "m1", "north", 1);
        link(&mut g, "m1", "z", "east", 1);
        link(&mut g, "m2", "z", "north", 1);
        let first = g.shortest_path("a", "z").unwrap();
        for _ in 0..10 {
            assert_eq!(g.clone().shortest_path("a", "z").unwrap(), first);
        }
        assert_eq!(first.unwrap(), vec!["a", "m1", "z"]);
    }

    #[test]
    fn hidden_and_locked_edges_are_searchable() {
        let mut g = graph_with(&["a", "b", "c"]);
        g.add_edge(Edge::new("a", "b", "north").with_type(EdgeType::Hidden))
            .unwrap();
        g.add_edge(Edge::new("b", "c", "east").with_lock(LockInfo::new("brass_key")))
            .unwrap();
        let path = g.shortest_path("a", "c").unwrap().unwrap();
        assert_eq!(path, vec!["a", "b", "c"]);
        assert!(g.neighbors("a").unwrap()[0].hidden);
    }

    #[test]
    fn climbing_edges_may_be_asymmetric() {
        let mut g = graph_with(&["ledge", "pit"]);
        g.add_edge(Edge::new("pit", "ledge", "up").with_type(EdgeType::Climb).with_weight(2))
            .unwrap();
        g.add_edge(Edge::new("ledge", "pit", "down").with_type(EdgeType::Climb))
            .unwrap();
        assert_eq!(g.distance("pit", "ledge").unwrap(), Some(2));
        assert_eq!(g.distance("ledge", "pit").unwrap(), Some(1));
    }

    #[test]
    fn radius_query_includes_center_and_respects_weights() {
        let g = setup_triangle();
        let near = g.rooms_within_distance("a", 1).unwrap();
        assert!(near.contains("a"));
        assert!(near.contains("b"));
        assert!(!near.contains("c"));

        let zero = g.rooms_within_distance("a", 0).unwrap();
        assert_eq!(zero.len(), 1);

        let all = g.rooms_within_distance("a", 2).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn set_lock_toggles_edge_type() {
        let mut g = graph_with(&["a", "b"]);
        g.add_edge(Edge::new("a", "b", "north").with_lock(LockInfo::new("key")))
            .unwrap();
        assert!(g.exit("a", "north").unwrap().unwrap().is_locked());

        g.set_lock("a", "north", None).unwrap();
        let edge = g.exit("a", "north").unwrap().unwrap();
        assert!(!edge.is_locked());
        assert_eq!(edge.edge_type, EdgeType::Door);

        let err = g.set_lock("a", "south", None).unwrap_err();
        assert!(matches!(err, GraphError::ExitNotFound { .. }));
    }

    #[test]
    fn validate_reports_dangling_orphan_and_one_way() {
        let mut g = graph_with(&["a", "b", "lonely"]);
        link(&mut g, "a", "b", "east", 1);
        link(&mut g, "a", "void", "west", 1);

        let issues = g.validate();
        assert!(issues.contains(&GraphIssue::DanglingEdge {
            from: "a".into(),
            direction: "west".into(),
            to: "void".into(),
        }));
        assert!(issues.contains(&GraphIssue::OrphanRoom("lonely".into())));
        assert!(issues.contains(&GraphIssue::NoReversePath {
            from: "a".into(),
            to: "b".into(),
        }));
        assert!(!GraphIssue::NoReversePath {
            from: "a".into(),
            to: "b".into()
        }
        .is_error());
    }

    #[test]
    fn validate_accepts_indirect_return_path() {
        // a -> b -> c -> a is a loop with no direct reverse edges.
        let mut g = graph_with(&["a", "b", "c"]);
        link(&mut g, "a", "b", "east", 1);
        link(&mut g, "b", "c", "south", 1);
        link(&mut g, "c", "a", "west", 1);
        assert!(g.validate().is_empty());
    }

    #[test]
    fn dangling_targets_are_skipped_by_search() {
        let mut g = graph_with(&["a"]);
        link(&mut g, "a", "void", "west", 1);
        assert_eq!(g.rooms_within_distance("a", 10).unwrap().len(), 1);
    }

    #[test]
    fn stats_counts_rooms_and_edges() {
        let g = setup_triangle();
        let stats = g.stats();
        assert_eq!(stats.rooms, 3);
        assert_eq!(stats.edges, 6);
        assert!((stats.avg_connections - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lock_info_deserializes_with_default_text() {
        let lock: LockInfo = serde_json::from_str(r#"{"required_key":"iron_key"}"#).unwrap();
        assert_eq!(lock.message(), "The way is locked.");
        assert_eq!(lock.required_key, "iron_key");
    }

    #[test]
    fn edge_type_deserializes_snake_case() {
        let t: EdgeType = serde_json::from_str(r#""climb""#).unwrap();
        assert_eq!(t, EdgeType::Climb);
        assert_eq!(t.to_string(), "climb");
    }
}
