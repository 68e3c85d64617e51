//! Directed, weighted room graph used for exits, routing and structural
//! validation of the loaded world.

pub mod error;
pub mod graph;

pub use error::GraphError;
pub use graph::{Edge, EdgeType, GraphIssue, GraphStats, LockInfo, RoomId, Route, WorldGraph};
