//! Game runtime for the Depths: world state, content loading, commands,
//! the per-actor attack limiter and the per-connection session driver.

pub mod catalog;
pub mod character;
pub mod commands;
pub mod content;
pub mod context;
pub mod driver;
pub mod error;
pub mod fatigue;
pub mod lairs;
pub mod parser;
pub mod persist;
pub mod resolve;
pub mod world;

pub use character::CharacterState;
pub use commands::{CommandCtx, CommandRegistry, Outcome};
pub use content::{ContentError, WorldContent};
pub use context::{GameSettings, WorldContext};
pub use driver::{run_session, CloseReason, SessionSummary};
pub use error::GameError;
pub use fatigue::{ActorId, FatigueLimiter};
pub use lairs::LairKeeper;
pub use parser::{parse_line, ParsedCommand, ParsedInput};
pub use persist::{PlayerStore, SqliteStore, StoreError};
pub use resolve::{resolve, MatchTier, Resolution};
pub use world::WorldState;
