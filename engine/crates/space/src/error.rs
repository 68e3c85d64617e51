#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("room {0} does not exist")]
    RoomNotFound(String),

    #[error("no exit {direction} from room {room}")]
    ExitNotFound { room: String, direction: String },
}
