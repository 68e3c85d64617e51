use space::GraphError;
use thiserror::Error;

/// Player-facing failures. Every variant renders as the text the player sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("{0}")]
    NotFound(String),

    #[error("'{query}' matches multiple {kind}: {}. Please be more specific.", .candidates.join(", "))]
    Ambiguous {
        query: String,
        kind: &'static str,
        candidates: Vec<String>,
    },

    #[error("{prompt}")]
    InvalidParameters {
        verb: &'static str,
        prompt: &'static str,
    },

    #[error("{0}")]
    ActionDenied(String),

    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    PersistenceFailure(String),

    #[error("Connection lost.")]
    ConnectionLost,
}

impl GameError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        GameError::NotFound(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        GameError::ActionDenied(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::Ambiguous { .. } => "ambiguous",
            GameError::InvalidParameters { .. } => "invalid_parameters",
            GameError::ActionDenied(_) => "action_denied",
            GameError::Protocol(_) => "protocol",
            GameError::PersistenceFailure(_) => "persistence",
            GameError::ConnectionLost => "connection_lost",
        }
    }

    /// Whether the session should end after reporting this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::ConnectionLost)
    }
}

impl From<GraphError> for GameError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::RoomNotFound(id) => GameError::NotFound(format!("There is no place called '{}'.", id)),
            GraphError::ExitNotFound { .. } => GameError::NotFound("You can't go that way.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_lists_candidates() {
        let err = GameError::Ambiguous {
            query: "short".into(),
            kind: "items",
            candidates: vec!["Short Sword".into(), "Shortbow".into()],
        };
        assert_eq!(
            err.to_string(),
            "'short' matches multiple items: Short Sword, Shortbow. Please be more specific."
        );
        assert_eq!(err.kind(), "ambiguous");
    }

    #[test]
    fn only_connection_loss_is_fatal() {
        assert!(GameError::ConnectionLost.is_fatal());
        assert!(!GameError::Protocol("too long".into()).is_fatal());
        assert!(!GameError::PersistenceFailure("disk".into()).is_fatal());
    }

    #[test]
    fn graph_errors_become_not_found() {
        let err: GameError = GraphError::RoomNotFound("void".into()).into();
        assert_eq!(err.kind(), "not_found");
    }
}
