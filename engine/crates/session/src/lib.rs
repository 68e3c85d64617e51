use std::fmt;

pub mod directory;

pub use directory::{OnlineEntry, SessionDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub session_id: SessionId,
    pub text: String,
    /// When true, the output router will close the session's write channel
    /// after delivering this message, causing the TCP connection to shut down.
    pub disconnect: bool,
}

impl SessionOutput {
    pub fn new(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            text: text.into(),
            disconnect: false,
        }
    }

    /// Create a final message that will disconnect the session after delivery.
    pub fn with_disconnect(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            text: text.into(),
            disconnect: true,
        }
    }
}

/// Steps of the login dialogue inside `Authenticating`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStage {
    Username,
    Password { username: String },
    NewPassword { username: String },
    ConfirmPassword { username: String, password: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating(AuthStage),
    CharacterSelect { account_id: i64 },
    Playing,
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Authenticating(_) => "authenticating",
            SessionState::CharacterSelect { .. } => "character_select",
            SessionState::Playing => "playing",
            SessionState::Closed => "closed",
        }
    }

    /// Forward-only progression; `Closed` is reachable from anywhere and
    /// is terminal.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Connecting, Authenticating(_)) => true,
            (Authenticating(_), Authenticating(_)) => true,
            (Authenticating(_), CharacterSelect { .. }) => true,
            (CharacterSelect { .. }, CharacterSelect { .. }) => true,
            (CharacterSelect { .. }, Playing) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("session cannot go from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Per-connection session record. Owned and mutated only by the task that
/// drives its connection.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub session_id: SessionId,
    state: SessionState,
    pub account_id: Option<i64>,
    pub username: Option<String>,
    pub character_id: Option<i64>,
    pub character_name: Option<String>,
    pub room_id: Option<String>,
}

impl PlayerSession {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: SessionState::Connecting,
            account_id: None,
            username: None,
            character_id: None,
            character_name: None,
            room_id: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn transition(&mut self, next: SessionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(&next) {
            return Err(TransitionError {
                from: self.state.name(),
                to: next.name(),
            });
        }
        tracing::trace!(session_id = %self.session_id, from = self.state.name(), to = next.name(), "session transition");
        self.state = next;
        Ok(())
    }

    pub fn authenticated(&mut self, account_id: i64, username: &str) -> Result<(), TransitionError> {
        self.transition(SessionState::CharacterSelect { account_id })?;
        self.account_id = Some(account_id);
        self.username = Some(username.to_string());
        Ok(())
    }

    pub fn enter_world(
        &mut self,
        character_id: i64,
        character_name: &str,
        room_id: &str,
    ) -> Result<(), TransitionError> {
        self.transition(SessionState::Playing)?;
        self.character_id = Some(character_id);
        self.character_name = Some(character_name.to_string());
        self.room_id = Some(room_id.to_string());
        Ok(())
    }

    /// Move to `Closed`. Returns the character that must be flushed, which
    /// exists only if the session had reached `Playing`.
    pub fn close(&mut self) -> Option<i64> {
        let was_playing = self.is_playing();
        self.state = SessionState::Closed;
        if was_playing {
            self.character_id
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed(session: &mut PlayerSession) {
        session
            .transition(SessionState::Authenticating(AuthStage::Username))
            .unwrap();
        session.authenticated(7, "Alice").unwrap();
    }

    #[test]
    fn new_session_is_connecting() {
        let session = PlayerSession::new(SessionId(1));
        assert_eq!(session.state(), &SessionState::Connecting);
        assert!(session.character_id.is_none());
    }

    #[test]
    fn full_lifecycle() {
        let mut session = PlayerSession::new(SessionId(1));
        authed(&mut session);
        assert_eq!(session.state(), &SessionState::CharacterSelect { account_id: 7 });
        assert_eq!(session.account_id, Some(7));

        session.enter_world(3, "Alice", "town_square").unwrap();
        assert!(session.is_playing());
        assert_eq!(session.room_id.as_deref(), Some("town_square"));

        assert_eq!(session.close(), Some(3));
        assert!(session.is_closed());
    }

    #[test]
    fn cannot_skip_authentication() {
        let mut session = PlayerSession::new(SessionId(2));
        let err = session.enter_world(1, "Bob", "x").unwrap_err();
        assert_eq!(err.from, "connecting");
        assert_eq!(err.to, "playing");
        assert!(session.character_id.is_none());
    }

    #[test]
    fn close_during_auth_flushes_nothing() {
        let mut session = PlayerSession::new(SessionId(3));
        session
            .transition(SessionState::Authenticating(AuthStage::Password {
                username: "Carol".into(),
            }))
            .unwrap();
        assert_eq!(session.close(), None);
        assert!(session.is_closed());
    }

    #[test]
    fn close_during_character_select_flushes_nothing() {
        let mut session = PlayerSession::new(SessionId(4));
        authed(&mut session);
        assert_eq!(session.close(), None);
    }

    #[test]
    fn closed_is_terminal() {
        let mut session = PlayerSession::new(SessionId(5));
        session.close();
        assert!(session
            .transition(SessionState::Authenticating(AuthStage::Username))
            .is_err());
        assert!(session.transition(SessionState::Closed).is_err());
    }

    #[test]
    fn auth_stages_may_repeat() {
        let state = SessionState::Authenticating(AuthStage::NewPassword {
            username: "Dana".into(),
        });
        assert!(state.can_transition_to(&SessionState::Authenticating(AuthStage::Username)));
        assert!(!state.can_transition_to(&SessionState::Playing));
    }

    #[test]
    fn output_disconnect_flag() {
        let out = SessionOutput::with_disconnect(SessionId(9), "Goodbye!");
        assert!(out.disconnect);
        assert!(!SessionOutput::new(SessionId(9), "hi").disconnect);
        assert_eq!(SessionId(9).to_string(), "#9");
    }
}
