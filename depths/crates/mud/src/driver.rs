//! Per-connection session driver.
//!
//! One task per connection owns a [`PlayerSession`] and walks it through
//! login, character selection and play. The task only suspends while
//! waiting for input, a timer, or a store call; command handling itself
//! runs to completion before the next line is read.

use std::sync::Arc;
use std::time::Instant as StdInstant;

use net::channels::send_to;
use net::rate_limiter::CommandThrottle;
use net::{LineEvent, Outbound, OutputTx, SessionLink};
use observability::CommandTiming;
use session::{AuthStage, PlayerSession, SessionId, SessionOutput, SessionState};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::character::CharacterState;
use crate::commands::info::render_room;
use crate::commands::{CommandCtx, Outcome};
use crate::context::WorldContext;
use crate::error::GameError;
use crate::parser::{canonical_verb, parse_line, ParsedInput};
use crate::persist::{blocking, CharacterSummary, StoreError};

pub const BANNER: &str = "Welcome to the Depths.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Quit,
    Disconnected,
    IdleTimeout,
    Shutdown,
}

impl CloseReason {
    /// The error a close forced by the connection is reported as.
    pub fn error(self) -> Option<GameError> {
        match self {
            CloseReason::Disconnected | CloseReason::IdleTimeout => Some(GameError::ConnectionLost),
            CloseReason::Quit | CloseReason::Shutdown => None,
        }
    }
}

/// What happened over a session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub reason: CloseReason,
    pub reached_playing: bool,
    pub saves: usize,
}

enum Flow {
    Continue,
    Close(CloseReason),
}

/// Capitalise a typed name: first letter upper, the rest lower.
pub fn capitalize_name(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// A lone `quit` (or an alias of it) ends the session from any prompt.
fn is_quit(line: &str) -> bool {
    let mut words = line.split_whitespace();
    matches!((words.next(), words.next()), (Some(word), None) if canonical_verb(word) == "quit")
}

/// Names are 2 to 20 ASCII letters.
pub fn is_valid_name(name: &str) -> bool {
    (2..=20).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphabetic())
}

struct Driver {
    ctx: Arc<WorldContext>,
    output: OutputTx,
    session: PlayerSession,
    character: Option<CharacterState>,
    roster: Vec<CharacterSummary>,
    throttle: CommandThrottle,
    reached_playing: bool,
    saves: usize,
}

impl Driver {
    fn sid(&self) -> SessionId {
        self.session.session_id
    }

    fn send(&self, text: impl Into<String>) {
        send_to(&self.output, self.sid(), text);
    }

    fn report(&self, err: &GameError) {
        tracing::debug!(session_id = %self.sid(), kind = err.kind(), "{}", err);
        self.send(err.to_string());
    }

    fn set_stage(&mut self, stage: AuthStage) {
        if let Err(e) = self.session.transition(SessionState::Authenticating(stage)) {
            tracing::error!(session_id = %self.sid(), "{}", e);
        }
    }

    fn restart_login(&mut self, message: &str) {
        self.send(format!("{}\nUsername:", message));
        self.set_stage(AuthStage::Username);
    }

    fn store_failed(&mut self, err: StoreError) {
        tracing::warn!(session_id = %self.sid(), "store error during login: {}", err);
        let err = GameError::PersistenceFailure(format!("The account service is unavailable: {}.", err));
        self.report(&err);
        self.restart_login("Please try again.");
    }

    fn greet(&mut self) {
        self.send(format!("{}\nUsername:", BANNER));
        self.set_stage(AuthStage::Username);
    }

    async fn handle_line(&mut self, line: String) -> Flow {
        match self.session.state().clone() {
            SessionState::Connecting => {
                self.greet();
                Flow::Continue
            }
            SessionState::Authenticating(_) | SessionState::CharacterSelect { .. } if is_quit(&line) => {
                Flow::Close(CloseReason::Quit)
            }
            SessionState::Authenticating(stage) => {
                self.handle_auth(stage, line.trim()).await;
                Flow::Continue
            }
            SessionState::CharacterSelect { account_id } => {
                self.handle_select(account_id, line.trim()).await;
                Flow::Continue
            }
            SessionState::Playing => self.handle_command(&line).await,
            SessionState::Closed => Flow::Close(CloseReason::Quit),
        }
    }

    async fn handle_auth(&mut self, stage: AuthStage, input: &str) {
        match stage {
            AuthStage::Username => {
                if input.is_empty() {
                    self.send("Username:");
                    return;
                }
                let username = capitalize_name(input);
                if !is_valid_name(&username) {
                    self.send("Names are 2 to 20 letters.\nUsername:");
                    return;
                }
                let lookup = username.clone();
                match blocking(&self.ctx.store, move |s| s.account_exists(&lookup)).await {
                    Ok(true) => {
                        self.send("Password:");
                        self.set_stage(AuthStage::Password { username });
                    }
                    Ok(false) => {
                        self.send(format!("New account '{}'. Choose a password:", username));
                        self.set_stage(AuthStage::NewPassword { username });
                    }
                    Err(e) => self.store_failed(e),
                }
            }
            AuthStage::Password { username } => {
                if input.is_empty() {
                    self.send("Password:");
                    return;
                }
                let (user, pass) = (username.clone(), input.to_string());
                match blocking(&self.ctx.store, move |s| s.authenticate(&user, &pass)).await {
                    Ok(account) => self.logged_in(account.id, &account.username).await,
                    Err(StoreError::InvalidCredentials) => {
                        tracing::info!(session_id = %self.sid(), %username, "failed login");
                        self.restart_login("Wrong password.");
                    }
                    Err(e) => self.store_failed(e),
                }
            }
            AuthStage::NewPassword { username } => {
                if input.is_empty() {
                    self.send("Choose a password:");
                    return;
                }
                self.send("Confirm password:");
                self.set_stage(AuthStage::ConfirmPassword {
                    username,
                    password: input.to_string(),
                });
            }
            AuthStage::ConfirmPassword { username, password } => {
                if input != password {
                    self.restart_login("Passwords do not match.");
                    return;
                }
                let (user, pass) = (username.clone(), password);
                match blocking(&self.ctx.store, move |s| s.create_account(&user, &pass)).await {
                    Ok(account) => {
                        self.send("Account created.");
                        self.logged_in(account.id, &account.username).await;
                    }
                    Err(StoreError::AccountExists) => {
                        self.restart_login(&format!("The name {} was just taken.", username));
                    }
                    Err(e) => self.store_failed(e),
                }
            }
        }
    }

    async fn logged_in(&mut self, account_id: i64, username: &str) {
        if !self.ctx.sessions.claim_account(self.sid(), account_id, username) {
            tracing::info!(session_id = %self.sid(), username, "duplicate login refused");
            self.restart_login("That account is already playing.");
            return;
        }
        if let Err(e) = self.session.authenticated(account_id, username) {
            tracing::error!(session_id = %self.sid(), "{}", e);
            return;
        }
        tracing::info!(session_id = %self.sid(), account_id, username, "logged in");
        self.show_roster(account_id).await;
    }

    async fn show_roster(&mut self, account_id: i64) {
        match blocking(&self.ctx.store, move |s| s.list_characters(account_id)).await {
            Ok(roster) => self.roster = roster,
            Err(e) => {
                tracing::warn!(session_id = %self.sid(), "cannot list characters: {}", e);
                self.report(&GameError::PersistenceFailure(format!("Could not load your characters: {}.", e)));
                self.roster.clear();
            }
        }

        let mut lines = vec!["Choose a character:".to_string()];
        for (i, c) in self.roster.iter().enumerate() {
            lines.push(format!("  {}. {} (level {})", i + 1, c.name, c.level));
        }
        lines.push("  new <name> - create a character".to_string());
        self.send(lines.join("\n"));
    }

    async fn handle_select(&mut self, account_id: i64, input: &str) {
        if let Ok(n) = input.parse::<usize>() {
            let Some(chosen) = n.checked_sub(1).and_then(|i| self.roster.get(i)).cloned() else {
                self.send("No such character. Choose a number or 'new <name>'.");
                return;
            };
            let id = chosen.id;
            match blocking(&self.ctx.store, move |s| s.load_character(id)).await {
                Ok(state) => self.enter_world(id, state),
                Err(e) => {
                    tracing::warn!(session_id = %self.sid(), character_id = id, "load failed: {}", e);
                    self.report(&GameError::PersistenceFailure(format!("Could not load {}: {}.", chosen.name, e)));
                }
            }
            return;
        }

        let mut words = input.split_whitespace();
        match (words.next(), words.next()) {
            (Some(cmd), Some(raw_name)) if cmd.eq_ignore_ascii_case("new") => {
                let name = capitalize_name(raw_name);
                if !is_valid_name(&name) {
                    self.send("Names are 2 to 20 letters.");
                    return;
                }
                let state = CharacterState::new(name.clone(), self.ctx.settings.start_room.clone());
                let initial = state.clone();
                match blocking(&self.ctx.store, move |s| s.create_character(account_id, &initial)).await {
                    Ok(id) => {
                        tracing::info!(session_id = %self.sid(), character_id = id, %name, "character created");
                        self.enter_world(id, state);
                    }
                    Err(StoreError::NameTaken(_)) => self.send(format!("The name {} is taken.", name)),
                    Err(e) => {
                        tracing::warn!(session_id = %self.sid(), "create character failed: {}", e);
                        self.report(&GameError::PersistenceFailure(format!("Could not create {}: {}.", name, e)));
                    }
                }
            }
            _ => self.send("Choose a number or 'new <name>'."),
        }
    }

    fn enter_world(&mut self, character_id: i64, mut state: CharacterState) {
        if !self.ctx.world.contains_room(&state.room_id) {
            tracing::warn!(character = %state.name, room = %state.room_id, "saved room no longer exists");
            state.room_id = self.ctx.settings.start_room.clone();
        }
        if let Err(e) = self.session.enter_world(character_id, &state.name, &state.room_id) {
            tracing::error!(session_id = %self.sid(), "{}", e);
            return;
        }
        self.reached_playing = true;
        self.ctx.sessions.set_character(self.sid(), &state.name);

        if let Err(e) = self.ctx.world.place_player(&state.room_id, self.sid(), &state.name) {
            tracing::error!(session_id = %self.sid(), "cannot place player: {}", e);
        }
        self.ctx.notify_room(
            &state.room_id,
            Some(self.sid()),
            &format!("{} has entered the game.", state.name),
        );
        tracing::info!(session_id = %self.sid(), character = %state.name, room = %state.room_id, "entered world");

        let view = render_room(&self.ctx, &state.room_id, self.sid()).unwrap_or_default();
        self.send(format!("Welcome, {}!\n{}", state.name, view));
        self.character = Some(state);
    }

    async fn handle_command(&mut self, line: &str) -> Flow {
        let ctx = Arc::clone(&self.ctx);
        let session_id = self.sid();
        let Some(character) = self.character.as_mut() else {
            return Flow::Close(CloseReason::Quit);
        };

        let cmd = match parse_line(line) {
            ParsedInput::Empty => {
                match render_room(&ctx, &character.room_id, session_id) {
                    Ok(view) => self.send(view),
                    Err(e) => self.report(&e),
                }
                return Flow::Continue;
            }
            ParsedInput::Command(cmd) => cmd,
        };

        let started = StdInstant::now();
        let result = {
            let mut cctx = CommandCtx {
                world: &ctx,
                session_id,
                character,
            };
            ctx.commands.dispatch(&mut cctx, &cmd)
        };
        CommandTiming::new(session_id.0, cmd.verb.as_str(), started.elapsed()).log();

        if let Some(character) = &self.character {
            self.session.room_id = Some(character.room_id.clone());
        }

        match result {
            Ok(Outcome::Reply(text)) => self.send(text),
            Ok(Outcome::Save) => {
                if self.save().await {
                    self.send("Saved.");
                }
            }
            Ok(Outcome::Quit) => return Flow::Close(CloseReason::Quit),
            Err(e) if e.is_fatal() => {
                self.report(&e);
                return Flow::Close(CloseReason::Disconnected);
            }
            Err(e) => self.report(&e),
        }
        Flow::Continue
    }

    /// Persist the character. Failures are reported and play continues.
    async fn save(&mut self) -> bool {
        let (Some(id), Some(state)) = (self.session.character_id, self.character.clone()) else {
            return false;
        };
        match blocking(&self.ctx.store, move |s| s.save_character(id, &state)).await {
            Ok(()) => {
                self.saves += 1;
                tracing::debug!(session_id = %self.sid(), character_id = id, "character saved");
                true
            }
            Err(e) => {
                tracing::warn!(session_id = %self.sid(), character_id = id, "save failed: {}", e);
                self.report(&GameError::PersistenceFailure(format!(
                    "Your character could not be saved: {}.",
                    e
                )));
                false
            }
        }
    }

    async fn close(mut self, reason: CloseReason) -> SessionSummary {
        let flush = self.session.close();
        if flush.is_some() {
            if let Some(character) = &self.character {
                if let Err(e) = self.ctx.world.remove_player(&character.room_id, self.sid()) {
                    tracing::warn!(session_id = %self.sid(), room = %character.room_id, "cannot remove player: {}", e);
                }
                self.ctx.notify_room(
                    &character.room_id,
                    None,
                    &format!("{} has left the game.", character.name),
                );
            }
            self.save().await;
        }
        self.ctx.sessions.release(self.sid());
        if let Some(err) = reason.error() {
            tracing::debug!(session_id = %self.sid(), kind = err.kind(), "{}", err);
        }

        let farewell = match reason {
            CloseReason::Quit => Some("Goodbye."),
            CloseReason::IdleTimeout => Some("Idle too long; disconnecting."),
            CloseReason::Shutdown => Some("The server is shutting down."),
            CloseReason::Disconnected => None,
        };
        if let Some(text) = farewell {
            let _ = self
                .output
                .send(Outbound::To(SessionOutput::with_disconnect(self.sid(), text)));
        }

        tracing::info!(
            session_id = %self.sid(),
            ?reason,
            reached_playing = self.reached_playing,
            saves = self.saves,
            "session closed"
        );
        SessionSummary {
            session_id: self.sid(),
            reason,
            reached_playing: self.reached_playing,
            saves: self.saves,
        }
    }
}

/// Drive one connection until it quits, drops, idles out or the server
/// shuts down.
pub async fn run_session(
    ctx: Arc<WorldContext>,
    link: SessionLink,
    mut shutdown_rx: watch::Receiver<bool>,
) -> SessionSummary {
    let SessionLink {
        session_id,
        peer_addr,
        mut input,
        output,
    } = link;
    tracing::debug!(%session_id, %peer_addr, "session started");

    let settings = ctx.settings.clone();
    let mut driver = Driver {
        ctx,
        output,
        session: PlayerSession::new(session_id),
        character: None,
        roster: Vec::new(),
        throttle: CommandThrottle::new(settings.max_commands_per_second),
        reached_playing: false,
        saves: 0,
    };
    driver.greet();

    let mut autosave = tokio::time::interval_at(
        Instant::now() + settings.autosave_interval,
        settings.autosave_interval,
    );
    autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_input = Instant::now();

    let reason = loop {
        let playing = driver.session.is_playing();
        tokio::select! {
            event = input.recv() => {
                last_input = Instant::now();
                match event {
                    None => break CloseReason::Disconnected,
                    Some(LineEvent::Oversized(len)) => {
                        driver.report(&GameError::Protocol(format!(
                            "Input too long ({} bytes); line discarded.",
                            len
                        )));
                    }
                    Some(LineEvent::Line(line)) => {
                        if !driver.throttle.try_consume() {
                            driver.send("You are sending commands too quickly.");
                            continue;
                        }
                        if let Flow::Close(reason) = driver.handle_line(line).await {
                            break reason;
                        }
                    }
                }
            }
            _ = tokio::time::sleep_until(last_input + settings.idle_timeout) => {
                tracing::info!(%session_id, "idle timeout");
                break CloseReason::IdleTimeout;
            }
            _ = autosave.tick(), if playing => {
                driver.save().await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break CloseReason::Shutdown;
                }
            }
        }
    };

    driver.close(reason).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::context;
    use net::channels::{OutputRx, SessionInputTx};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    struct Client {
        sid: SessionId,
        input: SessionInputTx,
        rx: OutputRx,
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<SessionSummary>,
        seen: Vec<String>,
    }

    impl Client {
        fn connect(ctx: Arc<WorldContext>, rx: OutputRx) -> Self {
            let sid = SessionId(1);
            let (input_tx, input_rx) = mpsc::unbounded_channel();
            let (shutdown, shutdown_rx) = watch::channel(false);
            let peer_addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
            let link = SessionLink {
                session_id: sid,
                peer_addr,
                input: input_rx,
                output: ctx.output.clone(),
            };
            let handle = tokio::spawn(run_session(ctx, link, shutdown_rx));
            Self {
                sid,
                input: input_tx,
                rx,
                shutdown,
                handle,
                seen: Vec::new(),
            }
        }

        fn line(&self, text: &str) {
            self.input.send(LineEvent::Line(text.to_string())).unwrap();
        }

        /// Wait until some message to this session contains `needle`.
        async fn expect(&mut self, needle: &str) -> String {
            loop {
                let msg = tokio::time::timeout(Duration::from_secs(10), self.rx.recv())
                    .await
                    .unwrap_or_else(|_| panic!("timed out waiting for {:?}; saw {:?}", needle, self.seen))
                    .expect("output channel closed");
                if let Outbound::To(out) = msg {
                    if out.session_id == self.sid {
                        self.seen.push(out.text.clone());
                        if out.text.contains(needle) {
                            return out.text;
                        }
                    }
                }
            }
        }

        async fn finish(self) -> SessionSummary {
            tokio::time::timeout(Duration::from_secs(10), self.handle)
                .await
                .unwrap()
                .unwrap()
        }
    }

    async fn create_and_play(client: &mut Client) {
        client.expect("Username:").await;
        client.line("ayla");
        client.expect("Choose a password").await;
        client.line("secret");
        client.expect("Confirm password").await;
        client.line("secret");
        client.expect("new <name>").await;
        client.line("new ayla");
        client.expect("Welcome, Ayla!").await;
    }

    #[tokio::test]
    async fn new_account_reaches_play_and_quits() {
        let (ctx, rx) = context();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        create_and_play(&mut client).await;

        assert_eq!(ctx.sessions.online_characters(), vec!["Ayla".to_string()]);
        assert_eq!(ctx.world.players_in("town_square").unwrap().len(), 1);

        client.line("north");
        client.expect("Market").await;
        client.line("quit");
        client.expect("Goodbye.").await;

        let summary = client.finish().await;
        assert_eq!(summary.reason, CloseReason::Quit);
        assert!(summary.reached_playing);
        assert_eq!(summary.saves, 1);
        assert_eq!(ctx.sessions.active_count(), 0);
        assert!(ctx.world.players_in("market").unwrap().is_empty());

        let account = ctx.store.authenticate("Ayla", "secret").unwrap();
        let roster = ctx.store.list_characters(account.id).unwrap();
        let saved = ctx.store.load_character(roster[0].id).unwrap();
        assert_eq!(saved.room_id, "market");
    }

    #[tokio::test]
    async fn wrong_password_returns_to_username() {
        let (ctx, rx) = context();
        ctx.store.create_account("Bram", "hunter2").unwrap();
        let mut client = Client::connect(Arc::clone(&ctx), rx);

        client.expect("Username:").await;
        client.line("Bram");
        client.expect("Password:").await;
        client.line("wrong");
        let text = client.expect("Wrong password.").await;
        assert!(text.ends_with("Username:"));

        client.line("bram");
        client.expect("Password:").await;
        client.line("hunter2");
        client.expect("Choose a character:").await;

        drop(client.input);
        let summary = client.handle.await.unwrap();
        assert_eq!(summary.reason, CloseReason::Disconnected);
        assert!(!summary.reached_playing);
        assert_eq!(summary.saves, 0);
        assert_eq!(ctx.sessions.active_count(), 0);
    }

    #[tokio::test]
    async fn mismatched_confirmation_starts_over() {
        let (ctx, rx) = context();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        client.expect("Username:").await;
        client.line("Cora");
        client.expect("Choose a password").await;
        client.line("one");
        client.expect("Confirm password").await;
        client.line("two");
        client.expect("Passwords do not match.").await;
        assert!(!ctx.store.account_exists("Cora").unwrap());
    }

    #[tokio::test]
    async fn oversized_and_blank_lines_while_playing() {
        let (ctx, rx) = context();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        create_and_play(&mut client).await;

        client.input.send(LineEvent::Oversized(5000)).unwrap();
        client.expect("Input too long (5000 bytes)").await;
        client.line("");
        client.expect("Town Square").await;
        client.line("get");
        client.expect("Get what?").await;
    }

    #[tokio::test]
    async fn shutdown_saves_playing_sessions() {
        let (ctx, rx) = context();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        create_and_play(&mut client).await;

        client.shutdown.send(true).unwrap();
        client.expect("shutting down").await;
        let summary = client.finish().await;
        assert_eq!(summary.reason, CloseReason::Shutdown);
        assert_eq!(summary.saves, 1);
    }
    #[tokio::test]
    async fn quit_at_username_prompt_closes_without_saving() {
        let (ctx, rx) = context();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        client.expect("Username:").await;
        client.line("quit");
        client.expect("Goodbye.").await;

        let summary = client.finish().await;
        assert_eq!(summary.reason, CloseReason::Quit);
        assert!(!summary.reached_playing);
        assert_eq!(summary.saves, 0);
        assert!(!ctx.store.account_exists("Quit").unwrap());
    }

    #[tokio::test]
    async fn quit_at_password_prompt_closes() {
        let (ctx, rx) = context();
        ctx.store.create_account("Bram", "hunter2").unwrap();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        client.expect("Username:").await;
        client.line("bram");
        client.expect("Password:").await;
        client.line("Q");
        client.expect("Goodbye.").await;

        let summary = client.finish().await;
        assert_eq!(summary.reason, CloseReason::Quit);
        assert_eq!(summary.saves, 0);
    }

    #[tokio::test]
    async fn quit_at_character_select_releases_the_account() {
        let (ctx, rx) = context();
        ctx.store.create_account("Bram", "hunter2").unwrap();
        let mut client = Client::connect(Arc::clone(&ctx), rx);
        client.expect("Username:").await;
        client.line("bram");
        client.expect("Password:").await;
        client.line("hunter2");
        client.expect("Choose a character:").await;
        assert_eq!(ctx.sessions.active_count(), 1);

        client.line("q");
        client.expect("Goodbye.").await;
        let summary = client.finish().await;
        assert_eq!(summary.reason, CloseReason::Quit);
        assert!(!summary.reached_playing);
        assert_eq!(summary.saves, 0);
        assert_eq!(ctx.sessions.active_count(), 0);
    }

    #[test]
    fn quit_detection() {
        assert!(is_quit("quit"));
        assert!(is_quit("  Q "));
        assert!(!is_quit("quitter"));
        assert!(!is_quit("quit now"));
        assert!(!is_quit(""));
    }

    #[test]
    fn dropped_connections_report_connection_lost() {
        for reason in [CloseReason::Disconnected, CloseReason::IdleTimeout] {
            let err = reason.error().unwrap();
            assert_eq!(err, GameError::ConnectionLost);
            assert!(err.is_fatal());
        }
        assert_eq!(CloseReason::Quit.error(), None);
        assert_eq!(CloseReason::Shutdown.error(), None);
    }

    #[test]
    fn names_are_capitalised() {
        assert_eq!(capitalize_name("ayLA"), "Ayla");
        assert_eq!(capitalize_name("  bram "), "Bram");
        assert_eq!(capitalize_name(""), "");
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_name("Ayla"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name("Ay la"));
        assert!(!is_valid_name("Robert'); DROP"));
        assert!(!is_valid_name(&"x".repeat(21)));
    }
}
