//! Session driver lifecycle against the shipped world, with a store double
//! that records every save.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mud::persist::{AccountRef, CharacterSummary};
use mud::{
    run_session, CharacterState, CloseReason, GameSettings, PlayerStore, SessionSummary,
    SqliteStore, StoreError, WorldContent, WorldContext,
};
use net::channels::{OutputRx, SessionInputTx};
use net::{LineEvent, Outbound, SessionLink};
use session::SessionId;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Delegates to an in-memory SQLite store and records saves.
struct RecordingStore {
    inner: SqliteStore,
    saves: Mutex<Vec<(i64, String)>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::open_memory().unwrap(),
            saves: Mutex::new(Vec::new()),
        }
    }

    fn saves(&self) -> Vec<(i64, String)> {
        self.saves.lock().unwrap().clone()
    }
}

impl PlayerStore for RecordingStore {
    fn account_exists(&self, username: &str) -> Result<bool, StoreError> {
        self.inner.account_exists(username)
    }

    fn create_account(&self, username: &str, password: &str) -> Result<AccountRef, StoreError> {
        self.inner.create_account(username, password)
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<AccountRef, StoreError> {
        self.inner.authenticate(username, password)
    }

    fn list_characters(&self, account_id: i64) -> Result<Vec<CharacterSummary>, StoreError> {
        self.inner.list_characters(account_id)
    }

    fn create_character(&self, account_id: i64, state: &CharacterState) -> Result<i64, StoreError> {
        self.inner.create_character(account_id, state)
    }

    fn load_character(&self, character_id: i64) -> Result<CharacterState, StoreError> {
        self.inner.load_character(character_id)
    }

    fn save_character(&self, character_id: i64, state: &CharacterState) -> Result<(), StoreError> {
        self.saves
            .lock()
            .unwrap()
            .push((character_id, state.room_id.clone()));
        self.inner.save_character(character_id, state)
    }
}

struct Harness {
    ctx: Arc<WorldContext>,
    store: Arc<RecordingStore>,
    rx: OutputRx,
    seen: HashMap<SessionId, Vec<String>>,
    shutdown: watch::Sender<bool>,
}

struct Client {
    sid: SessionId,
    input: SessionInputTx,
    handle: JoinHandle<SessionSummary>,
}

impl Client {
    fn line(&self, text: &str) {
        self.input.send(LineEvent::Line(text.to_string())).unwrap();
    }

    async fn hang_up(self) -> SessionSummary {
        drop(self.input);
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .unwrap()
            .unwrap()
    }
}

impl Harness {
    fn new() -> Self {
        let content =
            WorldContent::load_dir(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("content"))
                .unwrap();
        let store = Arc::new(RecordingStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let shared: Arc<dyn PlayerStore> = store.clone();
        let ctx = WorldContext::new(content, shared, tx, GameSettings::default()).unwrap();
        let (shutdown, _) = watch::channel(false);
        Self {
            ctx: Arc::new(ctx),
            store,
            rx,
            seen: HashMap::new(),
            shutdown,
        }
    }

    fn connect(&self, id: u64) -> Client {
        let sid = SessionId(id);
        let (input, input_rx) = mpsc::unbounded_channel();
        let link = SessionLink {
            session_id: sid,
            peer_addr: "127.0.0.1:4000".parse().unwrap(),
            input: input_rx,
            output: self.ctx.output.clone(),
        };
        let handle = tokio::spawn(run_session(
            Arc::clone(&self.ctx),
            link,
            self.shutdown.subscribe(),
        ));
        Client { sid, input, handle }
    }

    /// Wait until `sid` receives a message containing `needle`.
    async fn expect(&mut self, sid: SessionId, needle: &str) -> String {
        if let Some(hit) = self
            .seen
            .get_mut(&sid)
            .and_then(|msgs| msgs.iter().position(|m| m.contains(needle)).map(|i| msgs.remove(i)))
        {
            return hit;
        }
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(10), self.rx.recv())
                .await
                .unwrap_or_else(|_| panic!("no {:?} for {}; saw {:?}", needle, sid, self.seen))
                .expect("output channel closed");
            let Outbound::To(out) = msg else { continue };
            if out.session_id == sid && out.text.contains(needle) {
                return out.text;
            }
            self.seen.entry(out.session_id).or_default().push(out.text);
        }
    }

    /// Account `name` with password "pw" and one character of the same name.
    fn seed_account(&self, name: &str) -> i64 {
        let account = self.store.create_account(name, "pw").unwrap();
        self.store
            .create_character(account.id, &CharacterState::new(name, "town_square"))
            .unwrap()
    }

    async fn log_in(&mut self, client: &Client, name: &str) {
        self.expect(client.sid, "Username:").await;
        client.line(name);
        self.expect(client.sid, "Password:").await;
        client.line("pw");
        self.expect(client.sid, "Choose a character:").await;
    }

    async fn play(&mut self, client: &Client, name: &str) {
        self.log_in(client, name).await;
        client.line("1");
        self.expect(client.sid, &format!("Welcome, {}!", name)).await;
    }
}

#[tokio::test]
async fn disconnect_mid_authentication_never_saves() {
    let mut h = Harness::new();
    h.seed_account("Ayla");
    let client = h.connect(1);

    h.expect(client.sid, "Username:").await;
    client.line("ayla");
    h.expect(client.sid, "Password:").await;

    let summary = client.hang_up().await;
    assert_eq!(summary.reason, CloseReason::Disconnected);
    assert!(!summary.reached_playing);
    assert_eq!(summary.saves, 0);
    assert!(h.store.saves().is_empty());
    assert_eq!(h.ctx.sessions.active_count(), 0);
}

#[tokio::test]
async fn disconnect_at_character_select_never_saves() {
    let mut h = Harness::new();
    h.seed_account("Ayla");
    let client = h.connect(1);
    h.log_in(&client, "Ayla").await;
    assert_eq!(h.ctx.sessions.active_count(), 1);

    let summary = client.hang_up().await;
    assert!(!summary.reached_playing);
    assert!(h.store.saves().is_empty());
    assert_eq!(h.ctx.sessions.active_count(), 0);
}

#[tokio::test]
async fn playing_session_saves_once_and_leaves_the_room() {
    let mut h = Harness::new();
    let character_id = h.seed_account("Ayla");
    let client = h.connect(1);
    h.play(&client, "Ayla").await;
    assert_eq!(h.ctx.world.players_in("town_square").unwrap().len(), 1);

    client.line("north");
    h.expect(client.sid, "Market Street").await;

    let summary = client.hang_up().await;
    assert_eq!(summary.reason, CloseReason::Disconnected);
    assert!(summary.reached_playing);
    assert_eq!(
        h.store.saves(),
        vec![(character_id, "market_street".to_string())]
    );
    assert!(h.ctx.world.players_in("market_street").unwrap().is_empty());
    assert!(h.ctx.sessions.online_characters().is_empty());
}

#[tokio::test]
async fn explicit_save_then_quit() {
    let mut h = Harness::new();
    h.seed_account("Ayla");
    let client = h.connect(1);
    h.play(&client, "Ayla").await;

    client.line("save");
    h.expect(client.sid, "Saved.").await;
    client.line("quit");
    h.expect(client.sid, "Goodbye.").await;

    let summary = client.hang_up().await;
    assert_eq!(summary.reason, CloseReason::Quit);
    assert_eq!(summary.saves, 2);
    assert_eq!(h.store.saves().len(), 2);
}

#[tokio::test]
async fn second_login_to_the_same_account_is_refused() {
    let mut h = Harness::new();
    h.seed_account("Ayla");
    let first = h.connect(1);
    h.play(&first, "Ayla").await;

    let second = h.connect(2);
    h.expect(second.sid, "Username:").await;
    second.line("Ayla");
    h.expect(second.sid, "Password:").await;
    second.line("pw");
    let refusal = h.expect(second.sid, "already playing").await;
    assert!(refusal.ends_with("Username:"));

    let summary = second.hang_up().await;
    assert!(!summary.reached_playing);
    assert_eq!(h.ctx.sessions.online_characters(), vec!["Ayla".to_string()]);

    first.line("quit");
    first.hang_up().await;
    assert_eq!(h.store.saves().len(), 1);
}

#[tokio::test]
async fn players_see_each_other_arrive_and_talk() {
    let mut h = Harness::new();
    h.seed_account("Ayla");
    h.seed_account("Bram");
    let ayla = h.connect(1);
    let bram = h.connect(2);
    h.play(&ayla, "Ayla").await;
    h.play(&bram, "Bram").await;

    h.expect(ayla.sid, "Bram has entered the game.").await;
    bram.line("'well met");
    h.expect(ayla.sid, "Bram says, \"well met\"").await;
    ayla.line("who");
    let who = h.expect(ayla.sid, "Players online (2)").await;
    assert!(who.contains("  Ayla") && who.contains("  Bram"));

    bram.line("quit");
    h.expect(ayla.sid, "Bram has left the game.").await;
    bram.hang_up().await;
    ayla.hang_up().await;
}
