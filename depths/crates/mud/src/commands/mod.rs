//! Verb registry and the handler contract.
//!
//! Handlers are plain functions registered once at startup. They run
//! synchronously against the shared context and the caller's own character;
//! anything that needs I/O (saving, closing) is returned as an [`Outcome`]
//! for the session driver to carry out.

use std::collections::BTreeMap;

use session::SessionId;

use crate::character::CharacterState;
use crate::context::WorldContext;
use crate::error::GameError;
use crate::fatigue::ActorId;
use crate::parser::{aliases_for, ParsedCommand};

pub mod combat;
pub mod comms;
pub mod info;
pub mod items;
pub mod movement;
pub mod trade;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    /// Persist the character, then reply.
    Save,
    /// Flush and close the session.
    Quit,
}

impl Outcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Outcome::Reply(text.into())
    }
}

/// What a handler may touch.
pub struct CommandCtx<'a> {
    pub world: &'a WorldContext,
    pub session_id: SessionId,
    pub character: &'a mut CharacterState,
}

impl CommandCtx<'_> {
    pub fn actor(&self) -> ActorId {
        ActorId::Player(self.character.name.clone())
    }

    pub fn room_id(&self) -> &str {
        &self.character.room_id
    }

    /// Tell everyone else in the caller's room.
    pub fn notify_room(&self, text: &str) {
        self.world
            .notify_room(&self.character.room_id, Some(self.session_id), text);
    }
}

pub type HandlerFn = fn(&mut CommandCtx<'_>, &ParsedCommand) -> Result<Outcome, GameError>;

pub struct VerbSpec {
    pub name: &'static str,
    pub usage: &'static str,
    /// Shown when a verb that needs an argument gets none.
    pub prompt: &'static str,
    pub needs_args: bool,
    pub summary: &'static str,
    pub handler: HandlerFn,
}

/// How a parsed line will be handled.
pub enum Classified<'a> {
    Verb(&'a VerbSpec),
    /// Not a known verb: the line is said to the room.
    Chat,
}

#[derive(Default)]
pub struct CommandRegistry {
    verbs: BTreeMap<&'static str, VerbSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: VerbSpec) {
        if self.verbs.contains_key(spec.name) {
            tracing::warn!(verb = spec.name, "verb registered twice, replacing");
        }
        self.verbs.insert(spec.name, spec);
    }

    pub fn get(&self, verb: &str) -> Option<&VerbSpec> {
        self.verbs.get(verb)
    }

    pub fn verbs(&self) -> impl Iterator<Item = &VerbSpec> {
        self.verbs.values()
    }

    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Decide how `cmd` is handled without running it. A known verb that
    /// needs an argument and got none is a parameter error, never chat.
    pub fn classify(&self, cmd: &ParsedCommand) -> Result<Classified<'_>, GameError> {
        match self.verbs.get(cmd.verb.as_str()) {
            Some(spec) if spec.needs_args && !cmd.has_args() => Err(GameError::InvalidParameters {
                verb: spec.name,
                prompt: spec.prompt,
            }),
            Some(spec) => Ok(Classified::Verb(spec)),
            None => Ok(Classified::Chat),
        }
    }

    pub fn dispatch(&self, ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
        match self.classify(cmd)? {
            Classified::Verb(spec) => (spec.handler)(ctx, cmd),
            Classified::Chat => comms::chat(ctx, cmd),
        }
    }

    /// Help text for one verb, or the whole table.
    pub fn help(&self, verb: Option<&str>) -> Result<String, GameError> {
        if let Some(verb) = verb {
            let canonical = crate::parser::canonical_verb(verb);
            let spec = self
                .get(&canonical)
                .ok_or_else(|| GameError::not_found(format!("No help for '{}'.", verb)))?;
            let aliases = aliases_for(spec.name);
            let mut text = format!("{}\n  {}", spec.usage, spec.summary);
            if !aliases.is_empty() {
                text.push_str(&format!("\n  Aliases: {}", aliases.join(", ")));
            }
            return Ok(text);
        }

        let mut lines = vec!["Commands:".to_string()];
        for spec in self.verbs() {
            lines.push(format!("  {:<10} {}", spec.name, spec.summary));
        }
        lines.push("Type 'help <command>' for details.".to_string());
        Ok(lines.join("\n"))
    }

    /// Every built-in verb.
    pub fn standard() -> Self {
        let mut registry = Self::new();

        registry.register(simple("look", "look [target]", "Look around, or at something.", info::look));
        registry.register(simple("exits", "exits", "List the obvious exits.", info::exits));
        registry.register(simple("who", "who", "List players online.", info::who));
        registry.register(simple("stats", "stats", "Show your character sheet.", info::stats));
        registry.register(with_arg("route", "route <room>", "Route to where?", "Shortest way to a room.", info::route));
        registry.register(simple("nearby", "nearby", "Rooms within a short walk.", info::nearby));
        registry.register(simple("help", "help [command]", "Show help.", info::help));
        registry.register(simple("save", "save", "Save your character.", info::save));
        registry.register(simple("quit", "quit", "Save and leave the game.", info::quit));

        for direction in crate::parser::DIRECTIONS {
            registry.register(simple(direction, direction, "Walk in that direction.", movement::walk));
        }
        registry.register(with_arg("go", "go <direction>", "Go where?", "Walk through the named exit.", movement::go));
        registry.register(simple("flee", "flee", "Run through the first open exit.", movement::flee));

        registry.register(with_arg("get", "get <item>", "Get what?", "Pick something up.", items::get));
        registry.register(with_arg("drop", "drop <item>", "Drop what?", "Drop something you carry.", items::drop));
        registry.register(simple("inventory", "inventory", "List what you carry.", items::inventory));
        registry.register(with_arg("equip", "equip <item>", "Equip what?", "Wield a weapon or wear armor.", items::equip));
        registry.register(with_arg("unequip", "unequip <item>", "Unequip what?", "Put equipment back in your pack.", items::unequip));

        registry.register(with_arg("attack", "attack <target>", "Attack whom?", "Attack a creature.", combat::attack));

        registry.register(simple("list", "list [vendor]", "See what a vendor sells.", trade::list));
        registry.register(with_arg("buy", "buy <item> [from <vendor>]", "Buy what?", "Buy from a vendor.", trade::buy));
        registry.register(with_arg("sell", "sell <item> [to <vendor>]", "Sell what?", "Sell to a vendor.", trade::sell));

        registry.register(with_arg("say", "say <text>", "Say what?", "Speak to the room.", comms::say));
        registry.register(with_arg("emote", "emote <action>", "Emote what?", "Act something out.", comms::emote));

        registry
    }
}

fn simple(name: &'static str, usage: &'static str, summary: &'static str, handler: HandlerFn) -> VerbSpec {
    VerbSpec {
        name,
        usage,
        prompt: "",
        needs_args: false,
        summary,
        handler,
    }
}

fn with_arg(
    name: &'static str,
    usage: &'static str,
    prompt: &'static str,
    summary: &'static str,
    handler: HandlerFn,
) -> VerbSpec {
    VerbSpec {
        name,
        usage,
        prompt,
        needs_args: true,
        summary,
        handler,
    }
}
