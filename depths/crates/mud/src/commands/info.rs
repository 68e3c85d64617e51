use std::cmp::Ordering;

use session::SessionId;

use super::{CommandCtx, Outcome};
use crate::content::is_external;
use crate::context::WorldContext;
use crate::error::GameError;
use crate::parser::{canonical_direction, ParsedCommand, DIRECTIONS};
use crate::resolve::resolve;
use crate::world::NpcInstance;

/// Radius, in edge weight, of the `nearby` listing.
pub const NEARBY_RADIUS: u32 = 3;

/// Sort key putting compass directions first, in their usual order.
fn direction_order(a: &str, b: &str) -> Ordering {
    let rank = |d: &str| DIRECTIONS.iter().position(|x| *x == d).unwrap_or(DIRECTIONS.len());
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

/// Exits a player can see, with a `(locked)` marker where it applies.
pub fn visible_exits(world: &WorldContext, room_id: &str) -> Result<Vec<String>, GameError> {
    let room = world.world.room(room_id)?;
    let locked = room.snapshot().locked_exits;
    let graph = world.graph();

    let mut directions: Vec<&String> = room
        .exits
        .iter()
        .filter(|(dir, target)| {
            is_external(target)
                || !graph
                    .exit(room_id, dir)
                    .ok()
                    .flatten()
                    .is_some_and(|edge| edge.hidden)
        })
        .map(|(dir, _)| dir)
        .collect();
    directions.sort_by(|a, b| direction_order(a, b));

    Ok(directions
        .into_iter()
        .map(|dir| {
            if locked.contains_key(dir) {
                format!("{} (locked)", dir)
            } else {
                dir.clone()
            }
        })
        .collect())
}

/// The room as `viewer` sees it.
pub fn render_room(world: &WorldContext, room_id: &str, viewer: SessionId) -> Result<String, GameError> {
    let room = world.world.room(room_id)?;
    let mut lines = vec![room.title.clone()];

    if room.light_level <= 0 {
        lines.push("It is too dark to make anything out.".to_string());
    } else {
        if !room.description.is_empty() {
            lines.push(room.description.clone());
        }

        let contents = room.snapshot();
        if !contents.items.is_empty() {
            let names: Vec<&str> = contents
                .items
                .iter()
                .map(|id| world.catalog.item_name(id))
                .collect();
            lines.push(format!("You see: {}.", names.join(", ")));
        }
        if !contents.npcs.is_empty() {
            let names: Vec<&str> = contents.npcs.iter().map(|n| n.name.as_str()).collect();
            lines.push(format!("Here: {}.", names.join(", ")));
        }
        let others: Vec<&str> = contents
            .players
            .iter()
            .filter(|(sid, _)| **sid != viewer)
            .map(|(_, name)| name.as_str())
            .collect();
        if !others.is_empty() {
            lines.push(format!("Also here: {}.", others.join(", ")));
        }
    }

    let exits = visible_exits(world, room_id)?;
    if exits.is_empty() {
        lines.push("There are no obvious exits.".to_string());
    } else {
        lines.push(format!("Exits: {}", exits.join(", ")));
    }
    Ok(lines.join("\n"))
}

enum LookTarget {
    Item(String),
    Npc(NpcInstance),
    Player(String),
}

pub fn look(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    if !cmd.has_args() {
        return Ok(Outcome::Reply(render_room(ctx.world, ctx.room_id(), ctx.session_id)?));
    }
    let query = cmd.raw_args.trim_start_matches("at ").trim();

    if let Some(direction) = canonical_direction(query) {
        return look_direction(ctx, direction);
    }

    let contents = ctx.world.world.room(ctx.room_id())?.snapshot();
    let catalog = &ctx.world.catalog;

    let mut candidates: Vec<(LookTarget, String)> = Vec::new();
    for id in &contents.items {
        candidates.push((LookTarget::Item(id.clone()), catalog.item_name(id).to_string()));
    }
    for npc in &contents.npcs {
        candidates.push((LookTarget::Npc(npc.clone()), npc.name.clone()));
    }
    for (sid, name) in &contents.players {
        if *sid != ctx.session_id {
            candidates.push((LookTarget::Player(name.clone()), name.clone()));
        }
    }
    for id in &ctx.character.inventory {
        candidates.push((LookTarget::Item(id.clone()), catalog.item_name(id).to_string()));
    }

    let target = resolve(query, candidates.iter().map(|(t, name)| (t, name.as_str())))
        .into_result(query, "things", || format!("You don't see '{}' here.", query))?;

    let text = match target {
        LookTarget::Item(id) => match catalog.item(id) {
            Some(def) if !def.description.is_empty() => format!("{}\n{}", def.name, def.description),
            _ => format!("You see nothing special about the {}.", catalog.item_name(id)),
        },
        LookTarget::Npc(npc) => {
            let description = catalog
                .npc(&npc.npc_id)
                .map(|d| d.description.as_str())
                .filter(|d| !d.is_empty())
                .unwrap_or("It looks back at you.");
            format!("{}\n{}\n{}", npc.name, description, health_word(npc.health, npc.max_health))
        }
        LookTarget::Player(name) => format!("{} is standing here.", name),
    };
    Ok(Outcome::Reply(text))
}

fn look_direction(ctx: &CommandCtx<'_>, direction: &str) -> Result<Outcome, GameError> {
    let graph = ctx.world.graph();
    let edge = graph.exit(ctx.room_id(), direction)?;
    let text = match edge {
        Some(edge) if !edge.hidden => match ctx.world.world.room(&edge.to) {
            Ok(room) => format!("To the {} you see {}.", direction, room.title),
            Err(_) => format!("The way {} fades into nothing.", direction),
        },
        _ => format!("You see nothing special to the {}.", direction),
    };
    Ok(Outcome::Reply(text))
}

fn health_word(health: i32, max: i32) -> &'static str {
    let pct = if max > 0 { health * 100 / max } else { 0 };
    match pct {
        100.. => "It is unhurt.",
        60..=99 => "It has a few scratches.",
        25..=59 => "It is wounded.",
        _ => "It is barely standing.",
    }
}

pub fn exits(ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let exits = visible_exits(ctx.world, ctx.room_id())?;
    if exits.is_empty() {
        return Ok(Outcome::reply("There are no obvious exits."));
    }
    Ok(Outcome::Reply(format!("Obvious exits: {}", exits.join(", "))))
}

pub fn who(ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let names = ctx.world.sessions.online_characters();
    let mut lines = vec![format!("Players online ({}):", names.len())];
    lines.extend(names.into_iter().map(|n| format!("  {}", n)));
    Ok(Outcome::Reply(lines.join("\n")))
}

pub fn stats(ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let actor = ctx.actor();
    let c = &ctx.character;
    let catalog = &ctx.world.catalog;
    let fatigue = &ctx.world.fatigue;

    let slot = |item: &Option<String>| {
        item.as_deref()
            .map(|id| catalog.item_name(id).to_string())
            .unwrap_or_else(|| "nothing".to_string())
    };

    let combat = if fatigue.is_fatigued(&actor) {
        format!(
            "Fatigued: {:.1}s remaining",
            fatigue.remaining_fatigue_seconds(&actor)
        )
    } else {
        format!("Attacks remaining: {}", fatigue.attacks_remaining(&actor, c.level))
    };

    let lines = [
        format!("{} (level {})", c.name, c.level),
        format!("Experience: {}", c.experience),
        format!("Health: {}/{}", c.health, c.max_health),
        format!("Strength: {}", c.strength),
        format!("Gold: {}", c.gold),
        format!("Weapon: {}", slot(&c.equipped.weapon)),
        format!("Armor: {}", slot(&c.equipped.armor)),
        combat,
    ];
    Ok(Outcome::Reply(lines.join("\n")))
}

pub fn route(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let query = cmd.raw_args.as_str();
    let world = &ctx.world.world;

    let goal = if world.contains_room(query) {
        query.to_string()
    } else {
        let mut rooms: Vec<(&str, &str)> = world.rooms().map(|r| (r.id.as_str(), r.title.as_str())).collect();
        // Same-titled rooms resolve to the first; keep that choice stable.
        rooms.sort_unstable_by_key(|&(id, _)| id);
        resolve(query, rooms)
            .into_result(query, "places", || format!("There is no place called '{}'.", query))?
            .to_string()
    };

    if goal == ctx.room_id() {
        return Ok(Outcome::reply("You are already there."));
    }

    let route = ctx.world.graph().shortest_route(ctx.room_id(), &goal)?;
    let title = world.room(&goal)?.title.clone();
    let text = match route {
        Some(route) => format!(
            "Route to {} ({} steps, cost {}): {}",
            title,
            route.directions.len(),
            route.cost,
            route.directions.join(", ")
        ),
        None => format!("There is no known way to {}.", title),
    };
    Ok(Outcome::Reply(text))
}

pub fn nearby(ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let here = ctx.room_id().to_string();
    let graph = ctx.world.graph();
    let rooms = graph.rooms_within_distance(&here, NEARBY_RADIUS)?;

    let mut entries: Vec<(u32, String)> = Vec::new();
    for id in rooms.iter().filter(|id| **id != here) {
        let distance = graph.distance(&here, id)?.unwrap_or(0);
        let title = ctx
            .world
            .world
            .room(id)
            .map(|r| r.title.clone())
            .unwrap_or_else(|_| id.clone());
        entries.push((distance, title));
    }
    entries.sort();

    if entries.is_empty() {
        return Ok(Outcome::reply("Nothing lies within easy reach."));
    }
    let mut lines = vec![format!("Within {} steps:", NEARBY_RADIUS)];
    lines.extend(entries.into_iter().map(|(d, title)| format!("  {:>2}  {}", d, title)));
    Ok(Outcome::Reply(lines.join("\n")))
}

pub fn help(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let verb = cmd.args.first().map(String::as_str);
    Ok(Outcome::Reply(ctx.world.commands.help(verb)?))
}

pub fn save(_ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    Ok(Outcome::Save)
}

pub fn quit(_ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    Ok(Outcome::Quit)
}
