use super::{CommandCtx, Outcome};
use crate::commands::info::render_room;
use crate::content::is_external;
use crate::error::GameError;
use crate::parser::{canonical_direction, ParsedCommand, DIRECTIONS};
use crate::world::EntityRef;

/// A bare direction verb (`north`, `u`, ...).
pub fn walk(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let direction = cmd.verb.clone();
    move_through(ctx, &direction)
}

pub fn go(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let word = cmd.raw_args.as_str();
    let direction = canonical_direction(word)
        .map(str::to_string)
        .unwrap_or_else(|| word.to_lowercase());
    move_through(ctx, &direction)
}

pub fn flee(ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let actor = ctx.actor();
    let fatigue = &ctx.world.fatigue;
    if fatigue.is_fatigued(&actor) {
        return Err(GameError::denied(format!(
            "You are too exhausted to flee. ({:.1}s)",
            fatigue.remaining_fatigue_seconds(&actor)
        )));
    }

    let room = ctx.world.world.room(ctx.room_id())?;
    let locked = room.snapshot().locked_exits;
    let mut directions: Vec<&String> = room.exits.keys().collect();
    directions.sort_by_key(|d| DIRECTIONS.iter().position(|x| x == d).unwrap_or(DIRECTIONS.len()));

    let escape = {
        let graph = ctx.world.graph();
        directions
            .into_iter()
            .find(|dir| {
                let target = &room.exits[*dir];
                !is_external(target)
                    && !locked.contains_key(*dir)
                    && ctx.world.world.contains_room(target)
                    && !graph
                        .exit(&room.id, dir)
                        .ok()
                        .flatten()
                        .is_some_and(|e| e.hidden)
            })
            .cloned()
    };

    let Some(direction) = escape else {
        return Err(GameError::denied("There is nowhere to run!"));
    };
    match move_through(ctx, &direction)? {
        Outcome::Reply(view) => Ok(Outcome::Reply(format!("You flee {}!\n{}", direction, view))),
        other => Ok(other),
    }
}

/// Take the exit `direction` out of the current room.
///
/// Hidden exits work for anyone who names them. A locked exit opens if the
/// character carries its key, which is used up.
pub fn move_through(ctx: &mut CommandCtx<'_>, direction: &str) -> Result<Outcome, GameError> {
    let actor = ctx.actor();
    let fatigue = &ctx.world.fatigue;
    if fatigue.is_fatigued(&actor) {
        return Err(GameError::denied(format!(
            "You are too exhausted to move. ({:.1}s)",
            fatigue.remaining_fatigue_seconds(&actor)
        )));
    }

    let from = ctx.room_id().to_string();
    let room = ctx.world.world.room(&from)?;
    let Some(target) = room.exits.get(direction).cloned() else {
        return Err(GameError::not_found("You can't go that way."));
    };
    if is_external(&target) || !ctx.world.world.contains_room(&target) {
        return Err(GameError::not_found("That way leads nowhere."));
    }

    let mut preamble = None;
    let lock = room.snapshot().locked_exits.get(direction).cloned();
    if let Some(lock) = lock {
        let catalog = &ctx.world.catalog;
        let key_name = catalog.item_name(&lock.required_key).to_string();
        let carried = ctx.character.inventory.iter().position(|id| {
            *id == lock.required_key || catalog.item_name(id).eq_ignore_ascii_case(&key_name)
        });
        let Some(pos) = carried else {
            return Err(GameError::denied(format!("{} You need the {}.", lock.message(), key_name)));
        };

        // Another player may have opened it first; the key is only spent
        // by whoever actually unlocks it.
        if ctx.world.world.unlock_exit(&from, direction)? {
            ctx.character.inventory.remove(pos);
            if let Err(e) = ctx.world.graph_mut().set_lock(&from, direction, None) {
                tracing::warn!(room = %from, direction, "unlocked exit missing from graph: {}", e);
            }
            tracing::info!(room = %from, direction, who = %ctx.character.name, "exit unlocked");
            preamble = Some(format!("You unlock the way with the {}.", key_name));
        }
    }

    let name = ctx.character.name.clone();
    ctx.world.world.move_entity(
        &EntityRef::Player {
            session_id: ctx.session_id,
            name: name.clone(),
        },
        &from,
        &target,
    )?;

    ctx.world
        .notify_room(&from, Some(ctx.session_id), &format!("{} leaves {}.", name, direction));
    ctx.character.room_id = target.clone();
    ctx.notify_room(&format!("{} arrives.", name));

    let view = render_room(ctx.world, &target, ctx.session_id)?;
    Ok(Outcome::Reply(match preamble {
        Some(p) => format!("{}\n{}", p, view),
        None => view,
    }))
}
