use std::time::Instant;

use rand_core::{OsRng, RngCore};

use super::{CommandCtx, Outcome};
use crate::catalog::NpcDef;
use crate::error::GameError;
use crate::fatigue::ActorId;
use crate::parser::ParsedCommand;
use crate::resolve::resolve;
use crate::world::{EntityRef, NpcHit, NpcInstance};

/// Damage dealt by one attack.
pub fn attack_damage(strength: u32, weapon_damage: u32) -> i32 {
    (1 + strength / 5 + weapon_damage) as i32
}

/// Damage an NPC deals to a character wearing `armor`. Never below 1.
pub fn npc_damage(level: u32, damage: u32, armor: u32) -> i32 {
    (1 + level + damage).saturating_sub(armor).max(1) as i32
}

/// What a kill yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spoils {
    pub gold: u32,
    /// Item ids dropped into the room.
    pub items: Vec<String>,
}

/// Roll the spoils of killing `def`. `roll` yields values in `[0, 1)`.
pub fn roll_spoils(def: &NpcDef, mut roll: impl FnMut() -> f64) -> Spoils {
    let [a, b] = def.gold;
    let (low, high) = (a.min(b), a.max(b));
    let span = high - low;
    let gold = low + ((roll() * (span as f64 + 1.0)) as u32).min(span);
    let items = def
        .loot
        .iter()
        .filter(|entry| roll() < entry.chance)
        .map(|entry| entry.item_id.clone())
        .collect();
    Spoils { gold, items }
}

fn unit_roll() -> f64 {
    OsRng.next_u32() as f64 / (u32::MAX as f64 + 1.0)
}

/// Checks run in a fixed order: fatigue, safe room, target, target role,
/// and finally the quota spend. Nothing is consumed until every check passes.
pub fn attack(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let now = Instant::now();
    let actor = ctx.actor();
    let world = ctx.world;
    let fatigue = &world.fatigue;

    if fatigue.is_fatigued_at(&actor, now) {
        return Err(GameError::denied(format!(
            "You are too exhausted to attack. ({:.1}s)",
            fatigue.remaining_fatigue_seconds_at(&actor, now)
        )));
    }

    let room_id = ctx.room_id().to_string();
    let room = world.world.room(&room_id)?;
    if room.safe {
        return Err(GameError::denied("You cannot fight here."));
    }

    let query = cmd.raw_args.as_str();
    let npcs = room.snapshot().npcs;
    let target = resolve(query, npcs.iter().map(|n| (n, n.name.as_str())))
        .into_result(query, "creatures", || format!("You don't see '{}' here.", query))?
        .clone();

    let def = world.catalog.npc(&target.npc_id);
    if def.is_some_and(|d| !d.role.attackable()) {
        return Err(GameError::denied(format!("The {} is not here to fight.", target.name)));
    }

    if !fatigue.use_action_at(&actor, ctx.character.level, now) {
        return Err(GameError::denied("You are too exhausted to attack."));
    }

    let weapon_damage = ctx
        .character
        .equipped
        .weapon
        .as_deref()
        .and_then(|id| world.catalog.item(id))
        .map(|w| w.damage)
        .unwrap_or(0);
    let damage = attack_damage(ctx.character.strength, weapon_damage);
    let name = ctx.character.name.clone();

    let mut lines = Vec::new();
    match world.world.damage_npc(&room_id, target.instance_id, damage)? {
        NpcHit::Missing => {
            lines.push(format!("The {} is already gone.", target.name));
        }
        NpcHit::Wounded { remaining } => {
            tracing::debug!(attacker = %name, npc = target.instance_id, damage, remaining, "npc hit");
            lines.push(format!("You hit the {} for {} damage.", target.name, damage));
            ctx.notify_room(&format!("{} attacks the {}.", name, target.name));
            if let Some(def) = def.filter(|d| d.hostile) {
                lines.extend(retaliate(ctx, &target, def, now)?);
            }
        }
        NpcHit::Killed(npc) => {
            fatigue.forget(&ActorId::Npc(npc.instance_id));
            let experience = def.map(|d| d.experience).unwrap_or(0);
            tracing::info!(attacker = %name, npc = %npc.npc_id, room = %room_id, "npc killed");
            lines.push(format!("You hit the {} for {} damage.", npc.name, damage));
            lines.push(format!("The {} dies! You gain {} experience.", npc.name, experience));
            if ctx.character.gain_experience(experience) {
                lines.push(format!("You have reached level {}!", ctx.character.level));
            }
            ctx.notify_room(&format!("{} kills the {}!", name, npc.name));
            if let Some(def) = def {
                let spoils = roll_spoils(def, unit_roll);
                lines.extend(collect_spoils(ctx, &npc, &room_id, spoils)?);
            }
        }
    }

    if fatigue.is_fatigued_at(&actor, now) {
        lines.push(format!(
            "You are fatigued. ({:.1}s)",
            fatigue.remaining_fatigue_seconds_at(&actor, now)
        ));
    } else {
        lines.push(format!(
            "Attacks remaining: {}",
            fatigue.attacks_remaining_at(&actor, ctx.character.level, now)
        ));
    }
    Ok(Outcome::Reply(lines.join("\n")))
}

/// A hostile NPC that survives a hit strikes back while it has attacks left.
fn retaliate(
    ctx: &mut CommandCtx<'_>,
    npc: &NpcInstance,
    def: &NpcDef,
    now: Instant,
) -> Result<Vec<String>, GameError> {
    let world = ctx.world;
    if !world.fatigue.use_action_at(&ActorId::Npc(npc.instance_id), def.level, now) {
        return Ok(Vec::new());
    }

    let armor = ctx
        .character
        .equipped
        .armor
        .as_deref()
        .and_then(|id| world.catalog.item(id))
        .map(|a| a.armor)
        .unwrap_or(0);
    let damage = npc_damage(def.level, def.damage, armor);
    ctx.character.health -= damage;
    tracing::debug!(npc = npc.instance_id, target = %ctx.character.name, damage, health = ctx.character.health, "npc strikes back");

    let mut lines = vec![format!("The {} hits you for {} damage.", npc.name, damage)];
    ctx.notify_room(&format!("The {} hits {}.", npc.name, ctx.character.name));
    if ctx.character.health <= 0 {
        lines.extend(defeat(ctx, &npc.name)?);
    }
    Ok(lines)
}

/// At 0 health the character wakes in the start room at half health.
fn defeat(ctx: &mut CommandCtx<'_>, killer: &str) -> Result<Vec<String>, GameError> {
    let world = ctx.world;
    let from = ctx.room_id().to_string();
    let to = world.settings.start_room.clone();
    let name = ctx.character.name.clone();
    tracing::info!(character = %name, killer, room = %from, "character defeated");

    ctx.notify_room(&format!("{} collapses!", name));
    world.world.move_entity(
        &EntityRef::Player {
            session_id: ctx.session_id,
            name: name.clone(),
        },
        &from,
        &to,
    )?;
    ctx.character.room_id = to.clone();
    ctx.character.health = (ctx.character.max_health / 2).max(1);
    ctx.notify_room(&format!("{} staggers in, battered and bruised.", name));

    let title = world.world.room(&to)?.title.clone();
    Ok(vec![
        format!("You have been defeated by the {}!", killer),
        format!("You wake up in {}.", title),
    ])
}

/// Gold goes straight to the killer; items drop into the room.
fn collect_spoils(
    ctx: &mut CommandCtx<'_>,
    npc: &NpcInstance,
    room_id: &str,
    spoils: Spoils,
) -> Result<Vec<String>, GameError> {
    let world = ctx.world;
    let mut lines = Vec::new();
    if spoils.gold > 0 {
        ctx.character.gold = ctx.character.gold.saturating_add(spoils.gold);
        lines.push(format!("You loot {} gold.", spoils.gold));
    }
    if spoils.items.is_empty() {
        return Ok(lines);
    }

    let mut names = Vec::with_capacity(spoils.items.len());
    for item_id in &spoils.items {
        world.world.add_item_to_room(room_id, item_id)?;
        names.push(world.catalog.item_name(item_id).to_string());
    }
    let dropped = format!("The {} drops: {}.", npc.name, names.join(", "));
    ctx.notify_room(&dropped);
    lines.push(dropped);
    Ok(lines)
}
