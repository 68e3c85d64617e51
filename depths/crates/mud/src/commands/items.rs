use super::{CommandCtx, Outcome};
use crate::catalog::{Catalog, ItemKind};
use crate::error::GameError;
use crate::parser::ParsedCommand;
use crate::resolve::resolve;

/// Resolve `query` against a list of item ids by display name.
fn resolve_item(catalog: &Catalog, ids: &[String], query: &str, missing: &str) -> Result<String, GameError> {
    let candidates = ids.iter().map(|id| (id, catalog.item_name(id)));
    resolve(query, candidates)
        .into_result(query, "items", || missing.to_string())
        .cloned()
}

pub fn get(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let query = cmd.raw_args.as_str();
    let room_id = ctx.room_id().to_string();
    let catalog = &ctx.world.catalog;

    let items = ctx.world.world.room(&room_id)?.snapshot().items;
    let item_id = resolve_item(catalog, &items, query, &format!("You don't see '{}' here.", query))?;
    let name = catalog.item_name(&item_id).to_string();

    // The room may have changed since the snapshot.
    if !ctx.world.world.remove_item_from_room(&room_id, &item_id)? {
        return Err(GameError::not_found(format!("The {} is no longer here.", name)));
    }
    ctx.character.inventory.push(item_id);
    ctx.notify_room(&format!("{} picks up the {}.", ctx.character.name, name));
    Ok(Outcome::Reply(format!("You pick up the {}.", name)))
}

pub fn drop(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let query = cmd.raw_args.as_str();
    let catalog = &ctx.world.catalog;
    let item_id = resolve_item(
        catalog,
        &ctx.character.inventory,
        query,
        &format!("You aren't carrying '{}'.", query),
    )?;
    let name = catalog.item_name(&item_id).to_string();

    ctx.world.world.add_item_to_room(ctx.room_id(), &item_id)?;
    ctx.character.take_item(&item_id);
    ctx.notify_room(&format!("{} drops the {}.", ctx.character.name, name));
    Ok(Outcome::Reply(format!("You drop the {}.", name)))
}

pub fn inventory(ctx: &mut CommandCtx<'_>, _cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let catalog = &ctx.world.catalog;
    let c = &ctx.character;
    let mut lines = Vec::new();

    if c.inventory.is_empty() {
        lines.push("You are carrying nothing.".to_string());
    } else {
        lines.push("You are carrying:".to_string());
        lines.extend(c.inventory.iter().map(|id| format!("  {}", catalog.item_name(id))));
    }
    if let Some(weapon) = &c.equipped.weapon {
        lines.push(format!("Wielding: {}", catalog.item_name(weapon)));
    }
    if let Some(armor) = &c.equipped.armor {
        lines.push(format!("Wearing: {}", catalog.item_name(armor)));
    }
    lines.push(format!("Gold: {}", c.gold));
    Ok(Outcome::Reply(lines.join("\n")))
}

pub fn equip(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let query = cmd.raw_args.as_str();
    let catalog = &ctx.world.catalog;
    let item_id = resolve_item(
        catalog,
        &ctx.character.inventory,
        query,
        &format!("You aren't carrying '{}'.", query),
    )?;
    let name = catalog.item_name(&item_id).to_string();
    let kind = catalog.item(&item_id).map(|d| d.kind).unwrap_or_default();

    let c = &mut *ctx.character;
    let (slot, verb) = match kind {
        ItemKind::Weapon => (&mut c.equipped.weapon, "wield"),
        ItemKind::Armor => (&mut c.equipped.armor, "wear"),
        _ => return Err(GameError::denied(format!("You can't equip the {}.", name))),
    };

    let previous = slot.replace(item_id.clone());
    c.take_item(&item_id);
    let mut reply = format!("You {} the {}.", verb, name);
    if let Some(old) = previous {
        reply = format!("You put away the {}. {}", catalog.item_name(&old), reply);
        c.inventory.push(old);
    }
    Ok(Outcome::Reply(reply))
}

pub fn unequip(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let query = cmd.raw_args.as_str();
    let catalog = &ctx.world.catalog;
    let c = &mut *ctx.character;

    let equipped: Vec<String> = [&c.equipped.weapon, &c.equipped.armor]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let item_id = resolve_item(catalog, &equipped, query, &format!("You aren't using '{}'.", query))?;

    if c.equipped.weapon.as_deref() == Some(item_id.as_str()) {
        c.equipped.weapon = None;
    } else {
        c.equipped.armor = None;
    }
    let name = catalog.item_name(&item_id).to_string();
    c.inventory.push(item_id);
    Ok(Outcome::Reply(format!("You stop using the {}.", name)))
}
