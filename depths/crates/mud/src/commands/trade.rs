//! Buying and selling with vendor NPCs.

use super::{CommandCtx, Outcome};
use crate::catalog::{ItemDef, NpcDef, NpcRole};
use crate::error::GameError;
use crate::parser::ParsedCommand;
use crate::resolve::resolve;
use crate::world::NpcInstance;

/// Split `text` at the last ` <word> `, matched ASCII case-insensitively.
fn split_on<'a>(text: &'a str, word: &str) -> (&'a str, Option<&'a str>) {
    let needle = format!(" {} ", word);
    // ASCII lowercasing keeps byte offsets valid for `text`.
    match text.to_ascii_lowercase().rfind(&needle) {
        Some(at) => (text[..at].trim(), Some(text[at + needle.len()..].trim())),
        None => (text.trim(), None),
    }
}

/// The vendor to trade with: the one named, or the only one present.
fn vendor<'w>(ctx: &CommandCtx<'w>, name: Option<&str>) -> Result<(NpcInstance, &'w NpcDef), GameError> {
    let world = ctx.world;
    let npcs = world.world.room(ctx.room_id())?.snapshot().npcs;
    let vendors: Vec<(NpcInstance, &'w NpcDef)> = npcs
        .into_iter()
        .filter_map(|npc| {
            let def = world.catalog.npc(&npc.npc_id).filter(|d| d.role == NpcRole::Vendor)?;
            Some((npc, def))
        })
        .collect();

    if let Some(query) = name {
        return resolve(query, vendors.iter().map(|v| (v, v.0.name.as_str())))
            .into_result(query, "vendors", || format!("There is no vendor called '{}' here.", query))
            .cloned();
    }
    if vendors.len() > 1 {
        let names: Vec<&str> = vendors.iter().map(|(n, _)| n.name.as_str()).collect();
        return Err(GameError::denied(format!(
            "There are several vendors here: {}. Say which one.",
            names.join(", ")
        )));
    }
    vendors
        .into_iter()
        .next()
        .ok_or_else(|| GameError::not_found("There is no vendor here."))
}

fn wares<'w>(ctx: &CommandCtx<'w>, def: &'w NpcDef) -> Vec<&'w ItemDef> {
    let world = ctx.world;
    def.wares
        .iter()
        .filter_map(|id| {
            let item = world.catalog.item(id);
            if item.is_none() {
                tracing::warn!(vendor = %def.id, item = %id, "vendor sells an unknown item");
            }
            item
        })
        .collect()
}

pub fn list(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let name = cmd.has_args().then_some(cmd.raw_args.as_str());
    let (npc, def) = vendor(ctx, name)?;
    let goods = wares(ctx, def);
    if goods.is_empty() {
        return Ok(Outcome::Reply(format!("The {} has nothing for sale.", npc.name)));
    }

    let mut lines = vec![format!("The {} has for sale:", npc.name)];
    for (i, item) in goods.iter().enumerate() {
        lines.push(format!("  {}. {} - {} gold", i + 1, item.name, def.price_of(item)));
    }
    Ok(Outcome::Reply(lines.join("\n")))
}

pub fn buy(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let (query, vendor_name) = split_on(&cmd.raw_args, "from");
    if query.is_empty() {
        return Err(GameError::InvalidParameters {
            verb: "buy",
            prompt: "Buy what?",
        });
    }
    let (npc, def) = vendor(ctx, vendor_name)?;
    let goods = wares(ctx, def);
    let item = *resolve(query, goods.iter().map(|i| (i, i.name.as_str())))
        .into_result(query, "wares", || format!("The {} doesn't sell '{}'.", npc.name, query))?;

    let price = def.price_of(item);
    let c = &mut *ctx.character;
    if c.gold < price {
        return Err(GameError::denied(format!(
            "The {} costs {} gold. You have {}.",
            item.name, price, c.gold
        )));
    }
    c.gold -= price;
    c.inventory.push(item.id.clone());
    tracing::debug!(buyer = %c.name, vendor = %def.id, item = %item.id, price, "item bought");

    let name = c.name.clone();
    ctx.notify_room(&format!("{} buys something from the {}.", name, npc.name));
    Ok(Outcome::Reply(format!("You buy the {} for {} gold.", item.name, price)))
}

pub fn sell(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let (query, vendor_name) = split_on(&cmd.raw_args, "to");
    if query.is_empty() {
        return Err(GameError::InvalidParameters {
            verb: "sell",
            prompt: "Sell what?",
        });
    }
    let (npc, def) = vendor(ctx, vendor_name)?;
    let catalog = &ctx.world.catalog;
    let item_id = resolve(
        query,
        ctx.character.inventory.iter().map(|id| (id, catalog.item_name(id))),
    )
    .into_result(query, "items", || format!("You aren't carrying '{}'.", query))?
    .clone();

    let item_name = catalog.item_name(&item_id).to_string();
    let value = catalog.item(&item_id).map(ItemDef::resale_value).unwrap_or(1);
    let c = &mut *ctx.character;
    c.take_item(&item_id);
    c.gold = c.gold.saturating_add(value);
    tracing::debug!(seller = %c.name, vendor = %def.id, item = %item_id, value, "item sold");

    let name = c.name.clone();
    ctx.notify_room(&format!("{} sells something to the {}.", name, npc.name));
    Ok(Outcome::Reply(format!(
        "You sell the {} to the {} for {} gold.",
        item_name, npc.name, value
    )))
}
