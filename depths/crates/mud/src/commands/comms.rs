use super::{CommandCtx, Outcome};
use crate::error::GameError;
use crate::parser::ParsedCommand;

pub fn say(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let text = cmd.raw_args.as_str();
    ctx.notify_room(&format!("{} says, \"{}\"", ctx.character.name, text));
    Ok(Outcome::Reply(format!("You say, \"{}\"", text)))
}

pub fn emote(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    let line = format!("{} {}", ctx.character.name, cmd.raw_args);
    ctx.notify_room(&line);
    Ok(Outcome::Reply(line))
}

/// Lines that are not commands go to the room as they were typed.
pub fn chat(ctx: &mut CommandCtx<'_>, cmd: &ParsedCommand) -> Result<Outcome, GameError> {
    ctx.notify_room(&format!("From {}: {}", ctx.character.name, cmd.raw));
    Ok(Outcome::reply("-- Message sent --"))
}
