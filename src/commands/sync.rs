use crate::commands::{CmdCtx, CommandOutcome, CommandResult};

pub fn sync(ctx: &CmdCtx) -> CommandResult {
    let handle = ctx.session()?;
    ctx.registry.send_full_sync(ctx.session_id, handle.account_id);
    Ok(CommandOutcome::success("Sync complete."))
}
