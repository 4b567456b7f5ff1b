use crate::engine::Engine;
use log::debug;

/// Handles the TYPE command. Transfers are always binary, any type is accepted.
pub fn handle_type_command(engine: &mut Engine, args: &str) {
    debug!("TYPE {} accepted", args.trim());
    engine.send_reply(200, "Type set.");
}
