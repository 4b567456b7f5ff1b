use crate::engine::Engine;
use log::info;

/// Handles the AUTH command. TLS is not available, so every mechanism is refused.
pub fn handle_auth_command(engine: &mut Engine, args: &str) {
    info!("AUTH {} refused", args.trim());
    engine.send_reply(504, "not-supported");
}
