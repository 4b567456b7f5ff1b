use crate::engine::Engine;

pub fn handle_noop_command(engine: &mut Engine, _args: &str) {
    engine.send_reply(200, "NOOP ok.");
}
