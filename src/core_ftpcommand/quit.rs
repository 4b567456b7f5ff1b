use crate::engine::Engine;
use crate::session::ControlState;
use log::info;

/// Handles the QUIT command: say goodbye, drop the client and go back to
/// waiting for the next one.
pub fn handle_quit_command(engine: &mut Engine, _args: &str) {
    info!("Client disconnected (QUIT)");
    engine.screen.log("[--] Client quit");
    engine.send_reply(221, "Goodbye.");
    engine.close_cmd_data();
    engine.session.state = ControlState::Start;
}
