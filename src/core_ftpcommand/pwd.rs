use crate::engine::Engine;
use log::info;

/// Handles PWD and XPWD: `257 "<path>"`.
pub fn handle_pwd_command(engine: &mut Engine, _args: &str) {
    let reply = format!("\"{}\" is the current directory.", engine.current_path());
    info!("PWD: {}", engine.current_path());
    engine.send_reply(257, &reply);
}
