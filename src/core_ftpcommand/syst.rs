use crate::engine::Engine;
use log::info;

/// Handles the SYST (System) FTP command.
///
/// Clients use the answer to pick a listing parser, and the listing lines
/// this server produces are Unix `ls -l` style.
pub fn handle_syst_command(engine: &mut Engine, _args: &str) {
    info!("Responding to SYST command with system type.");
    engine.send_reply(215, "UNIX Type: L8");
}
