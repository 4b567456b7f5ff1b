use crate::engine::Engine;
use log::info;

/// Handles the FEAT command. No extensions are advertised.
pub fn handle_feat_command(engine: &mut Engine, _args: &str) {
    info!("FEAT requested, no features advertised.");
    engine.send_reply(502, "no-features");
}
