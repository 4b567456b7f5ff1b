use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::engine::Engine;
use log::{info, warn};
use std::fs;

/// Handles the RNTO (Rename To) FTP command.
///
/// Both the remembered source and the new name are checked against traversal
/// and must stay inside the storage roots. RNTO without a successful RNFR
/// gets 503.
pub fn handle_rnto_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    let from = match engine.session.rename_from.take() {
        Some(from) => from,
        None => {
            engine.send_reply(503, "Bad sequence of commands.");
            return;
        }
    };

    let vfs = engine.storage.vfs();
    let paths = vfs
        .resolve_entry(&from)
        .and_then(|old| vfs.resolve_entry(&path).map(|new| (old, new)));
    let (old_path, new_path) = match paths {
        Ok(paths) => paths,
        Err(e) => {
            warn!("RNTO: invalid path rejected ({})", e);
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
            return;
        }
    };

    engine.storage.settle();
    match fs::rename(&old_path, &new_path) {
        Ok(()) => {
            info!("File renamed from {} to {}", from, path);
            engine.send_reply(250, "File or directory renamed successfully.");
            engine.screen.log(&format!("[OK] Renamed to: {}", path));
        }
        Err(e) => {
            warn!("Rename {} -> {} failed: {}", from, path, e);
            engine.send_reply(550, "Failed to rename file or directory.");
        }
    }
}
