use crate::constants::FTP_MAX_PATH_SIZE;
use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::core_vfs::path::sanitize_path;
use crate::engine::Engine;
use log::{info, warn};
use std::fs;

/// Handles the RMD (Remove Directory) FTP command. Only empty directories
/// can be removed.
pub fn handle_rmd_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    if !sanitize_path(&path, FTP_MAX_PATH_SIZE) {
        warn!("RMD: invalid path rejected");
        engine.send_reply(550, "Requested action not taken (invalid path).");
        return;
    }
    if engine.session.scratch.is_empty() || path.ends_with('/') {
        engine.send_reply(250, "Nothing to remove.");
        return;
    }

    let fullname = match engine.storage.vfs().resolve_entry(&path) {
        Ok(fullname) => fullname,
        Err(e) => {
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
            return;
        }
    };

    info!("RMD fullname=[{}]", fullname.display());
    engine.storage.settle();
    match fs::remove_dir(&fullname) {
        Ok(()) => {
            info!("Directory removed: {}", path);
            engine.send_reply(250, "Directory removed.");
            engine.screen.log(&format!("[OK] Removed dir: {}", path));
        }
        Err(e) => {
            warn!("Failed to remove directory {}: {}", path, e);
            engine.send_reply(550, "Could not remove directory.");
        }
    }
}
