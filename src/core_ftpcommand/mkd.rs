use crate::constants::FTP_MAX_PATH_SIZE;
use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::core_vfs::path::sanitize_path;
use crate::engine::Engine;
use log::{info, warn};
use std::fs;

/// Handles the MKD (Make Directory) FTP command.
pub fn handle_mkd_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    if !sanitize_path(&path, FTP_MAX_PATH_SIZE) {
        warn!("MKD: invalid path rejected");
        engine.send_reply(550, "Requested action not taken (invalid path).");
        return;
    }
    if engine.session.scratch.is_empty() || path.ends_with('/') {
        engine.send_reply(250, "Nothing to create.");
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

    info!("MKD fullname=[{}]", fullname.display());
    engine.storage.settle();
    match fs::create_dir(&fullname) {
        Ok(()) => {
            info!("Directory created: {}", path);
            engine.send_reply(250, "Directory created.");
            engine.screen.log(&format!("[OK] Created dir: {}", path));
        }
        Err(e) => {
            warn!("Failed to create directory {}: {}", path, e);
            engine.send_reply(550, "Could not create directory.");
        }
    }
}
