use crate::constants::FTP_MAX_PATH_SIZE;
use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::core_vfs::path::sanitize_path;
use crate::engine::Engine;
use log::{info, warn};
use std::fs;

/// Handles the DELE (Delete File) FTP command.
///
/// An empty or directory-looking argument is answered with 250 and nothing is
/// touched. Storage roots can never be deleted.
pub fn handle_dele_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    if !sanitize_path(&path, FTP_MAX_PATH_SIZE) {
        warn!("DELE: invalid path rejected");
        engine.send_reply(550, "Requested action not taken (invalid path).");
        return;
    }
    if engine.session.scratch.is_empty() || path.ends_with('/') {
        engine.send_reply(250, "Nothing to delete.");
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

    info!("DELE fullname=[{}]", fullname.display());
    engine.storage.settle();
    match fs::remove_file(&fullname) {
        Ok(()) => {
            info!("File deleted: {}", path);
            engine.send_reply(250, "File deleted.");
            engine.screen.log(&format!("[OK] Deleted: {}", path));
        }
        Err(e) => {
            warn!("Failed to delete {}: {}", path, e);
            engine.send_reply(550, "Could not delete file.");
        }
    }
}
