use crate::constants::{FTP_MAX_PARAM_SIZE, FTP_MAX_PATH_SIZE};
use crate::core_ftpcommand::parser::pop_param;
use crate::core_vfs::path::{close_child, normalize_dir, open_child, sanitize_path};
use crate::engine::Engine;
use log::{info, warn};
use std::fs;

/// Handles the CWD (Change Working Directory) FTP command.
///
/// `.` is a no-op and `..` behaves like CDUP. Any other target must be the
/// virtual root or an existing directory below one of the storage roots;
/// otherwise the working directory is left untouched and 550 is returned.
pub fn handle_cwd_command(engine: &mut Engine, args: &str) {
    let (dir, _) = pop_param(args, FTP_MAX_PARAM_SIZE, false, true);

    match dir.as_str() {
        "." => {
            engine.send_reply(250, "Directory successfully changed.");
            return;
        }
        ".." => {
            close_child(&mut engine.session.ftp_path);
            engine.send_reply(250, "Directory successfully changed.");
            return;
        }
        _ => {}
    }

    if !sanitize_path(&dir, FTP_MAX_PATH_SIZE) {
        warn!("CWD: invalid path rejected");
        engine.send_reply(550, "Requested action not taken (invalid path).");
        return;
    }

    let previous = engine.session.ftp_path.clone();
    open_child(&mut engine.session.ftp_path, &dir);
    normalize_dir(&mut engine.session.ftp_path);

    if engine.session.ftp_path == "/" {
        engine.send_reply(250, "Directory successfully changed.");
        return;
    }

    let exists = match engine.storage.vfs().resolve(&engine.session.ftp_path) {
        Ok(fullname) => {
            info!("CWD fullname=[{}]", fullname.display());
            engine.storage.settle();
            fs::read_dir(&fullname).is_ok()
        }
        Err(_) => false,
    };

    if exists {
        info!("Changed directory to: {}", engine.session.ftp_path);
        engine.send_reply(250, "Directory successfully changed.");
    } else {
        engine.session.ftp_path = previous;
        engine.send_reply(550, "Failed to change directory.");
    }
}
