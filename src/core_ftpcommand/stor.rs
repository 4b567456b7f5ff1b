use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::core_vfs::OpenMode;
use crate::engine::Engine;
use crate::session::ControlState;
use log::{info, warn};

/// Handles the STOR (Store) FTP command. An existing file is truncated.
pub fn handle_stor_command(engine: &mut Engine, args: &str) {
    start_upload(engine, args, OpenMode::Write);
}

/// Handles the APPE (Append) FTP command. A missing file is created.
pub fn handle_appe_command(engine: &mut Engine, args: &str) {
    start_upload(engine, args, OpenMode::Append);
}

/// The engine receives the upload in `ContinueFileRx` and treats the client
/// closing the data connection as the end of the file.
fn start_upload(engine: &mut Engine, args: &str, mode: OpenMode) {
    engine.session.start_transfer();
    let path = get_param_and_open_child(&mut engine.session, args);

    if !engine.has_data_connection() {
        warn!("Upload without data connection");
        engine.send_reply(425, "Use PASV first.");
        return;
    }

    if engine.session.scratch.is_empty() || path.ends_with('/') {
        engine.session.state = ControlState::EndTransfer;
        engine.send_reply(550, "Requested action not taken (not a file).");
        return;
    }

    match engine.storage.open_file(&path, mode) {
        Ok(()) => {
            info!("Receiving file: {} ({:?})", path, mode);
            let line = match mode {
                OpenMode::Append => format!("[OK] Append: {}", path),
                _ => format!("[>>] Upload: {}", path),
            };
            engine.screen.log(&line);
            engine.session.dtimeout = 0;
            engine.session.state = ControlState::ContinueFileRx;
            engine.send_reply(150, "Ok to send data.");
        }
        Err(e) => {
            warn!("Upload to {} failed: {}", path, e);
            engine.session.state = ControlState::EndTransfer;
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
        }
    }
}
