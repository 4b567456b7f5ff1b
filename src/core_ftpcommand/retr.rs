use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::core_vfs::OpenMode;
use crate::engine::Engine;
use crate::session::ControlState;
use log::{info, warn};

/// Handles the RETR (Retrieve) FTP command.
///
/// Opens the file and switches the engine to `ContinueFileTx`; the content
/// then goes out one data buffer per tick. A failed open ends the transfer
/// right away with 550.
pub fn handle_retr_command(engine: &mut Engine, args: &str) {
    engine.session.start_transfer();
    let path = get_param_and_open_child(&mut engine.session, args);

    if !engine.has_data_connection() {
        warn!("RETR without data connection");
        engine.send_reply(425, "Use PASV first.");
        return;
    }

    if engine.session.scratch.is_empty() || path.ends_with('/') {
        engine.session.state = ControlState::EndTransfer;
        engine.send_reply(550, "Requested action not taken (not a file).");
        return;
    }

    match engine.storage.open_file(&path, OpenMode::Read) {
        Ok(()) => {
            info!("Sending file: {}", path);
            engine.screen.log(&format!("[<<] Download: {}", path));
            engine.session.state = ControlState::ContinueFileTx;
            engine.send_reply(150, "Opening data connection.");
        }
        Err(e) => {
            warn!("RETR {} failed: {}", path, e);
            engine.session.state = ControlState::EndTransfer;
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
        }
    }
}
