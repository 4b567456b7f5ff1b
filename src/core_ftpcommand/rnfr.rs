use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::engine::Engine;
use crate::error::FtpError;
use log::{info, warn};
use std::fs;

/// Handles the RNFR (Rename From) FTP command.
///
/// The source must exist. Its display path is remembered for the RNTO that
/// follows; a failed RNFR forgets any earlier one.
pub fn handle_rnfr_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    let exists = engine
        .storage
        .vfs()
        .resolve_entry(&path)
        .and_then(|fullname| fs::metadata(fullname).map_err(FtpError::from));

    match exists {
        Ok(_) => {
            info!("RNFR ftp_path=[{}]", path);
            engine.session.rename_from = Some(path.clone());
            engine.send_reply(350, "File exists, ready for destination name.");
            engine.screen.log(&format!("[**] Renaming: {}", path));
        }
        Err(e) => {
            warn!("RNFR {} rejected: {}", path, e);
            engine.session.rename_from = None;
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
        }
    }
}
