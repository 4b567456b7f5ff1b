use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::core_vfs::listing::{format_mdtm, EntryStat};
use crate::engine::Engine;
use crate::error::FtpError;
use log::{info, warn};
use std::fs;

/// Handles the MDTM (File Modification Time) FTP command.
///
/// Replies `213 YYYYMMDDHHMMSS` in server local time, or 550 when the file
/// cannot be stat'ed.
pub fn handle_mdtm_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    let stamp = engine
        .storage
        .vfs()
        .resolve(&path)
        .and_then(|fullname| fs::metadata(fullname).map_err(FtpError::from))
        .map(|metadata| EntryStat::from_metadata(&metadata).mtime);

    match stamp.map(format_mdtm) {
        Ok(Some(stamp)) => {
            info!("MDTM {} = {}", path, stamp);
            engine.send_reply(213, &stamp);
        }
        Ok(None) => engine.send_reply(550, "Could not get file modification time."),
        Err(e) => {
            warn!("MDTM {} failed: {}", path, e);
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
        }
    }
}
