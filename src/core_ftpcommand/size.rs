use crate::core_ftpcommand::parser::get_param_and_open_child;
use crate::engine::Engine;
use crate::error::FtpError;
use log::{info, warn};
use std::fs;

/// Handles the SIZE command: `213 <bytes>`.
pub fn handle_size_command(engine: &mut Engine, args: &str) {
    let path = get_param_and_open_child(&mut engine.session, args);

    let metadata = engine
        .storage
        .vfs()
        .resolve(&path)
        .and_then(|fullname| fs::metadata(fullname).map_err(FtpError::from));

    match metadata {
        Ok(metadata) => {
            info!("SIZE {} = {}", path, metadata.len());
            engine.send_reply(213, &metadata.len().to_string());
        }
        Err(e) => {
            warn!("SIZE {} failed: {}", path, e);
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
        }
    }
}
