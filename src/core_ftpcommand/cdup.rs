use crate::core_vfs::path::close_child;
use crate::engine::Engine;
use log::info;

/// Handles the CDUP (Change to Parent Directory) FTP command.
///
/// Moving up from a storage root lands on the virtual root; moving up from
/// the virtual root stays there.
pub fn handle_cdup_command(engine: &mut Engine, _args: &str) {
    info!("CDUP from {}", engine.session.ftp_path);
    close_child(&mut engine.session.ftp_path);
    info!("CDUP to {}", engine.session.ftp_path);
    engine.send_reply(250, "Directory successfully changed.");
}
