use crate::core_ftpcommand::parser::{get_param_and_open_child, skip_list_options};
use crate::engine::Engine;
use crate::session::ControlState;
use log::{info, warn};

/// Handles the LIST command: one `ls -l` style line per entry.
pub fn handle_list_command(engine: &mut Engine, args: &str) {
    start_listing(engine, args, false);
}

/// Handles the NLST command: names only.
pub fn handle_nlst_command(engine: &mut Engine, args: &str) {
    start_listing(engine, args, true);
}

/// Opens the directory and hands over to the engine, which streams the
/// listing over the data connection across the following ticks.
fn start_listing(engine: &mut Engine, args: &str, nlist: bool) {
    let path = get_param_and_open_child(&mut engine.session, skip_list_options(args));

    if !engine.has_data_connection() {
        warn!("LIST without data connection");
        engine.send_reply(425, "Use PASV first.");
        return;
    }

    engine.session.nlist = nlist;
    match engine.storage.open_dir_for_listing(&path) {
        Ok(()) => {
            info!("Listing {}", path);
            engine.session.state = ControlState::ContinueListing;
            engine.send_reply(150, "Here comes the directory listing.");
        }
        Err(e) => {
            warn!("Cannot list {}: {}", path, e);
            let (code, message) = e.to_ftp_response();
            engine.send_reply(code, message);
        }
    }
}
