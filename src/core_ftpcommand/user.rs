use crate::constants::FTP_MAX_PARAM_SIZE;
use crate::core_ftpcommand::parser::pop_param;
use crate::engine::Engine;
use log::info;
use zeroize::Zeroize;

/// Handles the USER FTP command.
///
/// The name is compared in constant time against the configured user and
/// wiped from the scratch buffer right after. The reply is always 331 so a
/// client cannot probe for valid user names.
pub fn handle_user_command(engine: &mut Engine, args: &str) {
    let (mut username, _) = pop_param(args, FTP_MAX_PARAM_SIZE, true, true);
    engine.session.scratch.zeroize();
    engine.session.scratch.push_str(&username);
    username.zeroize();

    if engine.credentials.verify_username(&engine.session.scratch) {
        engine.session.login.user_valid = true;
    }
    engine.session.scratch.zeroize();

    info!("USER received, awaiting password.");
    engine.send_reply(331, "User name okay, need password.");
}
