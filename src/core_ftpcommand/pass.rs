use crate::constants::FTP_MAX_PARAM_SIZE;
use crate::core_auth::helper::login_backoff;
use crate::core_ftpcommand::parser::pop_param;
use crate::engine::Engine;
use log::{info, warn};
use std::thread;
use zeroize::Zeroize;

/// Handles the PASS FTP command.
///
/// After `FTP_MAX_LOGIN_RETRIES` failures on the same connection every
/// further attempt is delayed before it is evaluated (1 s per extra failure,
/// capped at 5 s). Success needs a matching USER first.
pub fn handle_pass_command(engine: &mut Engine, args: &str) {
    let (mut password, _) = pop_param(args, FTP_MAX_PARAM_SIZE, true, true);
    engine.session.scratch.zeroize();
    engine.session.scratch.push_str(&password);
    password.zeroize();

    if let Some(delay) = login_backoff(engine.session.login_retries) {
        warn!("Login rate limited, delaying {} ms", delay.as_millis());
        thread::sleep(delay);
    }

    let valid = engine.session.login.user_valid
        && engine.credentials.verify_password(&engine.session.scratch);
    engine.session.scratch.zeroize();

    if valid {
        engine.session.login.pass_valid = true;
        engine.session.login_retries = 0;
        info!("User {} logged in.", engine.credentials.get_username());
        engine.screen.log("[OK] User logged in");
        engine.send_reply(230, "User logged in, proceed.");
        return;
    }

    engine.session.login_retries = engine.session.login_retries.saturating_add(1);
    warn!("Login failed ({} attempts)", engine.session.login_retries);
    engine.screen.log("[!!] Login failed");
    engine.send_reply(530, "Not logged in.");
}
