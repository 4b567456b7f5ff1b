use crate::constants::{FTP_CMD_SIZE_MAX, FTP_MAX_PARAM_SIZE};
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_vfs::path::open_child;
use crate::session::Session;
use zeroize::Zeroize;

/// Extracts one parameter from `input` and returns it with the unconsumed rest.
///
/// Leading spaces are skipped. A parameter opening with `"` runs to the
/// closing quote, spaces included. Repeated `/` collapse into one, and at most
/// `max_len - 1` bytes are kept. Trailing spaces and line terminators are
/// trimmed.
pub fn pop_param(
    input: &str,
    max_len: usize,
    stop_on_space: bool,
    stop_on_newline: bool,
) -> (String, &str) {
    let mut rest = input.trim_start_matches(' ');
    let in_quotes = rest.starts_with('"');
    if in_quotes {
        rest = &rest[1..];
    }

    let mut param = String::new();
    let mut lastc = '\0';
    let mut consumed = rest.len();
    for (idx, c) in rest.char_indices() {
        if in_quotes && c == '"' {
            consumed = idx + 1;
            break;
        }
        if !in_quotes && stop_on_space && c == ' ' {
            consumed = idx;
            break;
        }
        if c == '\r' || c == '\n' {
            if stop_on_newline {
                consumed = idx;
                break;
            }
            continue;
        }
        if c == '/' && lastc == '/' {
            continue;
        }
        lastc = c;
        if param.len() + c.len_utf8() < max_len {
            param.push(c);
        }
    }

    let trimmed_len = param.trim_end_matches([' ', '\r', '\n']).len();
    param.truncate(trimmed_len);
    (param, &rest[consumed..])
}

/// Pops the command keyword. Unknown keywords come back as `None`.
pub fn pop_command(input: &str) -> (Option<FtpCommand>, &str) {
    let (keyword, rest) = pop_param(input, FTP_CMD_SIZE_MAX, true, true);
    (FtpCommand::from_str(&keyword), rest)
}

/// Pops the parameter of a file-targeted command, folds it into the working
/// path and returns the resulting path. The engine strips the parameter back
/// off the working path once the command is done.
pub fn get_param_and_open_child(session: &mut Session, args: &str) -> String {
    let (param, _) = pop_param(args, FTP_MAX_PARAM_SIZE, false, false);
    open_child(&mut session.ftp_path, &param);
    session.closechild = true;
    session.scratch.zeroize();
    session.scratch.push_str(&param);
    session.ftp_path.clone()
}

/// Skips `-la`-style switches in front of a LIST/NLST path.
pub fn skip_list_options(args: &str) -> &str {
    let mut rest = args.trim_start();
    while rest.starts_with('-') {
        rest = match rest.find(char::is_whitespace) {
            Some(idx) => rest[idx..].trim_start(),
            None => "",
        };
    }
    rest
}
