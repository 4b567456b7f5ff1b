use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::engine::Engine;
use std::collections::HashMap;

// PASV lives with the transport code
use crate::core_network::pasv;

/// A command handler receives the engine and the raw remainder of the
/// command line (everything after the keyword).
pub type CommandHandler = fn(&mut Engine, &str);

pub fn initialize_command_handlers() -> HashMap<FtpCommand, CommandHandler> {
    let mut handlers: HashMap<FtpCommand, CommandHandler> = HashMap::new();

    handlers.insert(FtpCommand::FEAT, crate::core_ftpcommand::feat::handle_feat_command);
    handlers.insert(FtpCommand::AUTH, crate::core_ftpcommand::auth::handle_auth_command);
    handlers.insert(FtpCommand::SYST, crate::core_ftpcommand::syst::handle_syst_command);
    handlers.insert(FtpCommand::CDUP, crate::core_ftpcommand::cdup::handle_cdup_command);
    handlers.insert(FtpCommand::CWD, crate::core_ftpcommand::cwd::handle_cwd_command);
    handlers.insert(FtpCommand::PWD, crate::core_ftpcommand::pwd::handle_pwd_command);
    handlers.insert(FtpCommand::XPWD, crate::core_ftpcommand::pwd::handle_pwd_command);
    handlers.insert(FtpCommand::SIZE, crate::core_ftpcommand::size::handle_size_command);
    handlers.insert(FtpCommand::MDTM, crate::core_ftpcommand::mdtm::handle_mdtm_command);
    handlers.insert(FtpCommand::TYPE, crate::core_ftpcommand::type_::handle_type_command);
    handlers.insert(FtpCommand::NOOP, crate::core_ftpcommand::noop::handle_noop_command);
    handlers.insert(FtpCommand::USER, crate::core_ftpcommand::user::handle_user_command);
    handlers.insert(FtpCommand::PASS, crate::core_ftpcommand::pass::handle_pass_command);
    handlers.insert(FtpCommand::PASV, pasv::handle_pasv_command);
    handlers.insert(FtpCommand::LIST, crate::core_ftpcommand::list::handle_list_command);
    handlers.insert(FtpCommand::NLST, crate::core_ftpcommand::list::handle_nlst_command);
    handlers.insert(FtpCommand::RETR, crate::core_ftpcommand::retr::handle_retr_command);
    handlers.insert(FtpCommand::STOR, crate::core_ftpcommand::stor::handle_stor_command);
    handlers.insert(FtpCommand::APPE, crate::core_ftpcommand::stor::handle_appe_command);
    handlers.insert(FtpCommand::DELE, crate::core_ftpcommand::dele::handle_dele_command);
    handlers.insert(FtpCommand::RMD, crate::core_ftpcommand::rmd::handle_rmd_command);
    handlers.insert(FtpCommand::MKD, crate::core_ftpcommand::mkd::handle_mkd_command);
    handlers.insert(FtpCommand::RNFR, crate::core_ftpcommand::rnfr::handle_rnfr_command);
    handlers.insert(FtpCommand::RNTO, crate::core_ftpcommand::rnto::handle_rnto_command);
    handlers.insert(FtpCommand::QUIT, crate::core_ftpcommand::quit::handle_quit_command);

    handlers
}
