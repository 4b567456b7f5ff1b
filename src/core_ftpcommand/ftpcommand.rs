#[allow(clippy::upper_case_acronyms)]
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    FEAT,
    SYST,
    CDUP,
    CWD,
    PWD,
    XPWD,
    SIZE,
    MDTM,
    TYPE,
    USER,
    PASS,
    PASV,
    LIST,
    RETR,
    STOR,
    DELE,
    RMD,
    MKD,
    RNFR,
    RNTO,
    NOOP,
    QUIT,
    APPE,
    NLST,
    AUTH,
}

const COMMAND_TABLE: [(&str, FtpCommand); 25] = [
    ("FEAT", FtpCommand::FEAT),
    ("SYST", FtpCommand::SYST),
    ("CDUP", FtpCommand::CDUP),
    ("CWD", FtpCommand::CWD),
    ("PWD", FtpCommand::PWD),
    ("XPWD", FtpCommand::XPWD),
    ("SIZE", FtpCommand::SIZE),
    ("MDTM", FtpCommand::MDTM),
    ("TYPE", FtpCommand::TYPE),
    ("USER", FtpCommand::USER),
    ("PASS", FtpCommand::PASS),
    ("PASV", FtpCommand::PASV),
    ("LIST", FtpCommand::LIST),
    ("RETR", FtpCommand::RETR),
    ("STOR", FtpCommand::STOR),
    ("DELE", FtpCommand::DELE),
    ("RMD", FtpCommand::RMD),
    ("MKD", FtpCommand::MKD),
    ("RNFR", FtpCommand::RNFR),
    ("RNTO", FtpCommand::RNTO),
    ("NOOP", FtpCommand::NOOP),
    ("QUIT", FtpCommand::QUIT),
    ("APPE", FtpCommand::APPE),
    ("NLST", FtpCommand::NLST),
    ("AUTH", FtpCommand::AUTH),
];

impl FtpCommand {
    /// Case-insensitive lookup in the command table.
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        let upper = cmd.to_ascii_uppercase();
        COMMAND_TABLE
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, command)| *command)
    }

    pub fn as_str(&self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(_, command)| command == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}
