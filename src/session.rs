use crate::constants::{FTP_CMD_SIZE_MAX, FTP_MAX_PARAM_SIZE};
use crate::error::FtpError;
use zeroize::{Zeroize, Zeroizing};

/// Control state of the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControlState {
    Disabled = 0,
    Start,
    Ready,
    EndTransfer,
    ContinueListing,
    ContinueFileTx,
    ContinueFileRx,
    /// Only reported by status queries: `Ready` with a client on the control socket.
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Disconnected = 0,
    ListenForData,
    DataConnected,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Login {
    pub user_valid: bool,
    pub pass_valid: bool,
}

/// Snapshot published to the facade after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStatus {
    pub state: ControlState,
    pub substate: DataState,
    pub enabled: bool,
    /// Port of the control listener once it is bound.
    pub port: Option<u16>,
}

impl Default for ServerStatus {
    fn default() -> Self {
        Self {
            state: ControlState::Disabled,
            substate: DataState::Disconnected,
            enabled: false,
            port: None,
        }
    }
}

impl ServerStatus {
    /// State in the low byte, data substate in the second byte.
    pub fn code(&self) -> u32 {
        (self.state as u32) | ((self.substate as u32) << 8)
    }
}

/// Everything the engine tracks for the current client.
pub struct Session {
    pub state: ControlState,
    pub substate: DataState,
    pub ctimeout: u64,
    pub dtimeout: u64,
    /// Elapsed time of the current transfer, for logging only.
    pub time: u64,
    pub total: u64,
    pub login: Login,
    pub login_retries: u8,
    pub ftp_path: String,
    pub closechild: bool,
    pub nlist: bool,
    pub rename_from: Option<String>,
    /// Decoded parameter of the command being processed. Cleared after USER/PASS.
    pub scratch: Zeroizing<String>,
    /// Bytes received on the control socket that do not form a full line yet.
    pub pending: Vec<u8>,
    pub data_buf: Vec<u8>,
}

impl Session {
    pub fn new(buffer_size: usize) -> Result<Self, FtpError> {
        let cmd_cap = FTP_MAX_PARAM_SIZE + FTP_CMD_SIZE_MAX;

        let mut pending = Vec::new();
        pending.try_reserve_exact(cmd_cap)?;
        let mut data_buf = Vec::new();
        data_buf.try_reserve_exact(buffer_size)?;
        data_buf.resize(buffer_size, 0);
        let mut scratch = String::new();
        scratch.try_reserve_exact(FTP_MAX_PARAM_SIZE)?;

        Ok(Self {
            state: ControlState::Disabled,
            substate: DataState::Disconnected,
            ctimeout: 0,
            dtimeout: 0,
            time: 0,
            total: 0,
            login: Login::default(),
            login_retries: 0,
            ftp_path: String::from("/"),
            closechild: false,
            nlist: false,
            rename_from: None,
            scratch: Zeroizing::new(scratch),
            pending,
            data_buf,
        })
    }

    /// Per-connection reset, done when a new client is accepted.
    pub fn reset_for_client(&mut self) {
        self.ctimeout = 0;
        self.login = Login::default();
        self.login_retries = 0;
        self.ftp_path.clear();
        self.ftp_path.push('/');
        self.rename_from = None;
        self.pending.clear();
        self.scratch.zeroize();
    }

    pub fn is_logged_in(&self) -> bool {
        self.login.pass_valid
    }

    pub fn start_transfer(&mut self) {
        self.total = 0;
        self.time = 0;
    }
}
