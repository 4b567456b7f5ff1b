//! FTP protocol engine.
//!
//! One client at a time, driven by [`Engine::run`] on every scheduler tick.
//! Nothing in here blocks for longer than the bounded send retry, so the
//! caller can share its thread with other cooperative work.

use crate::config::ServerConfig;
use crate::constants::{
    FTP_CMD_SIZE_MAX, FTP_MAX_PARAM_SIZE, FTP_PROGRESS_INTERVAL, FTP_SEND_TIMEOUT_MS,
};
use crate::core_auth::Credentials;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::handlers::{initialize_command_handlers, CommandHandler};
use crate::core_ftpcommand::parser::pop_command;
use crate::core_log::ScreenLog;
use crate::core_network::network::{
    create_listening_socket, local_ipv4, recv_non_blocking, send_bounded, wait_for_connection,
};
use crate::core_vfs::path::remove_fname_from_path;
use crate::core_vfs::{Storage, Vfs};
use crate::error::{FtpError, Outcome};
use crate::session::{ControlState, DataState, ServerStatus, Session};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

/// Requests the facade forwards to the task owning the engine.
#[derive(Debug)]
pub enum ControlMessage {
    SetCredentials(Credentials),
    SetPort(u16),
}

enum Received {
    Line(String),
    Pending,
    Closed,
}

pub struct Engine {
    pub(crate) config: ServerConfig,
    pub(crate) credentials: Credentials,
    pub(crate) cmd_port: u16,
    pub(crate) enabled: bool,
    pub(crate) session: Session,
    pub(crate) storage: Storage,
    pub(crate) screen: Arc<ScreenLog>,
    pub(crate) listen_cmd: Option<TcpListener>,
    pub(crate) listen_data: Option<TcpListener>,
    pub(crate) ctrl: Option<TcpStream>,
    pub(crate) data: Option<TcpStream>,
    pub(crate) local_ip: Ipv4Addr,
    handlers: HashMap<FtpCommand, CommandHandler>,
}

impl Engine {
    /// Allocates the session buffers. Nothing is bound until the engine is
    /// enabled and ticked.
    pub fn init(
        config: ServerConfig,
        credentials: Credentials,
        screen: Arc<ScreenLog>,
    ) -> Result<Self, FtpError> {
        config.validate()?;
        let session = Session::new(config.buffer_size)?;
        let storage = Storage::new(
            Vfs::from_config(&config),
            Duration::from_millis(config.settle_delay_ms),
            Arc::clone(&screen),
        );
        Ok(Self {
            cmd_port: config.listen_port,
            config,
            credentials,
            enabled: false,
            session,
            storage,
            screen,
            listen_cmd: None,
            listen_data: None,
            ctrl: None,
            data: None,
            local_ip: Ipv4Addr::LOCALHOST,
            handlers: initialize_command_handlers(),
        })
    }

    pub fn enable(&mut self) -> bool {
        if self.session.state == ControlState::Disabled {
            self.enabled = true;
            return true;
        }
        false
    }

    pub fn disable(&mut self) -> bool {
        if self.session.state == ControlState::Ready {
            self.reset();
            self.enabled = false;
            self.session.state = ControlState::Disabled;
            return true;
        }
        false
    }

    pub fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetCredentials(credentials) => {
                info!("Credentials updated for user {}", credentials.get_username());
                self.credentials = credentials;
            }
            ControlMessage::SetPort(port) => {
                info!("Command port set to {}, used from the next session start", port);
                self.cmd_port = port;
            }
        }
    }

    pub fn status(&self) -> ServerStatus {
        let state = if self.session.state == ControlState::Ready && self.ctrl.is_some() {
            ControlState::Connected
        } else {
            self.session.state
        };
        ServerStatus {
            state,
            substate: self.session.substate,
            enabled: self.enabled,
            port: self.control_port(),
        }
    }

    pub fn state(&self) -> ControlState {
        self.session.state
    }

    pub fn substate(&self) -> DataState {
        self.session.substate
    }

    /// Port the control listener is bound to, if any.
    pub fn control_port(&self) -> Option<u16> {
        self.listen_cmd
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|addr| addr.port())
    }

    /// Bytes moved by the current (or last) RETR/STOR/APPE.
    pub fn transferred(&self) -> u64 {
        self.session.total
    }

    pub fn current_path(&self) -> &str {
        &self.session.ftp_path
    }

    /// Advances the state machines by one tick. Breaks when the control
    /// listener cannot be bound.
    pub fn run(&mut self, elapsed_ms: u64) -> ControlFlow<FtpError> {
        self.session.dtimeout = self.session.dtimeout.saturating_add(elapsed_ms);
        self.session.ctimeout = self.session.ctimeout.saturating_add(elapsed_ms);
        self.session.time = self.session.time.saturating_add(elapsed_ms);

        match self.session.state {
            ControlState::Disabled => {
                if self.enabled {
                    self.session.state = ControlState::Start;
                }
            }
            ControlState::Start => {
                if let Err(e) = self.ensure_control_listener() {
                    return ControlFlow::Break(e);
                }
                self.session.state = ControlState::Ready;
            }
            ControlState::Ready => self.ready(),
            ControlState::EndTransfer => {
                self.close_data();
                self.session.substate = DataState::Disconnected;
                self.session.state = ControlState::Ready;
            }
            ControlState::ContinueListing => self.continue_listing(),
            ControlState::ContinueFileTx => self.continue_file_tx(),
            ControlState::ContinueFileRx => self.continue_file_rx(),
            ControlState::Connected => self.session.state = ControlState::Ready,
        }

        self.run_data_substate();
        ControlFlow::Continue(())
    }

    fn ensure_control_listener(&mut self) -> Result<(), FtpError> {
        let bound = self.control_port();
        let reusable = match bound {
            Some(port) => self.cmd_port == 0 || port == self.cmd_port,
            None => false,
        };
        if reusable {
            return Ok(());
        }

        self.listen_cmd = None;
        match create_listening_socket(self.cmd_port) {
            Ok(listener) => {
                self.listen_cmd = Some(listener);
                let port = self.control_port().unwrap_or(self.cmd_port);
                info!("FTP server listening on port {}", port);
                self.screen.log(&format!("[OK] Listening on port {}", port));
                Ok(())
            }
            Err(e) => {
                error!("Cannot listen on port {}: {}", self.cmd_port, e);
                self.screen
                    .log(&format!("[!!] Cannot listen on port {}", self.cmd_port));
                Err(FtpError::Io(e))
            }
        }
    }

    fn ready(&mut self) {
        if self.ctrl.is_none() && self.session.substate == DataState::Disconnected {
            let accepted = match self.listen_cmd.as_ref() {
                Some(listener) => wait_for_connection(listener),
                None => {
                    self.session.state = ControlState::Start;
                    return;
                }
            };
            match accepted {
                Ok(Some(stream)) => {
                    self.local_ip = local_ipv4(&stream);
                    if let Ok(peer) = stream.peer_addr() {
                        self.screen.log(&format!("[OK] Client connected: {}", peer.ip()));
                    }
                    self.ctrl = Some(stream);
                    self.session.reset_for_client();
                    info!("Connected.");
                    let banner = self.config.banner.clone();
                    self.send_reply(220, &banner);
                    return;
                }
                Ok(None) => {}
                Err(_) => {
                    self.reset();
                    return;
                }
            }
        }

        if self.ctrl.is_some() && self.session.substate != DataState::ListenForData {
            self.process_cmd();
        }
    }

    /// Reads at most one command line and dispatches it.
    pub fn process_cmd(&mut self) {
        self.session.closechild = false;

        let line = match self.receive_line() {
            Received::Line(line) => line,
            Received::Pending => {
                if self.session.ctimeout > self.config.cmd_timeout_ms {
                    warn!("Connection timeout");
                    self.screen.log("[!!] Client idle timeout");
                    self.send_reply(221, "Idle timeout, closing control connection.");
                }
                return;
            }
            Received::Closed => {
                info!("Client disconnected");
                self.screen.log("[--] Client disconnected");
                self.close_cmd_data();
                self.session.substate = DataState::Disconnected;
                return;
            }
        };

        self.session.ctimeout = 0;
        let (cmd, args) = pop_command(&line);

        if !self.session.is_logged_in()
            && !matches!(
                cmd,
                Some(FtpCommand::USER)
                    | Some(FtpCommand::PASS)
                    | Some(FtpCommand::QUIT)
                    | Some(FtpCommand::FEAT)
                    | Some(FtpCommand::AUTH)
            )
        {
            self.send_reply(332, "Need account for login.");
            return;
        }

        let saved_path = self.session.ftp_path.clone();
        match cmd.and_then(|c| self.handlers.get(&c).copied().map(|h| (c, h))) {
            Some((command, handler)) => {
                info!("CMD: {}", command.as_str());
                handler(self, args);
            }
            None => {
                debug!("Unsupported command: {}", line.trim_end());
                self.send_reply(502, "Command not implemented.");
            }
        }

        if self.session.closechild {
            if self.session.scratch.starts_with('/') {
                self.session.ftp_path = saved_path;
            } else {
                remove_fname_from_path(&mut self.session.ftp_path, &self.session.scratch);
            }
        }
    }

    fn receive_line(&mut self) -> Received {
        let cap = FTP_MAX_PARAM_SIZE + FTP_CMD_SIZE_MAX - 1;
        if let Some(line) = take_line(&mut self.session.pending, cap) {
            return Received::Line(line);
        }

        let ctrl = match self.ctrl.as_mut() {
            Some(ctrl) => ctrl,
            None => return Received::Closed,
        };
        let mut buf = [0u8; FTP_MAX_PARAM_SIZE + FTP_CMD_SIZE_MAX];
        let room = cap.saturating_sub(self.session.pending.len()).max(1);
        match recv_non_blocking(ctrl, &mut buf[..room]) {
            (Outcome::Ok, n) => {
                self.session.pending.extend_from_slice(&buf[..n]);
                match take_line(&mut self.session.pending, cap) {
                    Some(line) => Received::Line(line),
                    None => Received::Pending,
                }
            }
            (Outcome::Continue, _) => Received::Pending,
            (Outcome::Failed, _) => Received::Closed,
        }
    }

    /// Sends `"<code> <message>\r\n"` on the control connection.
    ///
    /// 221 tears down every connection of the session, 426/451/550 drop the
    /// data connection and any open handle. A failed send resets the server.
    pub fn send_reply(&mut self, code: u32, message: &str) {
        let mut reply = format!("{} {}\r\n", code, message);
        let cap = FTP_MAX_PARAM_SIZE + FTP_CMD_SIZE_MAX - 1;
        if reply.len() > cap {
            warn!("Reply truncated (status={})", code);
            let mut end = cap - 2;
            while !reply.is_char_boundary(end) {
                end -= 1;
            }
            reply.truncate(end);
            reply.push_str("\r\n");
        }

        let ctrl = match self.ctrl.as_mut() {
            Some(ctrl) => ctrl,
            None => {
                debug!("No control connection for reply {}", code);
                return;
            }
        };

        match send_bounded(
            ctrl,
            reply.as_bytes(),
            Duration::from_millis(FTP_SEND_TIMEOUT_MS),
        ) {
            Ok(()) => {
                debug!("Reply: {}", reply.trim_end());
                match code {
                    221 => {
                        self.data = None;
                        self.listen_data = None;
                        self.ctrl = None;
                        self.session.substate = DataState::Disconnected;
                        self.storage.close_filesystem_on_error();
                    }
                    426 | 451 | 550 => {
                        self.close_data();
                        self.storage.close_filesystem_on_error();
                    }
                    _ => {}
                }
            }
            Err(e) => {
                warn!("Error sending command reply: {}", e);
                self.reset();
            }
        }
    }

    /// Sends `len` bytes of the data buffer on the data connection.
    pub fn send_data(&mut self, len: usize) -> bool {
        let data = match self.data.as_mut() {
            Some(data) => data,
            None => return false,
        };
        match send_bounded(
            data,
            &self.session.data_buf[..len],
            Duration::from_millis(FTP_SEND_TIMEOUT_MS),
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error sending data: {}", e);
                self.reset();
                false
            }
        }
    }

    pub fn has_data_connection(&self) -> bool {
        self.data.is_some() && self.session.substate == DataState::DataConnected
    }

    pub fn close_data(&mut self) {
        self.data = None;
        if self.session.substate == DataState::DataConnected {
            self.session.substate = DataState::Disconnected;
        }
    }

    pub fn close_cmd_data(&mut self) {
        self.ctrl = None;
        self.close_data();
        self.storage.close_filesystem_on_error();
    }

    /// Closes every socket and handle and goes back to listening.
    pub fn reset(&mut self) {
        warn!("FTP RESET");
        self.listen_cmd = None;
        self.listen_data = None;
        self.close_cmd_data();
        self.session.pending.clear();
        self.session.state = ControlState::Start;
        self.session.substate = DataState::Disconnected;
    }

    fn continue_listing(&mut self) {
        let nlist = self.session.nlist;
        let (result, len) = self.storage.list_dir(&mut self.session.data_buf, nlist);
        if len > 0 && !self.send_data(len) {
            return;
        }
        match result {
            Outcome::Ok => {
                self.send_reply(226, "Transfer complete.");
                self.session.state = ControlState::EndTransfer;
            }
            Outcome::Failed => {
                self.send_reply(451, "Requested action aborted. Local error in processing.");
                self.session.state = ControlState::EndTransfer;
            }
            Outcome::Continue => {}
        }
        self.session.ctimeout = 0;
    }

    fn continue_file_tx(&mut self) {
        self.session.ctimeout = 0;
        let (result, len) = self.storage.read_file(&mut self.session.data_buf);
        if result == Outcome::Failed {
            self.send_reply(451, "Requested action aborted. Local error in processing.");
            self.session.state = ControlState::EndTransfer;
            return;
        }
        if len > 0 {
            if !self.send_data(len) {
                return;
            }
            self.add_progress(len);
        }
        if result == Outcome::Ok {
            self.send_reply(226, "Transfer complete.");
            self.session.state = ControlState::EndTransfer;
            info!(
                "File sent ({} bytes in {} msec).",
                self.session.total, self.session.time
            );
            self.screen
                .log(&format!("[OK] Sent {} KB", self.session.total / 1024));
        }
    }

    fn continue_file_rx(&mut self) {
        let data = match self.data.as_mut() {
            Some(data) => data,
            None => {
                warn!("Data connection lost during upload");
                self.storage.close_files_dir();
                self.session.state = ControlState::EndTransfer;
                return;
            }
        };

        let (result, len) = recv_non_blocking(data, &mut self.session.data_buf);
        match result {
            Outcome::Ok => {
                self.session.dtimeout = 0;
                self.session.ctimeout = 0;
                if self.storage.write_file(&self.session.data_buf[..len]) != Outcome::Ok {
                    warn!("Error writing to file");
                    self.send_reply(451, "Requested action aborted. Local error in processing.");
                    self.session.state = ControlState::EndTransfer;
                } else {
                    self.add_progress(len);
                }
            }
            Outcome::Continue => {
                if self.session.dtimeout > self.config.data_timeout_ms {
                    warn!("Receiving to file timeout");
                    self.storage.close_files_dir();
                    self.send_reply(426, "Connection closed; transfer aborted.");
                    self.session.state = ControlState::EndTransfer;
                }
            }
            Outcome::Failed => {
                self.storage.close_files_dir();
                self.send_reply(226, "Transfer complete.");
                self.session.state = ControlState::EndTransfer;
                info!(
                    "File received ({} bytes in {} msec).",
                    self.session.total, self.session.time
                );
                self.screen
                    .log(&format!("[OK] Received {} KB", self.session.total / 1024));
            }
        }
    }

    fn add_progress(&mut self, len: usize) {
        let before = self.session.total;
        self.session.total += len as u64;
        debug!("Moved {}, total: {}", len, self.session.total);
        if before / FTP_PROGRESS_INTERVAL != self.session.total / FTP_PROGRESS_INTERVAL {
            self.screen.progress(&format!(
                "[^^] Progress: {} KB",
                self.session.total / 1024
            ));
        }
    }

    fn run_data_substate(&mut self) {
        match self.session.substate {
            DataState::Disconnected => {}
            DataState::ListenForData => {
                let accepted = match self.listen_data.as_ref() {
                    Some(listener) => wait_for_connection(listener),
                    None => {
                        self.session.substate = DataState::Disconnected;
                        return;
                    }
                };
                match accepted {
                    Ok(Some(stream)) => {
                        debug!("Data connection established");
                        self.session.dtimeout = 0;
                        self.data = Some(stream);
                        self.session.substate = DataState::DataConnected;
                    }
                    Ok(None) => {
                        if self.session.dtimeout > self.config.data_timeout_ms {
                            warn!(
                                "Waiting for data connection timeout ({})",
                                self.session.dtimeout
                            );
                            self.session.dtimeout = 0;
                            self.listen_data = None;
                            self.session.substate = DataState::Disconnected;
                        }
                    }
                    Err(_) => self.reset(),
                }
            }
            DataState::DataConnected => {
                if self.session.state == ControlState::Ready
                    && self.session.dtimeout > self.config.data_timeout_ms
                {
                    warn!("Data connection timeout");
                    self.listen_data = None;
                    self.data = None;
                    self.storage.close_filesystem_on_error();
                    self.session.substate = DataState::Disconnected;
                }
            }
        }
    }
}

/// Pops the first complete line off `pending`. A full buffer without a line
/// terminator is handed out as one (truncated) line.
fn take_line(pending: &mut Vec<u8>, cap: usize) -> Option<String> {
    let end = match pending.iter().position(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        None if pending.len() >= cap => pending.len(),
        None => return None,
    };
    let line: Vec<u8> = pending.drain(..end).collect();
    Some(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_line_one_at_a_time() {
        let mut pending = b"USER a\r\nPASS b\r\nNO".to_vec();
        assert_eq!(take_line(&mut pending, 100).as_deref(), Some("USER a\r\n"));
        assert_eq!(take_line(&mut pending, 100).as_deref(), Some("PASS b\r\n"));
        assert_eq!(take_line(&mut pending, 100), None);
        assert_eq!(pending, b"NO");
    }

    #[test]
    fn test_take_line_overlong() {
        let mut pending = vec![b'x'; 10];
        assert_eq!(take_line(&mut pending, 10).map(|l| l.len()), Some(10));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_disabled_engine_waits_for_enable() {
        let config = ServerConfig {
            listen_port: 0,
            settle_delay_ms: 0,
            ..Default::default()
        };
        let mut engine = Engine::init(
            config,
            Credentials::new("u", "p"),
            Arc::new(ScreenLog::new()),
        )
        .unwrap();
        assert!(engine.run(1).is_continue());
        assert_eq!(engine.state(), ControlState::Disabled);
        assert!(!engine.disable());

        assert!(engine.enable());
        assert!(engine.run(1).is_continue());
        assert_eq!(engine.state(), ControlState::Start);
        assert!(engine.run(1).is_continue());
        assert_eq!(engine.state(), ControlState::Ready);
        assert!(engine.control_port().is_some());

        assert!(engine.disable());
        assert_eq!(engine.state(), ControlState::Disabled);
        assert!(engine.control_port().is_none());
    }
}
