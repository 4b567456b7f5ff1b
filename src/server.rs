//! Public facade of the FTP server.
//!
//! The engine runs on its own thread. Facade calls never touch the engine
//! directly: configuration changes travel over a channel, and the task
//! publishes a status snapshot after every tick.

use crate::config::ServerConfig;
use crate::constants::{FTP_STOP_TIMEOUT, FTP_TASK_STACK_SIZE, FTP_TASK_TICK};
use crate::core_auth::Credentials;
use crate::core_log::{ScreenLog, ScreenLogCallback};
use crate::engine::{ControlMessage, Engine};
use crate::error::FtpError;
use crate::session::ServerStatus;
use log::{debug, error, info, warn};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Task {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    control: Sender<ControlMessage>,
}

struct Inner {
    config: ServerConfig,
    credentials: Credentials,
    task: Option<Task>,
}

pub struct FtpServer {
    inner: Mutex<Inner>,
    status: Arc<Mutex<ServerStatus>>,
    screen: Arc<ScreenLog>,
}

impl FtpServer {
    pub fn new(config: ServerConfig) -> Self {
        let credentials = Credentials::new(&config.username, &config.password);
        Self {
            inner: Mutex::new(Inner {
                config,
                credentials,
                task: None,
            }),
            status: Arc::new(Mutex::new(ServerStatus::default())),
            screen: Arc::new(ScreenLog::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the server task. Does nothing if it is already running.
    pub fn start(&self) -> Result<(), FtpError> {
        let mut inner = self.lock();

        if let Some(task) = inner.task.take() {
            if !task.handle.is_finished() {
                debug!("FTP task already running");
                inner.task = Some(task);
                return Ok(());
            }
            // The previous task ended on its own (bind failure or init error).
            let _ = task.handle.join();
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let (control_tx, control_rx) = mpsc::channel();

        let config = inner.config.clone();
        let credentials = inner.credentials.clone().or_fallback();
        let screen = Arc::clone(&self.screen);
        let status = Arc::clone(&self.status);
        let task_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("ftp".to_string())
            .stack_size(FTP_TASK_STACK_SIZE)
            .spawn(move || {
                task_loop(config, credentials, screen, status, task_stop, control_rx);
                let _ = done_tx.send(());
            })
            .map_err(|e| {
                error!("Failed to create FTP task: {}", e);
                FtpError::Spawn(e.to_string())
            })?;

        inner.task = Some(Task {
            handle,
            stop,
            done: done_rx,
            control: control_tx,
        });
        info!("FTP task started");
        Ok(())
    }

    /// Asks the task to stop and waits up to five seconds for it.
    ///
    /// On timeout the thread is detached: it still owns its sockets and exits
    /// as soon as it sees the stop flag, but the facade is usable again right
    /// away.
    pub fn stop(&self) -> Result<(), FtpError> {
        let task = self.lock().task.take();
        let task = match task {
            Some(task) => task,
            None => {
                debug!("FTP task not running");
                return Ok(());
            }
        };

        task.stop.store(true, Ordering::SeqCst);
        let result = match task.done.recv_timeout(FTP_STOP_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if task.handle.join().is_err() {
                    error!("FTP task panicked");
                }
                info!("FTP task stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("FTP task did not stop within {:?}, detaching it", FTP_STOP_TIMEOUT);
                Err(FtpError::StopTimeout(FTP_STOP_TIMEOUT))
            }
        };

        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = ServerStatus::default();
        self.screen.log("[--] FTP server stopped");
        result
    }

    pub fn is_enabled(&self) -> bool {
        let running = self
            .lock()
            .task
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false);
        running && self.status().enabled
    }

    pub fn status(&self) -> ServerStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bitpacked state: control state in the low byte, data substate above.
    pub fn state(&self) -> u32 {
        self.status().code()
    }

    /// Applies to the running session immediately (next PASS) and to every
    /// later start. Empty fields fall back to the built-in account.
    pub fn set_credentials(&self, username: &str, password: &str) {
        let mut inner = self.lock();
        inner.credentials = Credentials::new(username, password);
        if let Some(task) = inner.task.as_ref() {
            let credentials = inner.credentials.clone().or_fallback();
            if task
                .control
                .send(ControlMessage::SetCredentials(credentials))
                .is_err()
            {
                debug!("FTP task gone, credentials kept for the next start");
            }
        }
    }

    /// The new port is bound the next time the server starts listening.
    pub fn set_port(&self, port: u16) {
        let mut inner = self.lock();
        inner.config.listen_port = port;
        if let Some(task) = inner.task.as_ref() {
            if task.control.send(ControlMessage::SetPort(port)).is_err() {
                debug!("FTP task gone, port kept for the next start");
            }
        }
    }

    pub fn register_screen_log_callback(&self, callback: Option<ScreenLogCallback>) {
        self.screen.register(callback);
    }

    /// Polls the published status until the control listener is bound.
    pub fn wait_until_listening(&self, timeout: Duration) -> Option<u16> {
        let started = Instant::now();
        while started.elapsed() < timeout {
            if let Some(port) = self.status().port {
                return Some(port);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }
}

impl Drop for FtpServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Stopping FTP server on drop: {}", e);
        }
    }
}

fn publish(status: &Mutex<ServerStatus>, value: ServerStatus) {
    *status.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

fn task_loop(
    config: ServerConfig,
    credentials: Credentials,
    screen: Arc<ScreenLog>,
    status: Arc<Mutex<ServerStatus>>,
    stop: Arc<AtomicBool>,
    control: Receiver<ControlMessage>,
) {
    info!("ftp_task start");
    let mut engine = match Engine::init(config, credentials, Arc::clone(&screen)) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Init Error: {}", e);
            screen.log("[!!] FTP server init failed");
            return;
        }
    };
    engine.enable();
    screen.log("[OK] FTP server started");

    let mut last = Instant::now();
    loop {
        if stop.load(Ordering::SeqCst) {
            info!("Stop requested, exiting task loop");
            break;
        }
        while let Ok(message) = control.try_recv() {
            engine.apply(message);
        }

        let elapsed = last.elapsed().as_millis() as u64;
        last += Duration::from_millis(elapsed);
        if let ControlFlow::Break(e) = engine.run(elapsed) {
            error!("FTP task exiting: {}", e);
            break;
        }
        publish(&status, engine.status());
        thread::sleep(FTP_TASK_TICK);
    }

    engine.reset();
    publish(&status, ServerStatus::default());
    info!("ftp_task exit");
}
