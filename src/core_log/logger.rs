use crate::constants::{
    FTP_LOG_LINE_MAX, FTP_LOG_PROGRESS_EVERY, FTP_LOG_THROTTLE_MAX, FTP_LOG_THROTTLE_MS,
};
use chrono::Local;
use env_logger::{Builder, Env};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub type ScreenLogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Installs the process logger with the `[timestamp] [LEVEL] message` format.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();
}

/// Formats a screen line the way the daemon prints it.
pub fn log_message(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    format!("[{}] {}", timestamp, message)
}

struct Throttle {
    window_start: Option<Instant>,
    count: u32,
    progress_counter: u32,
}

/// User-visible activity feed. A single callback slot, last registration wins.
pub struct ScreenLog {
    callback: Mutex<Option<ScreenLogCallback>>,
    throttle: Mutex<Throttle>,
}

impl Default for ScreenLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenLog {
    pub fn new() -> Self {
        Self {
            callback: Mutex::new(None),
            throttle: Mutex::new(Throttle {
                window_start: None,
                count: 0,
                progress_counter: 0,
            }),
        }
    }

    pub fn register(&self, callback: Option<ScreenLogCallback>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    pub fn log(&self, message: &str) {
        self.emit(message, false);
    }

    /// Progress lines are downsampled on top of the regular throttle.
    pub fn progress(&self, message: &str) {
        self.emit(message, true);
    }

    fn emit(&self, message: &str, is_progress: bool) {
        let callback = match self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(cb) => cb,
            None => return,
        };

        {
            let mut throttle = self.throttle.lock().unwrap_or_else(PoisonError::into_inner);
            if is_progress {
                throttle.progress_counter = throttle.progress_counter.wrapping_add(1);
                if throttle.progress_counter % FTP_LOG_PROGRESS_EVERY != 0 {
                    return;
                }
            }
            let now = Instant::now();
            match throttle.window_start {
                Some(start)
                    if now.duration_since(start) < Duration::from_millis(FTP_LOG_THROTTLE_MS) =>
                {
                    throttle.count += 1;
                    if throttle.count > FTP_LOG_THROTTLE_MAX {
                        return;
                    }
                }
                _ => {
                    throttle.count = 0;
                    throttle.window_start = Some(now);
                }
            }
        }

        callback(truncate(message, FTP_LOG_LINE_MAX));
    }
}

fn truncate(message: &str, max: usize) -> &str {
    if message.len() <= max {
        return message;
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}
