// src/constants.rs

use std::time::Duration;

pub const FTP_CMD_PORT: u16 = 21;
pub const FTP_PASSIVE_DATA_PORT: u16 = 2024;

/// Longest command keyword plus its terminator.
pub const FTP_CMD_SIZE_MAX: usize = 6;
pub const FTP_MAX_PARAM_SIZE: usize = 512 + 1;
pub const FTP_MAX_PATH_SIZE: usize = 256;
pub const FTP_USER_PASS_LEN_MAX: usize = 32;

pub const FTP_CMD_TIMEOUT_MS: u64 = 300 * 1000;
pub const FTP_DATA_TIMEOUT_MS: u64 = 10_000;

pub const FTPSERVER_BUFFER_SIZE: usize = 1024;
pub const FTPSERVER_MAX_BUFFER_SIZE: usize = 16 * 1024;
pub const FTPSERVER_MIN_BUFFER_SIZE: usize = 2 * FTP_ROOT_ENTRY_MIN_SPACE;

/// "MMM DD YYYY" for entries older than this, "MMM DD HH:MM" otherwise.
pub const FTP_UNIX_SECONDS_180_DAYS: i64 = 180 * 24 * 60 * 60;
/// Date shown for entries that cannot be stat'ed (2000-01-01 00:00:00 UTC).
pub const FTP_FALLBACK_MTIME: i64 = 946_684_800;

pub const FTP_SEND_TIMEOUT_MS: u64 = 200;
pub const FTP_PROGRESS_INTERVAL: u64 = 100 * 1024;
pub const FTP_DIR_ENTRY_MIN_SPACE: usize = 64;
pub const FTP_ROOT_ENTRY_MIN_SPACE: usize = 128;
pub const FTP_LIST_ENTRIES_PER_CALL: usize = 8;

pub const FTP_MAX_LOGIN_RETRIES: u8 = 3;
pub const FTP_LOGIN_BACKOFF_STEP_MS: u64 = 1000;
pub const FTP_LOGIN_BACKOFF_MAX_MS: u64 = 5000;

pub const FTP_LOG_THROTTLE_MS: u64 = 200;
pub const FTP_LOG_THROTTLE_MAX: u32 = 5;
pub const FTP_LOG_PROGRESS_EVERY: u32 = 5;
pub const FTP_LOG_LINE_MAX: usize = 127;

pub const FTP_TASK_STACK_SIZE: usize = 256 * 1024;
pub const FTP_TASK_TICK: Duration = Duration::from_millis(1);
pub const FTP_STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub const FTP_STORAGE_NAME_INTERNAL: &str = "data";
pub const FTP_STORAGE_NAME_SDCARD: &str = "sdcard";
pub const VFS_NATIVE_INTERNAL_MP: &str = "/data";
pub const VFS_NATIVE_EXTERNAL_MP: &str = "/sdcard";

pub const FTP_SERVER_NAME: &str = "Pocket FTP Server";

pub const DEFAULT_FTP_USER: &str = "esp32";
pub const DEFAULT_FTP_PASS: &str = "esp32";
pub const FALLBACK_FTP_USER: &str = "ftp";
pub const FALLBACK_FTP_PASS: &str = "ftp123";

pub const USERNAME_REGEX: &str = r"^[a-zA-Z0-9]{1,32}$";
