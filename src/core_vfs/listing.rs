use crate::constants::{FTP_FALLBACK_MTIME, FTP_UNIX_SECONDS_180_DAYS};
use chrono::{DateTime, Local, TimeZone};
use filetime::FileTime;
use std::fs::Metadata;

/// Size and modification time of a directory entry, as shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub size: u64,
    pub mtime: i64,
}

impl EntryStat {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            mtime: FileTime::from_last_modification_time(metadata).unix_seconds(),
        }
    }

    /// Used when an entry cannot be stat'ed.
    pub fn fallback() -> Self {
        Self {
            size: 0,
            mtime: FTP_FALLBACK_MTIME,
        }
    }
}

pub fn local_time(unix_seconds: i64) -> Option<DateTime<Local>> {
    Local.timestamp_opt(unix_seconds, 0).single()
}

/// "MMM DD YYYY" for entries older than 180 days, "MMM DD HH:MM" otherwise.
pub fn format_list_time(mtime: i64, now: i64) -> String {
    match local_time(mtime) {
        Some(time) if mtime + FTP_UNIX_SECONDS_180_DAYS < now => {
            time.format("%b %d %Y").to_string()
        }
        Some(time) => time.format("%b %d %H:%M").to_string(),
        None => String::from("Jan  1  1970"),
    }
}

/// Formats `YYYYMMDDHHMMSS` for MDTM.
pub fn format_mdtm(mtime: i64) -> Option<String> {
    local_time(mtime).map(|time| time.format("%Y%m%d%H%M%S").to_string())
}

/// One listing line. NLST lines only carry the name.
pub fn get_eplf_item(name: &str, is_dir: bool, stat: EntryStat, nlist: bool, now: i64) -> String {
    if nlist {
        return format!("{}\r\n", name);
    }
    let kind = if is_dir { "d" } else { "-" };
    format!(
        "{}rw-rw-rw-   1 root  root {:>9} {} {}\r\n",
        kind,
        stat.size,
        format_list_time(stat.mtime, now),
        name
    )
}
