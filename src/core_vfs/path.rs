//! Virtual namespace of the server.
//!
//! Clients see a synthetic `/` holding two storage roots, `/data` and
//! `/sdcard`, each mapped onto a configured mount point. Every path coming
//! from the wire goes through [`sanitize_path`] before it reaches the
//! filesystem.

use crate::config::ServerConfig;
use crate::constants::{FTP_MAX_PATH_SIZE, FTP_STORAGE_NAME_INTERNAL, FTP_STORAGE_NAME_SDCARD};
use crate::error::FtpError;
use log::{debug, warn};
use std::path::PathBuf;

const VIRTUAL_ROOTS: [&str; 2] = [FTP_STORAGE_NAME_INTERNAL, FTP_STORAGE_NAME_SDCARD];

/// Rejects overlong paths and paths whose `..` components would climb above
/// the storage root they start in.
///
/// When the path is absolute and its first component names a storage root,
/// that component is skipped. Every following `..` counts -1 and every
/// other component +1 (`.` counts 0); a running depth below zero rejects the
/// path. A `max_len` of 0 disables the length check.
pub fn sanitize_path(path: &str, max_len: usize) -> bool {
    if path.is_empty() {
        return true;
    }
    if max_len > 0 && path.len() >= max_len {
        warn!("Path too long ({} >= {}): rejected", path.len(), max_len);
        return false;
    }

    let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();
    if path.starts_with('/') {
        if let Some(first) = components.peek() {
            if VIRTUAL_ROOTS.contains(first) {
                components.next();
            }
        }
    }

    let mut depth: i32 = 0;
    for component in components {
        match component {
            ".." => depth -= 1,
            "." => {}
            _ => depth += 1,
        }
        if depth < 0 {
            warn!("Path traversal attempt blocked: {}", path);
            return false;
        }
    }
    true
}

/// Appends `dir` to `pwd`, or replaces `pwd` when `dir` is absolute.
pub fn open_child(pwd: &mut String, dir: &str) {
    debug!("open_child: [{}] + [{}]", pwd, dir);
    if dir.is_empty() {
        return;
    }
    if dir.starts_with('/') {
        pwd.clear();
        pwd.push_str(dir);
    } else {
        if pwd.len() > 1 && !pwd.ends_with('/') {
            pwd.push('/');
        }
        pwd.push_str(dir);
    }
    debug!("open_child, New pwd: {}", pwd);
}

/// Drops the last component of `pwd`; top-level directories collapse to `/`.
pub fn close_child(pwd: &mut String) {
    debug!("close_child: [{}]", pwd);
    let trimmed_len = pwd.trim_end_matches('/').len();
    pwd.truncate(trimmed_len);
    match pwd.rfind('/') {
        Some(idx) if idx > 0 => pwd.truncate(idx),
        _ => {
            pwd.clear();
            pwd.push('/');
        }
    }
    debug!("close_child, New pwd: {}", pwd);
}

/// Pops a trailing `fname` (as appended by [`open_child`]) back off `pwd`, so
/// that `pwd` names a directory again.
pub fn remove_fname_from_path(pwd: &mut String, fname: &str) {
    debug!("remove_fname_from_path: {} - {}", pwd, fname);
    if fname.is_empty() || !pwd.ends_with(fname) {
        return;
    }
    let new_len = pwd.len() - fname.len();
    pwd.truncate(new_len);
    if pwd.len() > 1 && pwd.ends_with('/') {
        pwd.pop();
    }
    if pwd.is_empty() {
        pwd.push('/');
    }
    debug!("remove_fname_from_path: New pwd: {}", pwd);
}

/// Strips a trailing separator, keeping `/` for the root.
pub fn normalize_dir(pwd: &mut String) {
    while pwd.len() > 1 && pwd.ends_with('/') {
        pwd.pop();
    }
    if pwd.is_empty() {
        pwd.push('/');
    }
}

#[derive(Debug, Clone)]
pub struct Vfs {
    internal_mount: String,
    external_mount: String,
    mount_prefix: String,
}

impl Vfs {
    pub fn new(internal_mount: &str, external_mount: &str, mount_prefix: &str) -> Self {
        Self {
            internal_mount: internal_mount.trim_end_matches('/').to_string(),
            external_mount: external_mount.trim_end_matches('/').to_string(),
            mount_prefix: mount_prefix.to_string(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            &config.internal_mount,
            &config.external_mount,
            &config.mount_prefix,
        )
    }

    /// Storage roots in listing order: internal first, then external.
    pub fn roots(&self) -> [(&'static str, PathBuf); 2] {
        [
            (FTP_STORAGE_NAME_INTERNAL, self.full_mount(&self.internal_mount)),
            (FTP_STORAGE_NAME_SDCARD, self.full_mount(&self.external_mount)),
        ]
    }

    pub fn external_root(&self) -> PathBuf {
        self.full_mount(&self.external_mount)
    }

    /// Substitutes the mount point for a leading `/data` or `/sdcard`.
    /// Anything else is returned unchanged.
    pub fn translate_path(&self, display: &str) -> String {
        for (name, mount) in [
            (FTP_STORAGE_NAME_INTERNAL, &self.internal_mount),
            (FTP_STORAGE_NAME_SDCARD, &self.external_mount),
        ] {
            if let Some(suffix) = strip_root(display, name) {
                return format!("{}{}", mount, suffix);
            }
        }
        display.to_string()
    }

    pub fn get_full_path(&self, display: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.mount_prefix, self.translate_path(display)))
    }

    /// Real path for a display path that lives inside one of the storage roots.
    pub fn resolve(&self, display: &str) -> Result<PathBuf, FtpError> {
        if !sanitize_path(display, FTP_MAX_PATH_SIZE) {
            return Err(FtpError::PathRejected(display.to_string()));
        }
        if !VIRTUAL_ROOTS
            .iter()
            .any(|name| strip_root(display, name).is_some())
        {
            warn!("Path outside of the storage roots rejected: {}", display);
            return Err(FtpError::PathRejected(display.to_string()));
        }
        let full = self.get_full_path(display);
        if full.as_os_str().len() >= FTP_MAX_PATH_SIZE {
            warn!("Resolved path too long, rejected: {:?}", full);
            return Err(FtpError::PathTooLong(display.to_string()));
        }
        Ok(full)
    }

    /// Like [`Vfs::resolve`], but refuses the storage roots themselves.
    pub fn resolve_entry(&self, display: &str) -> Result<PathBuf, FtpError> {
        if self.is_storage_root(display) {
            warn!("Refusing to touch storage root: {}", display);
            return Err(FtpError::PathRejected(display.to_string()));
        }
        self.resolve(display)
    }

    pub fn is_storage_root(&self, display: &str) -> bool {
        let trimmed = display.trim_end_matches('/');
        VIRTUAL_ROOTS
            .iter()
            .any(|name| trimmed.strip_prefix('/') == Some(*name))
    }

    pub fn is_external(&self, full: &std::path::Path) -> bool {
        full.starts_with(self.external_root())
    }

    fn full_mount(&self, mount: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.mount_prefix, mount))
    }
}

/// Returns the remainder of `display` after `/<name>`, if it is followed by
/// `/` or the end of the string.
fn strip_root<'a>(display: &'a str, name: &str) -> Option<&'a str> {
    let rest = display.strip_prefix('/')?.strip_prefix(name)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
