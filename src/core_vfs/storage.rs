use crate::core_log::ScreenLog;
use crate::core_vfs::listing::{get_eplf_item, EntryStat};
use crate::core_vfs::path::Vfs;
use crate::constants::{FTP_DIR_ENTRY_MIN_SPACE, FTP_LIST_ENTRIES_PER_CALL, FTP_ROOT_ENTRY_MIN_SPACE};
use crate::error::{FtpError, Outcome};
use chrono::Utc;
use log::{debug, error, warn};
use std::fs::{self, File, OpenOptions, ReadDir};
use std::io::{ErrorKind, Read, Write};
use std::iter::Peekable;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
        };
        options
    }
}

/// The single file or directory handle the server may hold at a time.
#[derive(Debug, Default)]
pub enum OpenHandle {
    #[default]
    Nothing,
    File(File),
    Dir(Peekable<ReadDir>),
    /// Listing of the synthetic `/`; nothing is open on disk.
    VirtualRoot,
}

/// Filesystem adapter: every file and directory access goes through here.
pub struct Storage {
    vfs: Vfs,
    handle: OpenHandle,
    settle: Duration,
    screen: Arc<ScreenLog>,
}

impl Storage {
    pub fn new(vfs: Vfs, settle: Duration, screen: Arc<ScreenLog>) -> Self {
        Self {
            vfs,
            handle: OpenHandle::Nothing,
            settle,
            screen,
        }
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn handle(&self) -> &OpenHandle {
        &self.handle
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.handle, OpenHandle::Nothing)
    }

    /// Short pause before touching storage that shares a bus with other peripherals.
    pub fn settle(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }

    pub fn open_file(&mut self, path: &str, mode: OpenMode) -> Result<(), FtpError> {
        debug!("open_file: path=[{}]", path);
        let fullname = self.vfs.resolve(path).map_err(|e| {
            warn!("open_file: invalid path rejected");
            e
        })?;

        if self.vfs.is_external(&fullname) {
            self.settle();
            if fs::metadata(self.vfs.external_root()).is_err() {
                error!("SD Card not accessible!");
                self.screen.log("[!!] SD Card unavailable");
                return Err(FtpError::StorageUnavailable(path.to_string()));
            }
        }

        self.close_files_dir();
        let file = mode.options().open(&fullname).map_err(|e| {
            error!("open_file: open fail [{:?}]: {}", fullname, e);
            FtpError::Io(e)
        })?;
        self.handle = OpenHandle::File(file);
        Ok(())
    }

    pub fn open_dir_for_listing(&mut self, path: &str) -> Result<(), FtpError> {
        self.close_files_dir();

        if path == "/" {
            self.handle = OpenHandle::VirtualRoot;
            return Ok(());
        }

        let fullname = self.vfs.resolve(path).map_err(|e| {
            warn!("open_dir_for_listing: invalid path rejected");
            e
        })?;
        self.settle();
        let dir = fs::read_dir(&fullname)?;
        self.handle = OpenHandle::Dir(dir.peekable());
        Ok(())
    }

    pub fn close_files_dir(&mut self) {
        if let OpenHandle::File(file) = &mut self.handle {
            if let Err(e) = file.flush() {
                warn!("Flush on close failed: {}", e);
            }
        }
        self.handle = OpenHandle::Nothing;
    }

    /// Cleanup for abnormal paths (disconnects, resets), where a handle may
    /// still be open mid-transfer.
    pub fn close_filesystem_on_error(&mut self) {
        if self.is_open() {
            warn!("Closing handle left open by an interrupted operation");
        }
        self.close_files_dir();
    }

    /// Fills `buf` from the open file. `Ok` means end of file was reached and
    /// the file is closed; `Continue` means more data may follow.
    pub fn read_file(&mut self, buf: &mut [u8]) -> (Outcome, usize) {
        let file = match &mut self.handle {
            OpenHandle::File(file) => file,
            _ => return (Outcome::Failed, 0),
        };

        let mut filled = 0;
        let mut failed = false;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Error reading file: {}", e);
                    failed = true;
                    break;
                }
            }
        }

        if failed {
            self.close_files_dir();
            (Outcome::Failed, filled)
        } else if filled < buf.len() {
            self.close_files_dir();
            (Outcome::Ok, filled)
        } else {
            (Outcome::Continue, filled)
        }
    }

    pub fn write_file(&mut self, buf: &[u8]) -> Outcome {
        let result = match &mut self.handle {
            OpenHandle::File(file) => file.write_all(buf),
            _ => Err(std::io::Error::new(ErrorKind::NotConnected, "no file open")),
        };
        match result {
            Ok(()) => Outcome::Ok,
            Err(e) => {
                error!("Error writing file: {}", e);
                self.close_files_dir();
                Outcome::Failed
            }
        }
    }

    /// Writes up to `FTP_LIST_ENTRIES_PER_CALL` listing lines into `buf`.
    /// Returns `Ok` once the directory is exhausted (and closed).
    pub fn list_dir(&mut self, buf: &mut [u8], nlist: bool) -> (Outcome, usize) {
        let now = Utc::now().timestamp();
        let mut next = 0;

        let result = match &mut self.handle {
            OpenHandle::VirtualRoot => {
                for (name, mount) in self.vfs.roots() {
                    add_virtual_dir_if_mounted(&mount, name, nlist, now, buf, &mut next);
                }
                Outcome::Ok
            }
            OpenHandle::Dir(entries) => {
                let mut listcount = 0;
                let mut result = Outcome::Continue;
                while buf.len() - next > FTP_DIR_ENTRY_MIN_SPACE
                    && listcount < FTP_LIST_ENTRIES_PER_CALL
                {
                    let line = match entries.peek() {
                        None => {
                            result = Outcome::Ok;
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("Failed to read directory entry: {}", e);
                            None
                        }
                        Some(Ok(entry)) => {
                            let name = entry.file_name().to_string_lossy().into_owned();
                            if name == "." || name == ".." {
                                None
                            } else {
                                let metadata = fs::metadata(entry.path()).ok();
                                let is_dir = match &metadata {
                                    Some(m) => m.is_dir(),
                                    None => entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
                                };
                                let stat = metadata
                                    .as_ref()
                                    .map(EntryStat::from_metadata)
                                    .unwrap_or_else(EntryStat::fallback);
                                Some(get_eplf_item(&name, is_dir, stat, nlist, now))
                            }
                        }
                    };

                    if let Some(line) = line {
                        let remaining = buf.len() - next;
                        if line.len() > remaining {
                            if next > 0 {
                                // Retry on the next call with an empty buffer.
                                break;
                            }
                            warn!("Entry too long for buffer ({} > {}), skipping", line.len(), remaining);
                        } else {
                            buf[next..next + line.len()].copy_from_slice(line.as_bytes());
                            next += line.len();
                            listcount += 1;
                        }
                    }
                    entries.next();
                }
                result
            }
            _ => Outcome::Failed,
        };

        if result != Outcome::Continue {
            self.close_files_dir();
        }
        (result, next)
    }
}

/// Emits a directory line for a storage root if its mount point can be opened.
fn add_virtual_dir_if_mounted(
    mount: &Path,
    name: &str,
    nlist: bool,
    now: i64,
    buf: &mut [u8],
    next: &mut usize,
) -> bool {
    if fs::read_dir(mount).is_err() {
        debug!("Storage root {} not mounted at {:?}", name, mount);
        return false;
    }
    if buf.len().saturating_sub(*next) < FTP_ROOT_ENTRY_MIN_SPACE {
        return false;
    }
    let stat = fs::metadata(mount)
        .map(|m| EntryStat::from_metadata(&m))
        .unwrap_or_else(|_| EntryStat::fallback());
    let line = get_eplf_item(name, true, stat, nlist, now);
    if line.len() > buf.len() - *next {
        return false;
    }
    buf[*next..*next + line.len()].copy_from_slice(line.as_bytes());
    *next += line.len();
    true
}
