//! Owns the log's single file handle: create-or-open with directory-fsync
//! creation semantics, sequential record replay, and append-only writes.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::record::Record;
use crate::util::status::{KvError, Result, Status};

/// The append-only log backing one KV index. There is exactly one writer
/// per log file at any time; enforcing that is the caller's responsibility.
pub struct Log {
    path: PathBuf,
    file: Option<File>,
    read_pos: u64,
}

impl Log {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Log {
            path: path.into(),
            file: None,
            read_pos: 0,
        }
    }

    /// Opens (creating if necessary) the backing file and positions the
    /// read cursor at the start. Idempotent between matching close/open
    /// pairs.
    pub fn open(&mut self) -> Result<()> {
        let file = create_file_sync(&self.path)?;
        self.file = Some(file);
        self.read_pos = 0;
        Ok(())
    }

    /// Sequentially reads the next record at the current read position.
    /// Advances the read cursor only when a record is successfully
    /// decoded. Returns `Ok(None)` at a clean end of stream.
    ///
    /// The read position is tracked independently of the file's append
    /// position so that a record written by `write` is immediately visible
    /// to a subsequent `read_next` on the same handle, regardless of where
    /// the last write left the OS cursor.
    pub fn read_next(&mut self) -> Result<Option<Record>> {
        let pos = self.read_pos;
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(pos))?;
        let result = Record::read_next(file)?;
        if result.is_some() {
            self.read_pos = self.file_mut()?.stream_position()?;
        }
        Ok(result)
    }

    /// Encodes and appends `record`. A successful write is durably visible
    /// to a subsequent reader on the same handle.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        let mut buf = Vec::new();
        record.encode_to(&mut buf);
        let file = self.file_mut()?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }

    /// Flushes and releases the handle.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }
        Ok(())
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            KvError::new(Status::IO, Some("log is not open"))
        })
    }
}

#[cfg(unix)]
fn create_file_sync(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    sync_parent_dir(path)?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_file_sync(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    Ok(file)
}

/// fsyncs the directory containing `path` so the file's existence survives
/// a crash immediately after creation. A no-op on platforms without a
/// meaningful directory-fsync primitive.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let c_dir = CString::new(dir.as_os_str().as_bytes())
        .map_err(|_| KvError::new(Status::IO, Some("log directory path contains a NUL byte")))?;

    // SAFETY: c_dir is a valid NUL-terminated path; the returned fd is
    // owned by this function and closed before returning.
    unsafe {
        let fd = libc::open(c_dir.as_ptr(), libc::O_RDONLY | libc::O_DIRECTORY);
        if fd < 0 {
            return Err(KvError::from(std::io::Error::last_os_error()));
        }
        let rc = libc::fsync(fd);
        let sync_err = if rc < 0 {
            Some(std::io::Error::last_os_error())
        } else {
            None
        };
        libc::close(fd);
        if let Some(e) = sync_err {
            return Err(KvError::from(e));
        }
    }
    Ok(())
}
