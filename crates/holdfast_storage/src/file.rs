//! File-based log backend for persistent storage.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based log backend.
///
/// Data survives process restarts.
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
/// - `replace()` writes a sibling temp file, syncs it, then renames it over
///   the log so compaction can never leave a half-written log behind
///
/// # Example
///
/// ```no_run
/// use holdfast_storage::{LogBackend, FileLog};
/// use std::path::Path;
///
/// let mut log = FileLog::open(Path::new("holdfast.log")).unwrap();
/// log.append(b"persistent data").unwrap();
/// log.sync().unwrap();  // Ensure data is durable
/// ```
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: RwLock<File>,
}

impl FileLog {
    /// Opens or creates a file log at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
        })
    }

    /// Opens or creates a file log, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "holdfast.log".into());
        name.push(".compact");
        self.path.with_file_name(name)
    }
}

impl LogBackend for FileLog {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;

        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp = self.temp_path();

        {
            let mut tmp_file = File::create(&temp)?;
            tmp_file.write_all(data)?;
            tmp_file.sync_all()?;
        }

        let mut file = self.file.write();
        std::fs::rename(&temp, &self.path)?;

        // The old handle still points at the replaced inode; reopen.
        *file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| StorageError::unavailable(format!("reopen after compaction: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let log = FileLog::open(&path).unwrap();
        assert!(log.read_all().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn file_append_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut log = FileLog::open(&path).unwrap();
        log.append(b"hello").unwrap();
        log.append(b" world").unwrap();

        assert_eq!(log.read_all().unwrap(), b"hello world");
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        // Write data
        {
            let mut log = FileLog::open(&path).unwrap();
            log.append(b"persistent data").unwrap();
            log.sync().unwrap();
        }

        // Reopen and read
        {
            let log = FileLog::open(&path).unwrap();
            assert_eq!(log.read_all().unwrap(), b"persistent data");
        }
    }

    #[test]
    fn file_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut log = FileLog::open(&path).unwrap();
        log.append(b"a long stretch of dead records").unwrap();

        log.replace(b"live").unwrap();
        assert_eq!(log.read_all().unwrap(), b"live");
        assert!(!log.temp_path().exists());

        // Appends continue to work on the replaced file.
        log.append(b"+more").unwrap();
        assert_eq!(log.read_all().unwrap(), b"live+more");
    }

    #[test]
    fn file_replace_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        {
            let mut log = FileLog::open(&path).unwrap();
            log.append(b"before compaction").unwrap();
            log.replace(b"after").unwrap();
            log.sync().unwrap();
        }

        let log = FileLog::open(&path).unwrap();
        assert_eq!(log.read_all().unwrap(), b"after");
    }

    #[test]
    fn file_empty_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut log = FileLog::open(&path).unwrap();
        log.append(b"x").unwrap();
        log.append(b"").unwrap();
        assert_eq!(log.read_all().unwrap(), b"x");
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("test.log");

        let log = FileLog::open_with_create_dirs(&path).unwrap();
        assert!(log.read_all().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let log = FileLog::open(&path).unwrap();
        assert_eq!(log.path(), path);
    }
}
