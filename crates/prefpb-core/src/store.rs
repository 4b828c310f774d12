//! File-backed editing sessions.
//!
//! A [`PrefsFile`] owns one preferences file for the duration of an editing
//! session: it decodes the file on open, hands out the map for mutation, and
//! re-encodes on save. On the session's first save the pre-edit bytes are
//! copied verbatim to `<path>.bak` unless that backup already exists; later
//! saves never touch the backup again.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::map::PreferenceMap;

/// One editing session over a single `.preferences_pb` file.
///
/// Not shared between sessions; exactly one `PrefsFile` may mutate a given
/// map at a time.
#[derive(Debug)]
pub struct PrefsFile {
    path: PathBuf,
    map: PreferenceMap,
    /// Bytes as read at open time; written to the backup on first save.
    /// `None` when the file did not exist at open.
    original_bytes: Option<Vec<u8>>,
    backup_handled: bool,
}

impl PrefsFile {
    /// Open an existing preferences file and decode it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| Error::file_read(&path, e))?;
        let map = PreferenceMap::decode(&bytes)?;
        debug!(path = %path.display(), entries = map.len(), "opened preferences file");
        Ok(Self {
            path,
            map,
            original_bytes: Some(bytes),
            backup_handled: false,
        })
    }

    /// Start a session for a file that does not exist yet, with an empty map.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            map: PreferenceMap::new(),
            original_bytes: None,
            backup_handled: false,
        }
    }

    /// Open the file if it exists, otherwise start an empty session.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            Self::open(path)
        } else {
            Ok(Self::create(path))
        }
    }

    /// The file this session is editing
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read access to the map
    pub fn map(&self) -> &PreferenceMap {
        &self.map
    }

    /// Mutable access to the map
    pub fn map_mut(&mut self) -> &mut PreferenceMap {
        &mut self.map
    }

    /// The backup path companion to this file
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".bak");
        self.path.with_file_name(name)
    }

    /// Encode the map and write it to disk.
    ///
    /// The first save of a session copies the pre-edit bytes to
    /// `<path>.bak` first, unless that file already exists or the session
    /// started from a nonexistent file.
    pub fn save(&mut self) -> Result<()> {
        if !self.backup_handled {
            self.write_backup_once()?;
            self.backup_handled = true;
        }

        let bytes = self.map.encode();
        fs::write(&self.path, &bytes).map_err(|e| Error::file_write(&self.path, e))?;
        info!(path = %self.path.display(), bytes = bytes.len(), "saved preferences file");
        Ok(())
    }

    fn write_backup_once(&self) -> Result<()> {
        let Some(original) = &self.original_bytes else {
            return Ok(());
        };
        let backup = self.backup_path();
        if backup.exists() {
            debug!(path = %backup.display(), "backup already exists; leaving it untouched");
            return Ok(());
        }
        fs::write(&backup, original).map_err(|e| Error::file_write(&backup, e))?;
        info!(path = %backup.display(), "wrote pre-edit backup");
        Ok(())
    }
}
