//! Same-host guard against two runs at once.

use crate::sync::result_error::error::Error;
use crate::sync::result_error::result::Result;
use crate::sync::result_error::WithMsg;
use getset::Getters;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Held for the duration of a run; the marker file is removed on drop.
///
/// A process killed without unwinding leaves the marker behind and it must be
/// removed by hand.
#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Creates `path` holding the current pid, failing if it already exists.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = match File::create_new(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyRunning(path.to_path_buf()))
            }
            Err(e) => {
                return Err(Error::from(e).with_msg(format!("Creating lock file {path:?} failed")))
            }
        };

        // From here on the marker is ours, so drop cleans it up on any error.
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", std::process::id())
            .map_err(Error::from)
            .with_msg(format!("Writing lock file {path:?} failed"))?;
        tracing::debug!("Acquired lock {:?}", lock.path);
        Ok(lock)
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Released lock {:?}", self.path),
            Err(e) => tracing::warn!("Removing lock file {:?} failed: {e}", self.path),
        }
    }
}
