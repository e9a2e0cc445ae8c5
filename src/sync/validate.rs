//! Validation functions for configuration values.
//!
//! Provides custom validation functions for profile paths and hook commands.

use std::path::Path;
use validator::ValidationError;

/// Accepts a native absolute path, or a `/`-rooted path as used on remotes.
pub fn validate_absolute_path<S: AsRef<str>>(path: S) -> Result<(), ValidationError> {
    let path = path.as_ref();
    if path.starts_with('/') || Path::new(path).is_absolute() {
        Ok(())
    } else {
        Err(ValidationError::new("RelativePath")
            .with_message(format!("{path:?} is not an absolute path").into()))
    }
}

/// The path must be absolute and exist; it may be a file or a directory.
pub fn validate_local_path<P: AsRef<Path>>(path: P) -> Result<(), ValidationError> {
    let path = path.as_ref();
    if !path.is_absolute() {
        return Err(ValidationError::new("RelativePath")
            .with_message(format!("{:?} is not an absolute local path", path).into()));
    }
    if !path.exists() {
        return Err(ValidationError::new("PathNotFound")
            .with_message(format!("{:?} not found", path).into()));
    }

    Ok(())
}

pub fn validate_hook<S: AsRef<str>>(cmd: S) -> Result<(), ValidationError> {
    if cmd.as_ref().trim().is_empty() {
        return Err(ValidationError::new("EmptyHook").with_message("hook command is blank".into()));
    }

    Ok(())
}
