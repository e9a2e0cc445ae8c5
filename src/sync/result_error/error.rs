use crate::sync::exit_status::ExitStatus;
use crate::sync::process::OutputStream;
use crate::sync::result_error::WithMsg;
use crate::sync::version::BinaryVersion;
use itertools::Itertools;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command has no program to run")]
    EmptyCommand,
    #[error("{0} reader thread panicked")]
    ReaderPanicked(OutputStream),
    #[error("another instance is already running, lock file {0:?} exists")]
    AlreadyRunning(PathBuf),
    #[error("no profiles configured")]
    NoProfiles,
    #[error("profile not found: {}", .0.join(", "))]
    ProfileNotFound(Vec<String>),
    #[error("duplicate profile name {0:?}")]
    DuplicateProfile(String),
    #[error("invalid filter rule {0:?}, must start with '+ ' or '- ' followed by a pattern")]
    InvalidFilterRule(String),
    #[error("invalid version {0:?}")]
    InvalidVersion(String),
    #[error("{binary:?} is not usable: {reason}")]
    ExternalTool { binary: String, reason: String },
    #[error("{binary:?} version {found} is below the required {required}")]
    VersionTooLow {
        binary: String,
        found: BinaryVersion,
        required: BinaryVersion,
    },
    #[error("invalid configuration {:?}:\n{}", path, indent::indent_all_with("  ", error.to_string()))]
    Config { path: PathBuf, error: Box<Error> },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        if errors.is_empty() {
            panic!("Should not create lots of errors when error is empty")
        }
        Self::LotsOfError(errors.into_iter().flat_map(Error::into_iter).collect_vec())
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }

    pub fn config<P: Into<PathBuf>>(path: P, error: Error) -> Error {
        Error::Config {
            path: path.into(),
            error: Box::new(error),
        }
    }

    /// Process exit status reported for this error.
    ///
    /// Message wrappers are looked through; an aggregate reports the status of
    /// its first error.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Error::Config { .. }
            | Error::SerdeYml(_)
            | Error::ValidationError(_)
            | Error::DuplicateProfile(_)
            | Error::InvalidFilterRule(_)
            | Error::InvalidVersion(_) => ExitStatus::ConfigInvalid,
            Error::ExternalTool { .. } | Error::VersionTooLow { .. } => ExitStatus::ExternalTool,
            Error::AlreadyRunning(_) => ExitStatus::AlreadyRunning,
            Error::NoProfiles => ExitStatus::NoProfiles,
            Error::ProfileNotFound(_) => ExitStatus::ProfileNotFound,
            Error::WithMsg { error, .. } => error.exit_status(),
            Error::LotsOfError(errors) => errors
                .first()
                .map(Error::exit_status)
                .unwrap_or(ExitStatus::Failure),
            Error::Io(_)
            | Error::Spawn { .. }
            | Error::EmptyCommand
            | Error::ReaderPanicked(_) => ExitStatus::Failure,
        }
    }
}
