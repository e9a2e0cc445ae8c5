//! Decides whether a profile benefits from the `--fast-list` optimization.

use crate::sync::process::{CommandRunner, CommandSpec};
use crate::sync::profile::ProfileEntry;
use std::collections::HashMap;

/// Backend types that support listing a whole tree in one request.
pub static FAST_LIST_BACKENDS: &[&str] = &[
    "azureblob",
    "b2",
    "drive",
    "gcs",
    "google cloud storage",
    "hubic",
    "jottacloud",
    "qingstor",
    "s3",
    "swift",
];

pub trait FastListProbe {
    fn supports_fast_enumeration(&self, entry: &ProfileEntry) -> bool;
}

/// Asks the transfer binary which remotes exist and what backend each uses.
///
/// The remote list is fetched again on every call so that each profile sees
/// the configuration as it is when that profile starts.
pub struct TransportCapabilityProbe<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    binary: &'a str,
}

impl<'a, R: CommandRunner + ?Sized> TransportCapabilityProbe<'a, R> {
    pub fn new(runner: &'a R, binary: &'a str) -> Self {
        Self { runner, binary }
    }

    /// Configured remotes mapped to their backend type, `None` if the query failed.
    fn remote_types(&self) -> Option<HashMap<String, String>> {
        let command = CommandSpec::argv([self.binary, "listremotes", "--long"]);
        match self.runner.run(&command) {
            Ok(output) if output.success() => Some(parse_remotes(output.stdout())),
            Ok(output) => {
                tracing::warn!(
                    "Listing remotes exited with code {}, not adding --fast-list",
                    output.exit_code()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Listing remotes failed, not adding --fast-list: {e}");
                None
            }
        }
    }
}

impl<R: CommandRunner + ?Sized> FastListProbe for TransportCapabilityProbe<'_, R> {
    fn supports_fast_enumeration(&self, entry: &ProfileEntry) -> bool {
        if entry.remotes().next().is_none() {
            return false;
        }
        let Some(types) = self.remote_types() else {
            return false;
        };

        entry.remotes().any(|remote| {
            types.get(remote).is_some_and(|backend| {
                let fast = FAST_LIST_BACKENDS.contains(&backend.as_str());
                tracing::debug!("Remote {remote:?} is {backend:?}, fast list: {fast}");
                fast
            })
        })
    }
}

/// Parses `name: type` lines as printed by `listremotes --long`.
pub fn parse_remotes(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, backend)| (name.trim().to_string(), backend.trim().to_lowercase()))
        .filter(|(name, backend)| !name.is_empty() && !backend.is_empty())
        .collect()
}
