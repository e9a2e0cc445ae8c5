//! Process exit statuses reported by the `k_sync` binary.

use derive_more::Display;

/// Exit status of a whole invocation.
///
/// `2` is left unused here because the argument parser exits with it on
/// usage errors.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    #[display("success")]
    Success,
    #[display("one or more stages failed")]
    Failure,
    #[display("no profiles configured")]
    NoProfiles,
    #[display("profile not found")]
    ProfileNotFound,
    #[display("configuration invalid")]
    ConfigInvalid,
    #[display("external binary missing or too old")]
    ExternalTool,
    #[display("another instance is already running")]
    AlreadyRunning,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::NoProfiles => 3,
            ExitStatus::ProfileNotFound => 4,
            ExitStatus::ConfigInvalid => 5,
            ExitStatus::ExternalTool => 6,
            ExitStatus::AlreadyRunning => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            ExitStatus::Success,
            ExitStatus::Failure,
            ExitStatus::NoProfiles,
            ExitStatus::ProfileNotFound,
            ExitStatus::ConfigInvalid,
            ExitStatus::ExternalTool,
            ExitStatus::AlreadyRunning,
        ];
        assert_eq!(all.iter().map(|s| s.code()).unique().count(), all.len());
        assert_eq!(ExitStatus::Success.code(), 0);
        assert!(all.iter().all(|s| s.code() != 2));
    }
}
