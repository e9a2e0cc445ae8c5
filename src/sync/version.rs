//! Minimum version check for the external transfer binary.

use crate::sync::process::{CommandRunner, CommandSpec};
use crate::sync::result_error::error::Error;
use crate::sync::result_error::result::Result;
use derive_more::Display;
use regex::Regex;
use serde_with::DeserializeFromStr;
use std::str::FromStr;
use std::sync::OnceLock;

/// Oldest release known to support every flag this tool passes.
pub static DEFAULT_MIN_VERSION: BinaryVersion = BinaryVersion::new(1, 53, 0);

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr)]
#[display("{major}.{minor}.{patch}")]
pub struct BinaryVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl BinaryVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for BinaryVersion {
    fn default() -> Self {
        DEFAULT_MIN_VERSION
    }
}

impl FromStr for BinaryVersion {
    type Err = Error;

    /// Parses `MAJOR.MINOR[.PATCH]`, with an optional leading `v`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parts = trimmed
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

/// Finds the first `vMAJOR.MINOR[.PATCH]` token in the output of `<binary> version`.
pub fn parse_version_output(output: &str) -> Result<Option<BinaryVersion>> {
    static VERSION_OUTPUT_RE: OnceLock<Regex> = OnceLock::new();
    let re = VERSION_OUTPUT_RE
        .get_or_init(|| Regex::new(r"\bv(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"));
    let Some(caps) = re.captures(output) else {
        return Ok(None);
    };
    let number = |i: usize| {
        caps.get(i)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| Error::InvalidVersion(caps[0].to_string()))
    };

    Ok(Some(BinaryVersion::new(
        number(1)?.unwrap_or_default(),
        number(2)?.unwrap_or_default(),
        number(3)?.unwrap_or_default(),
    )))
}

/// Runs `<binary> version` and checks it against `required`.
pub fn check_binary_version<R: CommandRunner + ?Sized>(
    runner: &R,
    binary: &str,
    required: BinaryVersion,
) -> Result<BinaryVersion> {
    let external_tool = |reason: String| Error::ExternalTool {
        binary: binary.to_string(),
        reason,
    };

    let output = runner
        .run(&CommandSpec::argv([binary, "version"]))
        .map_err(|e| external_tool(format!("cannot be executed: {e}")))?;
    if !output.success() {
        return Err(external_tool(format!(
            "`version` exited with code {}",
            output.exit_code()
        )));
    }

    let found = parse_version_output(output.stdout())?
        .ok_or_else(|| external_tool("no version found in `version` output".to_string()))?;
    if found < required {
        return Err(Error::VersionTooLow {
            binary: binary.to_string(),
            found,
            required,
        });
    }

    tracing::info!("Using {binary} {found} (required >= {required})");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::process::fake::ScriptedRunner;
    use crate::sync::process::ProcessOutput;

    #[test]
    fn test_parse_version_str() {
        assert_eq!("1.53".parse::<BinaryVersion>().unwrap(), BinaryVersion::new(1, 53, 0));
        assert_eq!(
            "v1.66.2".parse::<BinaryVersion>().unwrap(),
            BinaryVersion::new(1, 66, 2)
        );
        assert!("1".parse::<BinaryVersion>().is_err());
        assert!("1.x.0".parse::<BinaryVersion>().is_err());
        assert!("1.2.3.4".parse::<BinaryVersion>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(BinaryVersion::new(1, 9, 0) < BinaryVersion::new(1, 53, 0));
        assert!(BinaryVersion::new(2, 0, 0) > BinaryVersion::new(1, 99, 99));
        assert_eq!(BinaryVersion::new(1, 53, 0).to_string(), "1.53.0");
    }

    #[test]
    fn test_version_deserialize() {
        let v: BinaryVersion = serde_yml::from_str("\"1.60\"").unwrap();
        assert_eq!(v, BinaryVersion::new(1, 60, 0));
    }

    #[test]
    fn test_parse_version_output() {
        let output = "rclone v1.66.0\n- os/version: debian 12\n- go/version: go1.22.1\n";
        assert_eq!(
            parse_version_output(output).unwrap(),
            Some(BinaryVersion::new(1, 66, 0))
        );
        assert_eq!(
            parse_version_output("rclone v1.54-beta").unwrap(),
            Some(BinaryVersion::new(1, 54, 0))
        );
        assert_eq!(parse_version_output("no version here").unwrap(), None);
    }

    #[test]
    fn test_parse_version_output_shared_across_threads() {
        let handles: Vec<_> = (0..8u32)
            .map(|i| std::thread::spawn(move || parse_version_output(&format!("rclone v1.{i}.2"))))
            .collect();
        for (i, handle) in (0..8u32).zip(handles) {
            assert_eq!(
                handle.join().unwrap().unwrap(),
                Some(BinaryVersion::new(1, i, 2))
            );
        }
    }

    #[test]
    fn test_check_binary_version_ok() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::new(0, "rclone v1.66.0\n", "")));
        let found =
            check_binary_version(&runner, "rclone", BinaryVersion::new(1, 53, 0)).unwrap();
        assert_eq!(found, BinaryVersion::new(1, 66, 0));
        assert_eq!(
            runner.calls(),
            vec![CommandSpec::argv(["rclone", "version"])]
        );
    }

    #[test]
    fn test_check_binary_version_too_low() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::new(0, "rclone v1.40.0\n", "")));
        match check_binary_version(&runner, "rclone", BinaryVersion::new(1, 53, 0)) {
            Err(Error::VersionTooLow { found, .. }) => {
                assert_eq!(found, BinaryVersion::new(1, 40, 0))
            }
            other => panic!("Expected VersionTooLow, got {other:?}"),
        }
    }

    #[test]
    fn test_check_binary_version_missing_binary() {
        let runner = ScriptedRunner::new(|spec| {
            Err(Error::Spawn {
                program: spec.program().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        });
        let err = check_binary_version(&runner, "rclone", BinaryVersion::new(1, 53, 0))
            .unwrap_err();
        assert!(matches!(err, Error::ExternalTool { .. }));
    }

    #[test]
    fn test_check_binary_version_failed_or_garbled() {
        let failing = ScriptedRunner::new(|_| Ok(ProcessOutput::new(2, "", "boom")));
        assert!(matches!(
            check_binary_version(&failing, "rclone", BinaryVersion::new(1, 53, 0)),
            Err(Error::ExternalTool { .. })
        ));

        let garbled = ScriptedRunner::new(|_| Ok(ProcessOutput::new(0, "hello", "")));
        assert!(matches!(
            check_binary_version(&garbled, "rclone", BinaryVersion::new(1, 53, 0)),
            Err(Error::ExternalTool { .. })
        ));
    }
}
