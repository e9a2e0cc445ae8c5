use crate::sync::profile::Profiles;
use crate::sync::result_error::error::Error;
use crate::sync::result_error::result::{convert_error_vec, Result};
use crate::sync::result_error::WithMsg;
use crate::sync::validate::validate_hook;
use crate::sync::version::BinaryVersion;
use getset::{CopyGetters, Getters};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationErrors};

static DEFAULT_BINARY: &str = "rclone";
static DEFAULT_LOCK_FILE_NAME: &str = "k_sync.lock";

fn default_binary() -> String {
    DEFAULT_BINARY.to_string()
}

fn default_lock_file() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOCK_FILE_NAME)
}

/// Top level configuration file.
#[derive(Clone, Debug, Deserialize, Getters, CopyGetters)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Transfer binary, looked up on `PATH` unless absolute.
    #[serde(default = "default_binary")]
    #[getset(get = "pub")]
    binary: String,
    #[serde(default = "default_lock_file")]
    #[getset(get = "pub")]
    lock_file: PathBuf,
    #[serde(default)]
    #[getset(get_copy = "pub")]
    min_version: BinaryVersion,
    #[getset(get = "pub")]
    pre_exec: Option<String>,
    #[getset(get = "pub")]
    post_exec: Option<String>,
    #[serde(default)]
    #[getset(get = "pub")]
    profiles: Profiles,
}

impl SyncConfig {
    pub fn new<P: Into<Profiles>>(profiles: P) -> Self {
        Self {
            binary: default_binary(),
            lock_file: default_lock_file(),
            min_version: BinaryVersion::default(),
            pre_exec: None,
            post_exec: None,
            profiles: profiles.into(),
        }
    }

    pub fn with_binary<S: Into<String>>(mut self, binary: S) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_min_version(mut self, min_version: BinaryVersion) -> Self {
        self.min_version = min_version;
        self
    }

    pub fn with_hooks(mut self, pre_exec: Option<String>, post_exec: Option<String>) -> Self {
        self.pre_exec = pre_exec;
        self.post_exec = post_exec;
        self
    }

    /// Reads, parses and validates a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .and_then(|f| serde_yml::from_reader::<_, SyncConfig>(f).map_err(Error::from))
            .and_then(|config| config.validate_all().map(|_| config))
            .map_err(|e| Error::config(path, e))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SyncConfig = serde_yml::from_str(yaml)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Validates every profile and reports all failures together.
    pub fn validate_all(&self) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.validate() {
            errors.push(Error::from(e).with_msg("Global settings are invalid"));
        }
        for profile in self.profiles.iter() {
            if let Err(e) = profile.validate() {
                errors.push(Error::from(e).with_msg(format!("Profile {:?} is invalid", profile.name())));
            }
        }
        convert_error_vec(errors)
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.binary.trim().is_empty() {
            errors.add(
                "binary",
                validator::ValidationError::new("EmptyBinary")
                    .with_message("binary must not be empty".into()),
            );
        }
        if let Some(Err(e)) = self.pre_exec.as_ref().map(validate_hook) {
            errors.add("pre_exec", e);
        }
        if let Some(Err(e)) = self.post_exec.as_ref().map(validate_hook) {
            errors.add("post_exec", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::exit_status::ExitStatus;
    use crate::sync::profile::Action;
    use tempfile::TempDir;

    fn yaml_with_dirs(src: &Path, dst: &Path) -> String {
        format!(
            r#"
binary: /opt/rclone/rclone
min_version: "1.60"
pre_exec: "echo global-pre"
profiles:
  documents:
    action: copy
    source_path: {src}
    destination_path: {dst}
    filter_rules:
      - "- *.tmp"
      - "+ /**"
  photos:
    action: mirror
    source_path: {src}
    destination: gdrive
    destination_path: /backup/photos
    disable_fast_list: true
    extra_options: ["--transfers", "8"]
    post_exec: "echo done"
"#,
            src = src.display(),
            dst = dst.display()
        )
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        let config_path = temp_dir.path().join("k_sync.yml");
        std::fs::write(&config_path, yaml_with_dirs(&src, &dst)).unwrap();

        let config = SyncConfig::load(&config_path).unwrap();
        assert_eq!(config.binary(), "/opt/rclone/rclone");
        assert_eq!(config.min_version(), BinaryVersion::new(1, 60, 0));
        assert_eq!(config.pre_exec().as_deref(), Some("echo global-pre"));
        assert!(config.post_exec().is_none());

        let names: Vec<_> = config.profiles().iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, vec!["documents", "photos"]);
        let photos = config.profiles().get("photos").unwrap();
        assert_eq!(photos.action(), Action::Mirror);
        assert!(photos.disable_fast_list());
        assert_eq!(photos.extra_options(), &vec!["--transfers".to_string(), "8".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::from_yaml_str("profiles: {}\n").unwrap();
        assert_eq!(config.binary(), "rclone");
        assert_eq!(config.min_version(), BinaryVersion::default());
        assert_eq!(config.lock_file(), &std::env::temp_dir().join("k_sync.lock"));
        assert!(config.profiles().is_empty());

        let empty = SyncConfig::from_yaml_str("binary: rclone\n").unwrap();
        assert!(empty.profiles().is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = SyncConfig::load(temp_dir.path().join("missing.yml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(err.exit_status(), ExitStatus::ConfigInvalid);
    }

    #[test]
    fn test_all_invalid_profiles_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("k_sync.yml");
        std::fs::write(
            &config_path,
            "profiles:\n  one:\n    action: copy\n    source_path: /no/such/dir/one\n    destination: r\n    destination_path: /x\n  two:\n    action: copy\n    source: r\n    source_path: relative\n    destination: r\n    destination_path: /x\n",
        )
        .unwrap();

        let err = SyncConfig::load(&config_path).unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::ConfigInvalid);
        let Error::Config { error, .. } = err else {
            panic!("Expected Config error");
        };
        assert_eq!((*error).into_iter().count(), 2);
    }

    #[test]
    fn test_single_file_source_loads() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("db.sqlite");
        std::fs::write(&db, "sqlite").unwrap();
        let config = SyncConfig::from_yaml_str(&format!(
            "profiles:\n  one:\n    action: copy\n    source_path: {}\n    destination: remote\n    destination_path: /dir\n",
            db.display()
        ))
        .unwrap();
        assert_eq!(config.profiles().len(), 1);
    }

    #[test]
    fn test_unmarked_filter_rule_fails_load() {
        let err = SyncConfig::from_yaml_str(
            "profiles:\n  one:\n    action: copy\n    source: r\n    source_path: /a\n    destination: s\n    destination_path: /b\n    filter_rules:\n      - \"*.tmp\"\n",
        )
        .unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::ConfigInvalid);
    }

    #[test]
    fn test_unknown_action_fails_load() {
        let err = SyncConfig::from_yaml_str(
            "profiles:\n  one:\n    action: move\n    source: r\n    source_path: /a\n    destination: s\n    destination_path: /b\n",
        )
        .unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::ConfigInvalid);
    }

    #[test]
    fn test_blank_global_hook_is_invalid() {
        let err = SyncConfig::from_yaml_str("post_exec: \"  \"\n").unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::ConfigInvalid);
    }

    #[test]
    fn test_unknown_top_level_key() {
        assert!(SyncConfig::from_yaml_str("cron: \"0 * * * *\"\n").is_err());
    }
}
