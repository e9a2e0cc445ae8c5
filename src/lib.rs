//! # k-sync
//!
//! Runs named backup profiles through an external transfer binary (`rclone`
//! by default), one profile at a time.
//!
//! ## Features
//!
//! - **Profiles**: Local or remote source and destination, copy or mirror
//! - **Filters**: Ordered include/exclude rules passed through to the binary
//! - **Hooks**: Global and per-profile `pre_exec`/`post_exec` shell commands
//! - **Fast listing**: `--fast-list` added automatically for backends that support it
//! - **Single instance**: A lock file keeps scheduled runs from overlapping
//!
//! ## Quick Start
//!
//! ```no_run
//! use k_sync::sync::engine::{RunRequest, SyncEngine};
//! use k_sync::sync::lock::InstanceLock;
//! use k_sync::sync::process::ProcessRunner;
//! use k_sync::sync::sync_config::SyncConfig;
//!
//! let config = SyncConfig::load("k_sync.yml")?;
//! let _lock = InstanceLock::acquire(config.lock_file())?;
//! let summary = SyncEngine::new(config, ProcessRunner).run(&RunRequest::default())?;
//! summary.log_report();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod sync;
