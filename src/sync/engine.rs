//! Runs the selected profiles one after another.
//!
//! A run goes through selection, the binary version check, the global pre
//! hook, every selected profile in order, and finally the global post hook.
//! Per profile, a failing `pre_exec` skips the transfer and `post_exec` of
//! that profile only. A failing transfer still runs `post_exec`. Nothing is
//! retried and nothing runs concurrently.

use crate::sync::command::CommandBuilder;
use crate::sync::exit_status::ExitStatus;
use crate::sync::probe::TransportCapabilityProbe;
use crate::sync::process::{CommandRunner, CommandSpec, ProcessOutput};
use crate::sync::profile::ProfileEntry;
use crate::sync::result_error::error::Error;
use crate::sync::result_error::result::Result;
use crate::sync::sync_config::SyncConfig;
use crate::sync::version::check_binary_version;
use bon::Builder;
use derive_more::Display;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use tracing::{error, info, warn};

/// Stage of a profile run.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Stage {
    #[display("pre_exec")]
    PreExec,
    #[display("transfer")]
    Transfer,
    #[display("post_exec")]
    PostExec,
}

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum RunStatus {
    #[default]
    #[display("success")]
    Success,
    #[display("failure")]
    Failure,
}

impl RunStatus {
    fn escalate(&mut self, ok: bool) {
        if !ok {
            *self = RunStatus::Failure;
        }
    }
}

/// Result of one profile.
///
/// `failed_stage` is the first stage that failed, with its exit code and
/// output. On success the transfer's exit code and output are kept.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct ExecutionOutcome {
    #[getset(get = "pub")]
    profile_name: String,
    #[getset(get_copy = "pub")]
    failed_stage: Option<Stage>,
    #[getset(get_copy = "pub")]
    exit_code: i32,
    #[getset(get = "pub")]
    stdout: String,
    #[getset(get = "pub")]
    stderr: String,
}

impl ExecutionOutcome {
    fn new(profile_name: &str, failed_stage: Option<Stage>, output: ProcessOutput) -> Self {
        Self {
            profile_name: profile_name.to_string(),
            failed_stage,
            exit_code: output.exit_code(),
            stdout: output.stdout().clone(),
            stderr: output.stderr().clone(),
        }
    }

    pub fn success(&self) -> bool {
        self.failed_stage.is_none()
    }
}

/// Everything that happened during one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Getters, CopyGetters)]
pub struct RunSummary {
    #[getset(get = "pub")]
    global_pre_exec: Option<ProcessOutput>,
    #[getset(get = "pub")]
    outcomes: Vec<ExecutionOutcome>,
    #[getset(get = "pub")]
    global_post_exec: Option<ProcessOutput>,
    #[getset(get_copy = "pub")]
    status: RunStatus,
}

impl RunSummary {
    pub fn exit_status(&self) -> ExitStatus {
        match self.status {
            RunStatus::Success => ExitStatus::Success,
            RunStatus::Failure => ExitStatus::Failure,
        }
    }

    fn record(&mut self, outcome: ExecutionOutcome) {
        self.status.escalate(outcome.success());
        self.outcomes.push(outcome);
    }

    /// Logs one line per hook and profile, with captured stderr of failures.
    pub fn log_report(&self) {
        let log_hook = |name: &str, output: &Option<ProcessOutput>| match output {
            Some(output) if !output.success() => error!(
                "Global {name} failed with exit code {}:\n{}",
                output.exit_code(),
                indent::indent_all_with("  ", output.stderr().as_str())
            ),
            Some(_) => info!("Global {name} succeeded"),
            None => {}
        };

        log_hook("pre_exec", &self.global_pre_exec);
        for outcome in &self.outcomes {
            match outcome.failed_stage {
                None => info!("Profile {:?} succeeded", outcome.profile_name),
                Some(stage) => error!(
                    "Profile {:?} failed at {stage} with exit code {}:\n{}",
                    outcome.profile_name,
                    outcome.exit_code,
                    indent::indent_all_with("  ", outcome.stderr.as_str())
                ),
            }
        }
        log_hook("post_exec", &self.global_post_exec);

        let failed = self.outcomes.iter().filter(|o| !o.success()).count();
        info!(
            "Run finished: {} profile(s), {} failed, status {}",
            self.outcomes.len(),
            failed,
            self.status
        );
    }
}

/// What to run. Global hooks given here replace the configured ones.
#[derive(Clone, Debug, Default, Builder)]
pub struct RunRequest {
    /// Profile names in run order; empty selects every configured profile.
    #[builder(default, into)]
    profiles: Vec<String>,
    #[builder(into)]
    pre_exec: Option<String>,
    #[builder(into)]
    post_exec: Option<String>,
}

pub struct SyncEngine<R: CommandRunner> {
    config: SyncConfig,
    runner: R,
}

impl<R: CommandRunner> SyncEngine<R> {
    pub fn new(config: SyncConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Profiles to run, in run order.
    ///
    /// Every requested name must exist, otherwise nothing is selected.
    pub fn select(&self, names: &[String]) -> Result<Vec<&ProfileEntry>> {
        let profiles = self.config.profiles();
        if profiles.is_empty() {
            return Err(Error::NoProfiles);
        }
        if names.is_empty() {
            return Ok(profiles.iter().collect());
        }

        let missing = names
            .iter()
            .filter(|name| profiles.get(name).is_none())
            .unique()
            .cloned()
            .collect_vec();
        if !missing.is_empty() {
            return Err(Error::ProfileNotFound(missing));
        }

        Ok(names
            .iter()
            .unique()
            .filter_map(|name| profiles.get(name))
            .collect())
    }

    pub fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        let selected = self.select(&request.profiles)?;
        check_binary_version(&self.runner, self.config.binary(), self.config.min_version())?;

        let mut summary = RunSummary::default();
        let pre_exec = request.pre_exec.as_ref().or(self.config.pre_exec().as_ref());
        let post_exec = request.post_exec.as_ref().or(self.config.post_exec().as_ref());

        if let Some(hook) = pre_exec {
            info!("Running global pre_exec");
            let output = self.run_stage(&CommandSpec::shell(hook));
            let ok = output.success();
            summary.status.escalate(ok);
            summary.global_pre_exec = Some(output);
            if !ok {
                error!("Global pre_exec failed, no profile will run");
                return Ok(summary);
            }
        }

        for entry in selected {
            summary.record(self.run_profile(entry));
        }

        if let Some(hook) = post_exec {
            info!("Running global post_exec");
            let output = self.run_stage(&CommandSpec::shell(hook));
            summary.status.escalate(output.success());
            summary.global_post_exec = Some(output);
        }

        Ok(summary)
    }

    fn run_profile(&self, entry: &ProfileEntry) -> ExecutionOutcome {
        let name = entry.name();
        info!(profile = %name, "Starting profile");

        if let Some(hook) = entry.pre_exec() {
            let output = self.run_stage(&CommandSpec::shell(hook));
            if !output.success() {
                error!(
                    profile = %name,
                    "pre_exec failed with exit code {}, skipping transfer and post_exec",
                    output.exit_code()
                );
                return ExecutionOutcome::new(entry.name(), Some(Stage::PreExec), output);
            }
        }

        let probe = TransportCapabilityProbe::new(&self.runner, self.config.binary());
        let args = CommandBuilder::new(self.config.binary()).build(entry, &probe);
        info!(profile = %name, "Running {}", args.join(" "));
        let transfer = self.run_stage(&CommandSpec::Argv(args));
        let mut outcome = if transfer.success() {
            ExecutionOutcome::new(entry.name(), None, transfer)
        } else {
            error!(profile = %name, "Transfer failed with exit code {}", transfer.exit_code());
            ExecutionOutcome::new(entry.name(), Some(Stage::Transfer), transfer)
        };

        if let Some(hook) = entry.post_exec() {
            let output = self.run_stage(&CommandSpec::shell(hook));
            if !output.success() {
                error!(profile = %name, "post_exec failed with exit code {}", output.exit_code());
                if outcome.success() {
                    outcome = ExecutionOutcome::new(entry.name(), Some(Stage::PostExec), output);
                } else {
                    warn!(profile = %name, "Keeping the transfer failure as the outcome");
                }
            }
        }

        outcome
    }

    /// Runs one hook or transfer; a command that cannot start counts as exit code -1.
    fn run_stage(&self, command: &CommandSpec) -> ProcessOutput {
        self.runner.run(command).unwrap_or_else(|e| {
            error!("{e}");
            ProcessOutput::new(-1, "", format!("{e}\n"))
        })
    }
}
