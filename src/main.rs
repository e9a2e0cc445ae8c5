use clap::Parser;
use k_sync::sync::engine::{RunRequest, SyncEngine};
use k_sync::sync::exit_status::ExitStatus;
use k_sync::sync::lock::InstanceLock;
use k_sync::sync::logging::{init_logging, LogLevel};
use k_sync::sync::process::ProcessRunner;
use k_sync::sync::result_error::error::Error;
use k_sync::sync::result_error::result::Result;
use k_sync::sync::sync_config::SyncConfig;
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info};

/// Run backup profiles through rclone
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long)]
    config: PathBuf,

    /// Profiles to run, in order (default: all, in config order)
    profiles: Vec<String>,

    /// Shell command to run before any profile, overrides the config
    #[arg(long)]
    pre_exec: Option<String>,

    /// Shell command to run after all profiles, overrides the config
    #[arg(long)]
    post_exec: Option<String>,

    /// Only validate the config file
    #[arg(long, conflicts_with = "list")]
    check: bool,

    /// Print the configured profiles and exit
    #[arg(long)]
    list: bool,

    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_level);

    let status = run(args).unwrap_or_else(|e| {
        error!("{e}");
        e.exit_status()
    });
    exit(status.code());
}

fn run(args: Args) -> Result<ExitStatus> {
    let config = SyncConfig::load(&args.config)?;
    if config.profiles().is_empty() {
        return Err(Error::NoProfiles);
    }

    if args.check {
        info!(
            "Config {:?} is valid, {} profile(s)",
            args.config,
            config.profiles().len()
        );
        return Ok(ExitStatus::Success);
    }

    if args.list {
        for profile in config.profiles().iter() {
            println!("{}", profile.summary());
        }
        return Ok(ExitStatus::Success);
    }

    let _lock = InstanceLock::acquire(config.lock_file())?;
    let request = RunRequest::builder()
        .profiles(args.profiles)
        .maybe_pre_exec(args.pre_exec)
        .maybe_post_exec(args.post_exec)
        .build();
    let summary = SyncEngine::new(config, ProcessRunner).run(&request)?;
    summary.log_report();
    Ok(summary.exit_status())
}
