//! Running external commands with both output streams drained concurrently.
//!
//! Hooks run through the platform shell ([`CommandSpec::Shell`]); the transfer
//! itself runs from an argument vector with no shell involved
//! ([`CommandSpec::Argv`]).

#[cfg(test)]
pub(crate) mod fake;

use crate::sync::result_error::error::Error;
use crate::sync::result_error::result::Result;
use crate::sync::result_error::WithMsg;
use derive_more::Display;
use getset::{CopyGetters, Getters};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program and arguments, passed to the OS as-is.
    Argv(Vec<String>),
    /// Command line interpreted by `sh -c` (`cmd /C` on Windows).
    Shell(String),
}

impl CommandSpec {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn shell<S: Into<String>>(cmd: S) -> Self {
        Self::Shell(cmd.into())
    }

    /// Program name used in logs and spawn errors.
    pub fn program(&self) -> &str {
        match self {
            CommandSpec::Argv(args) => args.first().map(String::as_str).unwrap_or_default(),
            CommandSpec::Shell(_) => shell_program(),
        }
    }

    fn to_command(&self) -> Result<Command> {
        match self {
            CommandSpec::Argv(args) => {
                let (program, args) = args.split_first().ok_or(Error::EmptyCommand)?;
                let mut cmd = Command::new(program);
                cmd.args(args);
                Ok(cmd)
            }
            CommandSpec::Shell(line) => {
                let mut cmd = Command::new(shell_program());
                cmd.arg(if cfg!(windows) { "/C" } else { "-c" }).arg(line);
                Ok(cmd)
            }
        }
    }
}

fn shell_program() -> &'static str {
    if cfg!(windows) {
        "cmd"
    } else {
        "sh"
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum OutputStream {
    #[display("stdout")]
    Stdout,
    #[display("stderr")]
    Stderr,
}

/// Exit code and everything the process wrote.
///
/// Each captured line ends with `\n`, whether or not the process wrote one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Getters, CopyGetters)]
pub struct ProcessOutput {
    /// `-1` when the process was terminated by a signal.
    #[getset(get_copy = "pub")]
    exit_code: i32,
    #[getset(get = "pub")]
    stdout: String,
    #[getset(get = "pub")]
    stderr: String,
}

impl ProcessOutput {
    pub fn new<S1: Into<String>, S2: Into<String>>(exit_code: i32, stdout: S1, stderr: S2) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn push_line(&mut self, stream: OutputStream, line: &str) {
        let buf = match stream {
            OutputStream::Stdout => &mut self.stdout,
            OutputStream::Stderr => &mut self.stderr,
        };
        buf.push_str(line);
        buf.push('\n');
    }
}

/// Something that can run a [`CommandSpec`] to completion.
///
/// Spawn failures are returned as `Err`; a non-zero exit is a successful run
/// with a non-zero [`ProcessOutput::exit_code`].
pub trait CommandRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        (**self).run(command)
    }
}

/// Runs real OS processes.
///
/// stdout and stderr are each read on their own thread and forwarded line by
/// line over one channel, so neither pipe can fill up while the other is
/// being waited on. The run is complete only once both readers have hit EOF.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        let mut cmd = command.to_command()?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!("Running {:?}", command);
        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: command.program().to_string(),
            source,
        })?;

        let (line_tx, line_rx) = channel();
        let readers = [
            child
                .stdout
                .take()
                .map(|out| spawn_line_reader(OutputStream::Stdout, out, line_tx.clone())),
            child
                .stderr
                .take()
                .map(|err| spawn_line_reader(OutputStream::Stderr, err, line_tx.clone())),
        ];
        drop(line_tx);

        let mut output = ProcessOutput::default();
        // Ends once both readers have dropped their sender.
        for (stream, line) in line_rx {
            tracing::info!(stream = %stream, "{line}");
            output.push_line(stream, &line);
        }

        let mut read_error = None;
        for (stream, reader) in [OutputStream::Stdout, OutputStream::Stderr]
            .into_iter()
            .zip(readers)
        {
            let Some(reader) = reader else { continue };
            let result = reader
                .join()
                .map_err(|_| Error::ReaderPanicked(stream))
                .and_then(|r| {
                    r.map_err(Error::from)
                        .with_msg(format!("Reading {stream} of {:?} failed", command.program()))
                });
            if let Err(e) = result {
                read_error.get_or_insert(e);
            }
        }
        if let Some(e) = read_error {
            // A pipe that is no longer read could block the child forever.
            if let Err(kill_err) = child.kill() {
                tracing::warn!("Killing {:?} failed: {kill_err}", command.program());
            }
            if let Err(wait_err) = child.wait() {
                tracing::warn!("Waiting for {:?} failed: {wait_err}", command.program());
            }
            return Err(e);
        }

        let status = child
            .wait()
            .map_err(Error::from)
            .with_msg(format!("Waiting for {:?} failed", command.program()))?;
        output.exit_code = status.code().unwrap_or(-1);
        tracing::debug!("{:?} exited with code {}", command.program(), output.exit_code);
        Ok(output)
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    stream: OutputStream,
    source: R,
    line_tx: Sender<(OutputStream, String)>,
) -> JoinHandle<std::io::Result<()>> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Keep draining so the child never blocks on a full pipe.
                    let _ = std::io::copy(&mut reader, &mut std::io::sink());
                    return Err(e);
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if line_tx.send((stream, line.to_string())).is_err() {
                // Receiver is gone, nothing left to deliver to.
                std::io::copy(&mut reader, &mut std::io::sink())?;
                return Ok(());
            }
        }
    })
}
