//! Abstractions for remote command execution to enable testing and mocking.
//!
//! The `RemoteShell` trait lets the collector talk to a real Varnish host
//! over SSH or to an in-memory mock in tests.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

/// Connection settings for one remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or IP address.
    pub host: String,
    /// Login user. `None` leaves the choice to the SSH client configuration.
    pub user: Option<String>,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Target {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: 22,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}@{}:{}", user, self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// Failures of the remote transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The host did not answer within the connect timeout.
    #[error("connection to {host} timed out")]
    Timeout { host: String },
    /// The session could not be established (unreachable host, auth failure, ...).
    #[error("cannot connect to {host}: {message}")]
    Connect { host: String, message: String },
    /// A remote command exited unsuccessfully.
    #[error("remote command '{command}' failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    /// Local I/O failure while driving the SSH client.
    #[error("ssh client: {0}")]
    Io(#[from] io::Error),
}

/// Opens sessions on remote hosts.
pub trait RemoteShell {
    type Session: RemoteSession;

    /// Opens one authenticated session to `target`.
    fn open(&self, target: &Target) -> Result<Self::Session, TransportError>;
}

/// An open session that runs commands and returns their standard output.
pub trait RemoteSession {
    /// Runs `command` and returns its captured standard output.
    fn exec(&mut self, command: &str) -> Result<String, TransportError>;

    /// Closes the session.
    fn close(self) -> Result<(), TransportError>;
}

/// Remote shell backed by the system OpenSSH client.
///
/// Each session is an OpenSSH control master whose socket lives in a private
/// temporary directory; commands are multiplexed over it, so a session
/// authenticates exactly once.
#[derive(Debug, Clone)]
pub struct SshShell {
    program: PathBuf,
}

impl Default for SshShell {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh"),
        }
    }
}

impl SshShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific `ssh` executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RemoteShell for SshShell {
    type Session = SshSession;

    fn open(&self, target: &Target) -> Result<SshSession, TransportError> {
        let control_dir = tempfile::Builder::new()
            .prefix("varnish-metrics-")
            .tempdir()?;
        let control_path = control_dir.path().join("ctl");
        let log_path = control_dir.path().join("master.log");

        info!("opening ssh session to {}", target);
        let status = Command::new(&self.program)
            .args(ssh_args(
                target,
                &control_path,
                &["-M", "-f", "-N", "-o", "ControlPersist=no"],
            ))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&log_path)?)
            .status()?;

        if !status.success() {
            let log = std::fs::read_to_string(&log_path).unwrap_or_default();
            return Err(classify_connect_failure(&target.host, &log));
        }

        Ok(SshSession {
            program: self.program.clone(),
            target: target.clone(),
            control_path,
            _control_dir: control_dir,
            closed: false,
        })
    }
}

/// A multiplexed OpenSSH session. Closed on drop if [`RemoteSession::close`]
/// was not called.
#[derive(Debug)]
pub struct SshSession {
    program: PathBuf,
    target: Target,
    control_path: PathBuf,
    // Holds the socket directory alive until the session is gone.
    _control_dir: tempfile::TempDir,
    closed: bool,
}

impl SshSession {
    fn run(&self, extra: &[&str], command: Option<&str>) -> io::Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(ssh_args(&self.target, &self.control_path, extra))
            .stdin(Stdio::null());
        if let Some(command) = command {
            cmd.arg(command);
        }
        cmd.output()
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        let output = self.run(&["-O", "exit"], None)?;
        if !output.status.success() {
            return Err(TransportError::Command {
                command: "-O exit".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!("closed ssh session to {}", self.target);
        Ok(())
    }
}

impl RemoteSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<String, TransportError> {
        debug!(command, "running remote command");
        let output = self.run(&[], Some(command))?;
        if !output.status.success() {
            return Err(TransportError::Command {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn close(mut self) -> Result<(), TransportError> {
        self.shutdown()
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.shutdown() {
                warn!("failed to close ssh session to {}: {}", self.target, e);
            }
        }
    }
}

/// Full argument list up to the host; `--` keeps a host starting with `-`
/// from being read as an option.
fn ssh_args(target: &Target, control_path: &Path, extra: &[&str]) -> Vec<String> {
    let mut args = base_args(target, control_path);
    args.extend(extra.iter().map(|arg| arg.to_string()));
    args.push("--".to_string());
    args.push(target.host.clone());
    args
}

/// Options shared by the master and every multiplexed client.
fn base_args(target: &Target, control_path: &Path) -> Vec<String> {
    let mut args = vec![
        "-S".to_string(),
        control_path.display().to_string(),
        "-p".to_string(),
        target.port.to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", target.connect_timeout.as_secs().max(1)),
    ];
    if let Some(user) = &target.user {
        args.push("-l".to_string());
        args.push(user.clone());
    }
    args
}

fn classify_connect_failure(host: &str, log: &str) -> TransportError {
    let message = log.trim();
    if message.to_lowercase().contains("timed out") {
        TransportError::Timeout {
            host: host.to_string(),
        }
    } else {
        TransportError::Connect {
            host: host.to_string(),
            message: if message.is_empty() {
                "ssh exited with an error".to_string()
            } else {
                message.to_string()
            },
        }
    }
}
