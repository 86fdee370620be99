// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Control over individual `atest` processes.
//!
//! A [`ProcessHandle`] owns one `atest` child bound to one audio device. Handles are started with
//! [`ProcessHandle::start`], and end either by running out their `-d` duration
//! ([`ProcessHandle::wait`]) or through an interrupt request ([`ProcessHandle::stop`]). Both
//! operations are idempotent: once the exit status is known it is cached and returned again.

use crate::{
    config::AtestConfig,
    errors::{InterruptError, LaunchError, StopError, WaitError},
};
use std::{
    fmt,
    process::{Child, Command, ExitStatus},
};
use tracing::debug;

/// One of the two audio endpoints under test.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Target {
    /// The master endpoint.
    Master,

    /// The slave endpoint.
    Slave,
}

impl Target {
    /// The label used in status lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Master => "MASTER",
            Self::Slave => "SLAVE",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "master"),
            Self::Slave => write!(f, "slave"),
        }
    }
}

/// Whether a process produces audio or records it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Role {
    /// Generate the test sequence.
    Playback,

    /// Record and check the test sequence.
    Capture,
}

impl Role {
    /// The test token `atest` expects on its command line.
    pub fn token(self) -> &'static str {
        match self {
            Self::Playback => "play",
            Self::Capture => "capture",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playback => write!(f, "playback"),
            Self::Capture => write!(f, "capture"),
        }
    }
}

/// Everything needed to start one `atest` process, apart from the executable itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AtestInvocation {
    device: String,
    role: Role,
    duration: Option<u32>,
    assert_on_failure: bool,
    extra_args: Vec<String>,
}

impl AtestInvocation {
    /// Creates an unbounded, non-asserting invocation of `role` on `device`.
    pub fn new(device: impl Into<String>, role: Role) -> Self {
        Self {
            device: device.into(),
            role,
            duration: None,
            assert_on_failure: false,
            extra_args: Vec::new(),
        }
    }

    /// Makes the process exit on its own after `seconds`.
    pub fn duration(mut self, seconds: u32) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Makes the process exit with a non-zero code as soon as it detects a stream anomaly.
    pub fn assert_on_failure(mut self) -> Self {
        self.assert_on_failure = true;
        self
    }

    /// Appends a test token after the role token.
    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// The device this invocation is bound to.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// The role of this invocation.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the full argument list passed to `atest`.
    ///
    /// Options come first, followed by the role token and any extra tokens.
    pub fn command_args(&self, config: &AtestConfig) -> Vec<String> {
        let mut args = vec![
            "-D".to_owned(),
            self.device.clone(),
            "-r".to_owned(),
            config.rate().to_string(),
            "-c".to_owned(),
            config.channels().to_string(),
        ];
        if let Some(priority) = config.priority() {
            args.extend(["-P".to_owned(), priority.to_owned()]);
        }
        if let Some(config_file) = config.config_file() {
            args.extend(["-C".to_owned(), config_file.to_string()]);
        }
        if let Some(duration) = self.duration {
            args.extend(["-d".to_owned(), duration.to_string()]);
        }
        if self.assert_on_failure {
            args.push("--assert".to_owned());
        }
        args.push(self.role.token().to_owned());
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl fmt::Display for AtestInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.role, self.device)?;
        if let Some(duration) = self.duration {
            write!(f, " for {duration}s")?;
        }
        if self.assert_on_failure {
            write!(f, " (asserting)")?;
        }
        Ok(())
    }
}

/// How an `atest` process ended.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AtestExit {
    /// The process exited with this code.
    Code(i32),

    /// The process was terminated by this signal.
    Signal(i32),
}

impl AtestExit {
    /// Returns true if the process exited with code 0.
    pub fn is_success(self) -> bool {
        self == Self::Code(0)
    }
}

impl From<ExitStatus> for AtestExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Code(code);
        }
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                use std::os::unix::process::ExitStatusExt;
                // code() is only None on Unix when the process was signaled.
                Self::Signal(status.signal().unwrap_or_default())
            } else {
                Self::Code(-1)
            }
        }
    }
}

impl fmt::Display for AtestExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}

#[derive(Debug)]
enum HandleState {
    Running(Child),
    Exited(AtestExit),
}

/// A running or finished `atest` process.
///
/// Dropping a handle whose process is still running interrupts the process and waits for it, so
/// that a scenario aborted by an error never leaves a device claimed.
#[derive(Debug)]
pub struct ProcessHandle {
    invocation: AtestInvocation,
    pid: u32,
    state: HandleState,
}

impl ProcessHandle {
    /// Spawns `atest` for `invocation` and returns without waiting for it.
    pub fn start(config: &AtestConfig, invocation: AtestInvocation) -> Result<Self, LaunchError> {
        let args = invocation.command_args(config);
        let mut command = Command::new(config.program());
        command.args(&args);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(error) => return Err(LaunchError::new(config.program(), args, error)),
        };
        let pid = child.id();
        debug!(
            pid,
            device = invocation.device(),
            role = %invocation.role(),
            "started atest process {pid}: {} {}",
            config.program(),
            args.join(" ")
        );

        Ok(Self {
            invocation,
            pid,
            state: HandleState::Running(child),
        })
    }

    /// The invocation this process was started with.
    pub fn invocation(&self) -> &AtestInvocation {
        &self.invocation
    }

    /// The OS process ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns true until the exit status has been collected.
    pub fn is_running(&self) -> bool {
        matches!(self.state, HandleState::Running(_))
    }

    /// The exit status, if it has been collected.
    pub fn exit(&self) -> Option<AtestExit> {
        match self.state {
            HandleState::Running(_) => None,
            HandleState::Exited(exit) => Some(exit),
        }
    }

    /// Blocks until the process exits on its own, and returns its exit status.
    ///
    /// There is no timeout: a process started without a duration blocks here until something
    /// else stops it.
    pub fn wait(&mut self) -> Result<AtestExit, WaitError> {
        let status = match &mut self.state {
            HandleState::Exited(exit) => return Ok(*exit),
            HandleState::Running(child) => child
                .wait()
                .map_err(|error| WaitError::new(self.pid, error))?,
        };

        let exit = AtestExit::from(status);
        debug!("atest process {} ({}) exited: {exit}", self.pid, self.invocation);
        self.state = HandleState::Exited(exit);
        Ok(exit)
    }

    /// Asks the process to terminate, then blocks until it exits.
    ///
    /// The request is cooperative: `atest` is expected to shut its stream down and exit with its
    /// own verdict. If the exit status is already known, no request is sent.
    pub fn stop(&mut self) -> Result<AtestExit, StopError> {
        match &mut self.state {
            HandleState::Exited(exit) => return Ok(*exit),
            HandleState::Running(child) => {
                debug!(
                    pid = self.pid,
                    device = self.invocation.device(),
                    role = %self.invocation.role(),
                    "interrupting atest process {} ({})",
                    self.pid,
                    self.invocation
                );
                imp::interrupt(child).map_err(|error| InterruptError::new(self.pid, error))?;
            }
        }
        Ok(self.wait()?)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(error) = self.stop() {
                debug!(
                    "failed to stop atest process {} ({}) on drop: {error}",
                    self.pid,
                    self.invocation()
                );
            }
        }
    }
}

#[cfg(unix)]
mod imp {
    use std::{io, process::Child};

    /// Sends SIGINT to the child.
    pub(super) fn interrupt(child: &mut Child) -> io::Result<()> {
        // The child has not been reaped yet, so its pid cannot have been reused.
        let pid = child.id() as libc::pid_t;
        let ret = unsafe { libc::kill(pid, libc::SIGINT) };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::{io, process::Child};

    /// There is no SIGINT to deliver outside of Unix, so the child is terminated instead.
    pub(super) fn interrupt(child: &mut Child) -> io::Result<()> {
        child.kill()
    }
}
