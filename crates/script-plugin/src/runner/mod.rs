//! Execution of the embedded script as a child process.
//!
//! [`ScriptRunner`] materialises its [`ScriptPayload`] into a uniquely named
//! temporary file, marks it executable, and spawns it with the configured
//! arguments. Standard output and standard error share one pipe so the
//! captured buffer preserves the order in which the script wrote them.
//!
//! The temporary file is owned by a [`tempfile::TempPath`] for the duration
//! of the call and is removed when that guard drops, whichever way the call
//! returns.
//!
//! An optional timeout bounds the whole call, measured from spawn. A script
//! still running at the deadline is killed. A script that exits but leaves
//! background processes holding its output open is reported as timed out
//! once the deadline passes.
//!
//! The [`ScriptExecutor`] trait abstracts execution so the plugin can be
//! driven by test doubles that never spawn a process.

use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use crate::error::{ExecutionCause, IoStep, PluginError};

/// Tracing target for script execution.
const RUNNER_TARGET: &str = "script_plugin::runner";

const SCRIPT_PREFIX: &str = "script-";
const SCRIPT_SUFFIX: &str = ".sh";

/// Owner read/write/execute, group and other read/execute.
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Attempts made when the kernel reports the fresh script as busy.
const BUSY_SPAWN_ATTEMPTS: u32 = 5;
const BUSY_SPAWN_DELAY: Duration = Duration::from_millis(10);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Script bytes executed on every run.
///
/// The payload is supplied when the runner is built, normally from an
/// `include_bytes!` in the binary crate.
///
/// # Example
///
/// ```
/// use script_plugin::ScriptPayload;
///
/// let payload = ScriptPayload::from_static(b"#!/bin/sh\necho hi\n");
/// assert!(!payload.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPayload(Arc<[u8]>);

impl ScriptPayload {
    /// Wraps owned script bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Wraps bytes embedded in the binary.
    #[must_use]
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self(Arc::from(bytes))
    }

    /// Returns the raw script bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the payload has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trait abstracting script execution for testability.
///
/// The production implementation is [`ScriptRunner`]. Test code can
/// implement this trait to return canned output without spawning a
/// process.
pub trait ScriptExecutor {
    /// Runs the script with `arguments` and returns its combined output.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the script cannot be materialised and
    /// [`PluginError::Execution`] if it cannot be spawned, exits
    /// unsuccessfully, or exceeds `timeout`.
    fn execute(
        &self,
        arguments: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, PluginError>;
}

/// Runs a fixed script payload from a temporary executable file.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    payload: ScriptPayload,
    temp_dir: Option<PathBuf>,
}

impl ScriptRunner {
    /// Creates a runner that writes scripts to the system temporary
    /// directory.
    #[must_use]
    pub const fn new(payload: ScriptPayload) -> Self {
        Self {
            payload,
            temp_dir: None,
        }
    }

    /// Writes scripts into `dir` instead of the system temporary directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Returns the payload this runner executes.
    #[must_use]
    pub const fn payload(&self) -> &ScriptPayload {
        &self.payload
    }

    /// Writes the payload to a fresh temporary file and marks it executable.
    fn materialise(&self) -> Result<TempPath, PluginError> {
        let mut builder = Builder::new();
        builder.prefix(SCRIPT_PREFIX).suffix(SCRIPT_SUFFIX);
        let created = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = created.map_err(|err| PluginError::io(IoStep::Create, err))?;

        write_payload(&mut file, &self.payload)?;

        make_executable(file.path())?;

        // Closing the write handle before exec avoids ETXTBSY from our own
        // descriptor.
        Ok(file.into_temp_path())
    }
}

impl ScriptExecutor for ScriptRunner {
    fn execute(
        &self,
        arguments: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, PluginError> {
        let script = self.materialise()?;
        debug!(
            target: RUNNER_TARGET,
            script = %script.display(),
            payload_bytes = self.payload.len(),
            ?arguments,
            "spawning script"
        );

        let started = Instant::now();
        let result = spawn_and_capture(&script, arguments, timeout);
        debug!(
            target: RUNNER_TARGET,
            success = result.is_ok(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "script finished"
        );

        // `script` drops here and removes the file.
        result
    }
}

fn write_payload(sink: &mut impl Write, payload: &ScriptPayload) -> Result<(), PluginError> {
    sink.write_all(payload.as_bytes())
        .and_then(|()| sink.flush())
        .map_err(|err| PluginError::io(IoStep::Write, err))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), PluginError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(EXECUTABLE_MODE))
        .map_err(|err| PluginError::io(IoStep::Permissions, err))
}

#[cfg(not(unix))]
const fn make_executable(_path: &Path) -> Result<(), PluginError> {
    Ok(())
}

fn spawn_and_capture(
    script: &Path,
    arguments: &[String],
    timeout: Option<Duration>,
) -> Result<String, PluginError> {
    let started = Instant::now();
    let (reader, writer) = io::pipe().map_err(spawn_error)?;
    let spawned = spawn(script, arguments, &writer);
    // The parent must not hold a write end or the collector never sees EOF.
    drop(writer);
    let mut child = spawned.map_err(spawn_error)?;

    let collector = collect_output(reader);
    let (status, output) = match timeout {
        Some(limit) => {
            let status = wait_with_timeout(&mut child, limit, started)?;
            let output = receive_output_within(&collector, limit, started)?;
            (status, output)
        }
        None => {
            let status = child.wait().map_err(wait_error)?;
            (status, receive_output(&collector)?)
        }
    };

    debug!(target: RUNNER_TARGET, ?status, output_bytes = output.len(), "script exited");
    if status.success() {
        return Ok(output);
    }
    Err(PluginError::execution(
        ExecutionCause::NonZeroExit {
            status: status.code().unwrap_or(-1),
        },
        output,
    ))
}

/// Spawns the script, retrying only while the kernel reports it busy.
///
/// A concurrent fork elsewhere in the process can briefly inherit the
/// write descriptor of a just-written script.
fn spawn(script: &Path, arguments: &[String], writer: &PipeWriter) -> io::Result<Child> {
    let mut attempt = 1;
    loop {
        let mut command = Command::new(script);
        command
            .args(arguments)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer.try_clone()?);

        match command.spawn() {
            Err(err) if is_text_file_busy(&err) && attempt < BUSY_SPAWN_ATTEMPTS => {
                debug!(target: RUNNER_TARGET, attempt, "script busy, retrying spawn");
                attempt += 1;
                thread::sleep(BUSY_SPAWN_DELAY);
            }
            other => return other,
        }
    }
}

#[cfg(unix)]
fn is_text_file_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
const fn is_text_file_busy(_err: &io::Error) -> bool {
    false
}

/// Reads the pipe to EOF on a worker thread.
///
/// EOF arrives only once every holder of the write end has exited, which
/// includes background processes the script left behind.
fn collect_output(mut reader: PipeReader) -> Receiver<io::Result<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = reader.read_to_end(&mut buffer).map(|_| buffer);
        // The receiver is gone once the run has timed out.
        drop(sender.send(result));
    });
    receiver
}

fn receive_output(collector: &Receiver<io::Result<Vec<u8>>>) -> Result<String, PluginError> {
    let bytes = collector
        .recv()
        .map_err(|_| collector_stopped())?
        .map_err(wait_error)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Waits for the collected output until `limit`, measured from `started`,
/// has elapsed.
fn receive_output_within(
    collector: &Receiver<io::Result<Vec<u8>>>,
    limit: Duration,
    started: Instant,
) -> Result<String, PluginError> {
    let remaining = limit.saturating_sub(started.elapsed());
    match collector.recv_timeout(remaining) {
        Ok(result) => {
            let bytes = result.map_err(wait_error)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                target: RUNNER_TARGET,
                timeout_secs = limit.as_secs(),
                "script exited but its output stayed open past the timeout"
            );
            Err(timed_out(limit))
        }
        Err(RecvTimeoutError::Disconnected) => Err(collector_stopped()),
    }
}

/// Polls the child until it exits, killing it once `limit`, measured from
/// `started`, elapses.
fn wait_with_timeout(
    child: &mut Child,
    limit: Duration,
    started: Instant,
) -> Result<ExitStatus, PluginError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if started.elapsed() > limit => {
                warn!(
                    target: RUNNER_TARGET,
                    timeout_secs = limit.as_secs(),
                    "script timed out, killing process"
                );
                drop(child.kill());
                drop(child.wait());
                // Output collection is abandoned: descendants of the script
                // may still hold the pipe open.
                return Err(timed_out(limit));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(wait_error(err)),
        }
    }
}

fn timed_out(limit: Duration) -> PluginError {
    PluginError::execution(
        ExecutionCause::TimedOut {
            timeout_secs: limit.as_secs(),
        },
        String::new(),
    )
}

fn collector_stopped() -> PluginError {
    wait_error(io::Error::other("output collector stopped"))
}

fn spawn_error(err: io::Error) -> PluginError {
    PluginError::execution(ExecutionCause::Spawn(Arc::new(err)), String::new())
}

fn wait_error(err: io::Error) -> PluginError {
    PluginError::execution(ExecutionCause::Wait(Arc::new(err)), String::new())
}
