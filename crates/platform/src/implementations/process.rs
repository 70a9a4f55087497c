//! Native process operations implementation
//!
//! Children are spawned into their own process group (unix) with piped
//! output. Both streams are drained concurrently into [`TailBuffer`]s so a
//! chatty tool can neither block on a full pipe nor exhaust memory. When the
//! wall-clock limit elapses the whole group is killed and the child reaped.
//! A child that exits normally still has its group killed, so a backgrounded
//! grandchild cannot hold the pipes open.

use async_trait::async_trait;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use webforge_errors::{Error, PlatformError};
use webforge_events::{
    AppEvent, EventEmitter, FailureContext, ProcessCommandDescriptor, ProcessEvent,
};

use crate::core::PlatformContext;
use crate::process::{diagnostic_text, CommandOutput, PlatformCommand, ProcessOperations, TailBuffer};

/// How long to wait for the output readers once the child has exited
const DRAIN_GRACE: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 16 * 1024;

/// Process operations backed by `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeProcessOperations;

impl NativeProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Whole seconds, rounded up so a sub-second limit never reads as zero
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

fn emit_failed(ctx: &PlatformContext, descriptor: &ProcessCommandDescriptor, error: &PlatformError) {
    ctx.emit(AppEvent::Process(ProcessEvent::Failed {
        command: descriptor.clone(),
        message: FailureContext::from_error(error).message,
    }));
}

type SharedTail = Arc<Mutex<TailBuffer>>;

fn spawn_reader<R>(reader: Option<R>, buffer: SharedTail) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = reader?;
    Some(tokio::spawn(async move {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut tail) = buffer.lock() {
                        tail.push(&chunk[..n]);
                    }
                }
            }
        }
    }))
}

/// Wait for the readers to hit EOF, aborting any still blocked after the grace period
async fn drain_readers(handles: Vec<JoinHandle<()>>) {
    let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
    if tokio::time::timeout(DRAIN_GRACE, futures::future::join_all(handles))
        .await
        .is_err()
    {
        for abort in aborts {
            abort.abort();
        }
    }
}

fn take_tail(buffer: &SharedTail) -> (Vec<u8>, u64, u64) {
    match buffer.lock() {
        Ok(mut tail) => {
            let taken = std::mem::replace(&mut *tail, TailBuffer::new(1));
            let dropped = taken.dropped();
            let total = taken.total();
            (taken.into_bytes(), dropped, total)
        }
        Err(_) => (Vec::new(), 0, 0),
    }
}

/// SIGKILL the process group led by `pid`
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    if let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        // ESRCH when every member has already exited
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Kill the child's process group, then the child itself, and reap it
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);
    // `kill` also waits, so no zombie is left behind
    let _ = child.kill().await;
}

#[async_trait]
impl ProcessOperations for NativeProcessOperations {
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        let start = Instant::now();
        let descriptor = cmd.descriptor();
        let timeout = cmd.get_timeout();

        ctx.emit(AppEvent::Process(ProcessEvent::Started {
            command: descriptor.clone(),
            timeout_secs: timeout.map_or(0, whole_seconds),
        }));

        let mut command = Command::new(cmd.program());
        command
            .args(cmd.get_args())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = cmd.get_current_dir() {
            command.current_dir(dir);
        }

        for (key, value) in cmd.get_env_vars() {
            command.env(key, value);
        }

        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let error = if e.kind() == std::io::ErrorKind::NotFound {
                    PlatformError::CommandNotFound {
                        command: cmd.program().to_string(),
                    }
                } else {
                    PlatformError::ProcessExecutionFailed {
                        command: cmd.display_line(),
                        message: e.to_string(),
                    }
                };
                emit_failed(ctx, &descriptor, &error);
                return Err(error.into());
            }
        };

        // Read before waiting: the id is cleared once the child is reaped
        let pid = child.id();
        let limit = cmd.get_max_capture_bytes();
        let stdout_tail: SharedTail = Arc::new(Mutex::new(TailBuffer::new(limit)));
        let stderr_tail: SharedTail = Arc::new(Mutex::new(TailBuffer::new(limit)));
        let readers: Vec<JoinHandle<()>> = [
            spawn_reader(child.stdout.take(), Arc::clone(&stdout_tail)),
            spawn_reader(child.stderr.take(), Arc::clone(&stderr_tail)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        let status = match waited {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                terminate(&mut child, pid).await;
                drain_readers(readers).await;
                let error = PlatformError::ProcessExecutionFailed {
                    command: cmd.display_line(),
                    message: e.to_string(),
                };
                emit_failed(ctx, &descriptor, &error);
                return Err(error.into());
            }
            None => {
                terminate(&mut child, pid).await;
                drain_readers(readers).await;
                let (stdout, _, _) = take_tail(&stdout_tail);
                let (stderr, _, _) = take_tail(&stderr_tail);
                let seconds = timeout.map_or(0, whole_seconds);
                ctx.emit(AppEvent::Process(ProcessEvent::TimedOut {
                    command: descriptor,
                    seconds,
                }));
                return Err(PlatformError::ProcessTimeout {
                    command: cmd.display_line(),
                    seconds,
                    output: diagnostic_text(&stdout, &stderr),
                }
                .into());
            }
        };

        kill_group(pid);
        drain_readers(readers).await;
        let (stdout, stdout_dropped, stdout_total) = take_tail(&stdout_tail);
        let (stderr, stderr_dropped, stderr_total) = take_tail(&stderr_tail);
        let duration = start.elapsed();

        let output = CommandOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            truncated_bytes: stdout_dropped + stderr_dropped,
            duration,
        };

        ctx.emit(AppEvent::Process(ProcessEvent::Completed {
            command: descriptor,
            exit_code: output.exit_code,
            duration_ms: duration_to_millis(duration),
            stdout_bytes: stdout_total,
            stderr_bytes: stderr_total,
            truncated_bytes: output.truncated_bytes,
        }));

        Ok(output)
    }
}
