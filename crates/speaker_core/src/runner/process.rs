//! External process execution with a hard time limit.
//!
//! Output pipes are drained on helper threads so a chatty tool can't
//! stall on a full pipe while we poll for exit. On timeout the child is
//! killed and reaped before returning. A grandchild that inherited the
//! pipes can keep them open after the child exits, so draining is also
//! bounded by the deadline and whatever was read by then is kept.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::errors::{ToolError, ToolResult};

/// How often the child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time allowed for draining pipes after an exit right at the deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Number of stderr lines quoted in a failure message.
const ERROR_TAIL_LINES: usize = 5;

/// Captured output of a finished tool.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Run `cmd` to completion, killing it if it exceeds `timeout`.
///
/// A non-zero exit is returned as `ToolError::NonZeroExit` carrying the
/// last few stderr lines.
pub fn run_tool(tool: &str, cmd: &mut Command, timeout: Duration) -> ToolResult<ToolOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!("Running {}: {:?}", tool, cmd);

    let deadline = Instant::now() + timeout;
    let mut child = cmd.spawn().map_err(|e| ToolError::spawn(tool, e))?;
    let stdout = child.stdout.take().map(Drain::start);
    let stderr = child.stderr.take().map(Drain::start);

    let status = wait_with_deadline(tool, &mut child, deadline, timeout)?;

    let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
    let output = ToolOutput {
        stdout: collect(tool, stdout, drain_deadline),
        stderr: collect(tool, stderr, drain_deadline),
        exit_code: status.code(),
    };

    if !status.success() {
        return Err(ToolError::non_zero_exit(
            tool,
            status.code(),
            tail_lines(&output.stderr, ERROR_TAIL_LINES),
        ));
    }

    Ok(output)
}

/// Check whether `program` can be started at all.
pub fn is_runnable(program: &str, probe_arg: &str, timeout: Duration) -> bool {
    let mut cmd = Command::new(program);
    cmd.arg(probe_arg);
    match run_tool(program, &mut cmd, timeout) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{} not runnable: {}", program, e);
            false
        }
    }
}

fn wait_with_deadline(
    tool: &str,
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> ToolResult<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!("{} exceeded {}s, killing", tool, timeout.as_secs());
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::timeout(tool, timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(ToolError::io(format!("waiting for {}", tool), e));
            }
        }
    }
}

/// A pipe being read on a helper thread into a shared buffer.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl Drain {
    fn start<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buffer, handle }
    }
}

/// Output read so far, waiting for end of stream until `deadline`.
///
/// Past the deadline the reader thread is left behind; it ends when the
/// last holder of the pipe closes it.
fn collect(tool: &str, drain: Option<Drain>, deadline: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };
    while !drain.handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    if drain.handle.is_finished() {
        let _ = drain.handle.join();
    } else {
        tracing::debug!("{} output still open after exit; keeping what was read", tool);
    }
    let bytes = drain.buffer.lock().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
