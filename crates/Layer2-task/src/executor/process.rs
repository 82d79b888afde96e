//! Process supervision helpers shared by both executors
//!
//! - spawn with piped output, `kill_on_drop` and the session's work dir
//! - cooperative termination (SIGTERM) and forced kill
//! - pipe capture that keeps what was read even when the pipe never closes
//! - lossy line reading for the JSON stream

use crate::task::StartError;
use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::error::Elapsed;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long pipes and the child get after the main loop has decided to stop
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

/// Build a command with both output pipes captured
pub fn piped_command(program: &str, work_dir: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Spawn, mapping OS errors to the reply the user sees
pub fn spawn(mut cmd: Command, program: &str, work_dir: &Path) -> Result<Child, StartError> {
    if !work_dir.is_dir() {
        return Err(StartError::Spawn(format!(
            "work dir {} does not exist",
            work_dir.display()
        )));
    }
    cmd.spawn().map_err(|e| spawn_error(program, e))
}

fn spawn_error(program: &str, err: io::Error) -> StartError {
    if err.kind() == io::ErrorKind::NotFound {
        StartError::NotFound {
            program: program.to_string(),
        }
    } else {
        StartError::Spawn(err.to_string())
    }
}

/// Ask the child to stop (SIGTERM on unix, kill elsewhere)
#[cfg(unix)]
pub fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!("SIGTERM to {} failed: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
pub fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Kill failed: {}", e);
    }
}

/// Force-kill and reap. Errors mean the child is already gone.
pub async fn kill_and_reap(child: &mut Child) -> Option<ExitStatus> {
    if let Err(e) = child.start_kill() {
        debug!("start_kill: {}", e);
    }
    match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!("Failed to reap child: {}", e);
            None
        }
    }
}

/// Wait for exit; escalate to a forced kill if the child lingers
pub async fn wait_or_kill(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            warn!("Failed to wait for child: {}", e);
            None
        }
        Err(_) => {
            debug!("Child still running after {:?}, killing", grace);
            kill_and_reap(child).await
        }
    }
}

/// `-1` when the process was killed by a signal
pub fn exit_code(status: Option<ExitStatus>) -> i32 {
    status.and_then(|s| s.code()).unwrap_or(-1)
}

// ============================================================================
// Pipe capture
// ============================================================================

/// A pipe drained into memory on a separate task.
///
/// Bytes land in a shared buffer as they arrive, so giving up on the reader
/// (a background job still holding the pipe open) keeps everything read so
/// far.
pub struct PipeCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl PipeCapture {
    pub fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let reader = tokio::spawn(async move {
            let Some(mut pipe) = pipe else {
                return;
            };
            let mut chunk = vec![0u8; READ_CHUNK];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!("Pipe read stopped: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buf, reader }
    }

    /// Wait up to `grace` for EOF, then return whatever was read
    pub async fn finish(self, grace: Duration) -> String {
        let Self { buf, mut reader } = self;
        let joined = tokio::time::timeout(grace, &mut reader).await;
        settle(buf, reader, joined)
    }

    /// Wait for EOF until `deadline`, cut short to [`DRAIN_GRACE`] once
    /// `cancel` fires, then return whatever was read
    pub async fn finish_by(self, deadline: Instant, cancel: &CancellationToken) -> String {
        let Self { buf, mut reader } = self;
        let joined = tokio::select! {
            biased;
            joined = tokio::time::timeout_at(deadline, &mut reader) => Some(joined),
            _ = cancel.cancelled() => None,
        };
        let joined = match joined {
            Some(joined) => joined,
            None => {
                let cut = deadline.min(Instant::now() + DRAIN_GRACE);
                tokio::time::timeout_at(cut, &mut reader).await
            }
        };
        settle(buf, reader, joined)
    }

    /// Stop reading without waiting
    pub fn abort(&self) {
        self.reader.abort();
    }
}

fn settle(
    buf: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
    joined: Result<Result<(), JoinError>, Elapsed>,
) -> String {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Pipe reader failed: {}", e),
        Err(_) => {
            reader.abort();
            debug!("Pipe still open, keeping {} bytes", buf.lock().len());
        }
    }
    let text = String::from_utf8_lossy(&buf.lock()).into_owned();
    text
}

// ============================================================================
// Line reader
// ============================================================================

/// Newline-delimited reader that never fails on bad encoding.
///
/// Invalid UTF-8 is replaced, so only a real I/O failure is an error.
/// Cancel safe: a partial line stays buffered and is completed by the next
/// call.
pub struct LossyLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LossyLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Next line without its terminator; `None` at EOF
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let mut line = self.buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        let text = String::from_utf8_lossy(line).into_owned();
        self.buf.clear();
        Ok(Some(text))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    #[tokio::test]
    async fn test_missing_program() {
        let cmd = piped_command("definitely-not-a-real-binary-xyz", Path::new("/"));
        let err = spawn(cmd, "definitely-not-a-real-binary-xyz", Path::new("/")).unwrap_err();
        assert_eq!(
            err,
            StartError::NotFound {
                program: "definitely-not-a-real-binary-xyz".into()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_work_dir() {
        let dir = Path::new("/no/such/dir/for/nanobot");
        let err = spawn(piped_command("sh", dir), "sh", dir).unwrap_err();
        assert!(matches!(err, StartError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_capture_and_exit_code() {
        let mut cmd = piped_command("sh", Path::new("/"));
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let mut child = spawn(cmd, "sh", Path::new("/")).unwrap();
        let out = PipeCapture::spawn(child.stdout.take());
        let err = PipeCapture::spawn(child.stderr.take());
        let status = child.wait().await.ok();
        assert_eq!(exit_code(status), 3);
        assert_eq!(out.finish(DRAIN_GRACE).await, "out\n");
        assert_eq!(err.finish(DRAIN_GRACE).await, "err\n");
    }

    #[tokio::test]
    async fn test_capture_keeps_output_when_pipe_stays_open() {
        let mut cmd = piped_command("sh", Path::new("/"));
        cmd.args(["-c", "echo early; sleep 5 &"]);
        let mut child = spawn(cmd, "sh", Path::new("/")).unwrap();
        let out = PipeCapture::spawn(child.stdout.take());
        child.wait().await.unwrap();

        let started = Instant::now();
        assert_eq!(out.finish(Duration::from_millis(300)).await, "early\n");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_terminate_stops_sleeper() {
        let mut cmd = piped_command("sleep", Path::new("/"));
        cmd.arg("30");
        let mut child = spawn(cmd, "sleep", Path::new("/")).unwrap();
        terminate(&mut child);
        let status = wait_or_kill(&mut child, Duration::from_secs(5)).await;
        assert_eq!(exit_code(status), -1);
    }

    #[tokio::test]
    async fn test_lossy_lines_replace_bad_bytes() {
        let input: &[u8] = b"\xff\xfe garbage\n{\"ok\":1}\r\nno newline";
        let mut lines = LossyLines::new(input);
        assert_eq!(
            lines.next_line().await.unwrap().as_deref(),
            Some("\u{fffd}\u{fffd} garbage")
        );
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("{\"ok\":1}"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("no newline"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")))
        }
    }

    #[tokio::test]
    async fn test_lossy_lines_surface_io_errors() {
        let mut lines = LossyLines::new(BrokenPipe);
        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
