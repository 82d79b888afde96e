//! Shell executor - `sh -c <command>` with a danger gate and a short timeout

use super::process::{self, PipeCapture};
use crate::outbox::Outbox;
use crate::state::SessionState;
use crate::task::{Execution, TaskKind, TaskOutcome};
use nanobot_foundation::{danger_reason, describe_duration, ChatId, Messenger, TaskLimits};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const SHELL: &str = "sh";
const LOGGED_LINES: usize = 10;

pub struct ShellExecutor {
    state: Arc<SessionState>,
    messenger: Arc<dyn Messenger>,
    limits: TaskLimits,
}

impl ShellExecutor {
    pub fn new(state: Arc<SessionState>, messenger: Arc<dyn Messenger>, limits: TaskLimits) -> Self {
        Self {
            state,
            messenger,
            limits,
        }
    }

    /// Run `command` in the session's work dir.
    ///
    /// Unless `confirmed`, a dangerous command is parked as the pending
    /// confirmation and nothing runs.
    pub async fn run(&self, chat: ChatId, command: &str, confirmed: bool) -> Execution {
        if !confirmed {
            if let Some(reason) = danger_reason(command) {
                if let Some(previous) = self.state.set_pending(command) {
                    debug!("Replaced pending command: {}", previous);
                }
                warn!("Held for confirmation ({}): {}", reason, command);
                return Execution::NeedsConfirmation {
                    command: command.to_string(),
                    reason,
                };
            }
        }

        let started = self.state.try_start(TaskKind::Shell, |ctx| {
            let mut cmd = process::piped_command(SHELL, &ctx.work_dir);
            cmd.arg("-c").arg(command);
            process::spawn(cmd, SHELL, &ctx.work_dir)
        });
        let (slot, mut child) = match started {
            Ok(started) => started,
            Err(e) => {
                warn!("Shell command not started: {}", e);
                return Execution::Rejected(e);
            }
        };
        let timeout = self.limits.shell_timeout();
        let deadline = Instant::now() + timeout;
        let outbox = Outbox::new(Arc::clone(&self.messenger), chat);

        let stdout = PipeCapture::spawn(child.stdout.take());
        let stderr = PipeCapture::spawn(child.stderr.take());

        let cancel = slot.cancel_token().clone();
        let mut terminating = false;
        let waited = loop {
            tokio::select! {
                _ = cancel.cancelled(), if !terminating => {
                    info!("Terminating shell command");
                    process::terminate(&mut child);
                    terminating = true;
                }
                waited = tokio::time::timeout_at(deadline, child.wait()) => break waited,
            }
        };

        let status = match waited {
            Err(_) => {
                warn!("Shell command timed out after {}", describe_duration(timeout));
                process::kill_and_reap(&mut child).await;
                stdout.abort();
                stderr.abort();
                slot.release();

                let outcome = TaskOutcome::TimedOut { after: timeout };
                outbox
                    .send(&format!("Timed out after {}.", describe_duration(timeout)))
                    .await;
                return Execution::Finished(outcome);
            }
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!("Failed to wait for shell command: {}", e);
                None
            }
        };

        // Background jobs may hold the pipes past the shell's exit
        let (stdout, stderr) = tokio::join!(
            stdout.finish_by(deadline, &cancel),
            stderr.finish_by(deadline, &cancel)
        );
        let exit_code = process::exit_code(status);
        slot.release();

        let output = combine_output(&stdout, &stderr);
        log_tail(&output);

        outbox
            .send_preformatted(&output, self.limits.file_threshold)
            .await;

        if exit_code == 0 {
            Execution::Finished(TaskOutcome::Completed { text: output })
        } else {
            debug!("Shell command exited with {}", exit_code);
            Execution::Finished(TaskOutcome::Failed {
                exit_code,
                diagnostic: output,
            })
        }
    }
}

/// Trimmed stdout, then trimmed stderr on its own line
fn combine_output(stdout: &str, stderr: &str) -> String {
    let mut output = stdout.trim().to_string();
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        output = format!("{}\n{}", output, stderr).trim().to_string();
    }
    if output.is_empty() {
        output = "(no output)".to_string();
    }
    output
}

fn log_tail(output: &str) {
    let lines: Vec<&str> = output.lines().collect();
    let skip = lines.len().saturating_sub(LOGGED_LINES);
    if skip > 0 {
        info!("  ... ({} lines omitted)", skip);
    }
    for line in &lines[skip..] {
        info!("  {}", line);
    }
}
