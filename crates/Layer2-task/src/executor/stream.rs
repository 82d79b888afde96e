//! Streaming executor - runs the `claude` CLI and relays its stream
//!
//! Three activities share one invocation:
//! - the stdout loop, decoding one JSON record per line
//! - the placeholder timer (deferred "⏳ Running..." message)
//! - the stderr drain, kept for the failure notice
//!
//! Every stdout read is bounded by the wall-clock deadline, so a process that
//! stops writing is still caught. The slot guard is dropped before the
//! terminal message goes out, on every path.

use super::process::{self, LossyLines, PipeCapture, DRAIN_GRACE};
use crate::event::{parse_line, ContentBlock, StreamEvent};
use crate::notify::format_tool_notification;
use crate::outbox::{Outbox, Placeholder};
use crate::state::{SessionState, TaskContext};
use crate::task::{Execution, StartError, TaskKind, TaskOutcome};
use nanobot_foundation::strings::{char_len, head_chars, short_id};
use nanobot_foundation::{
    describe_duration, ChatId, ClaudeSettings, HistoryLog, HistoryRecord, Markup, MarkupRenderer,
    Messenger, TaskLimits,
};
use std::sync::Arc;
use tokio::process::{Child, ChildStdout};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};

pub const PLACEHOLDER_TEXT: &str = "⏳ Running...";

/// Why the stdout loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    Result,
    Eof,
    TimedOut,
    ReadError,
}

/// What the stdout loop collected
struct StreamRun {
    end: LoopEnd,
    /// Concatenated text blocks
    accumulated: String,
    /// Text chosen from the `result` record, if one arrived
    result: Option<String>,
}

pub struct StreamExecutor {
    state: Arc<SessionState>,
    messenger: Arc<dyn Messenger>,
    renderer: Arc<dyn MarkupRenderer>,
    claude: ClaudeSettings,
    limits: TaskLimits,
    history: Option<HistoryLog>,
}

impl StreamExecutor {
    pub fn new(
        state: Arc<SessionState>,
        messenger: Arc<dyn Messenger>,
        renderer: Arc<dyn MarkupRenderer>,
        claude: ClaudeSettings,
        limits: TaskLimits,
    ) -> Self {
        Self {
            state,
            messenger,
            renderer,
            claude,
            limits,
            history: None,
        }
    }

    /// Record every completed run in `history`
    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    /// CLI arguments for one invocation
    pub fn build_args(&self, prompt: &str, session_id: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--allowedTools".to_string(),
            self.claude.allowed_tools.join(","),
        ];
        if let Some(session_id) = session_id {
            args.push("--resume".to_string());
            args.push(session_id.to_string());
        }
        args
    }

    /// Run `prompt` to completion, delivering progress and the terminal
    /// message to `chat`.
    pub async fn run(&self, chat: ChatId, prompt: &str) -> Execution {
        let program = self.claude.program.as_str();
        let started = self.state.try_start(TaskKind::Stream, |ctx| {
            let mut cmd = process::piped_command(program, &ctx.work_dir);
            cmd.args(self.build_args(prompt, ctx.session_id.as_deref()));
            let child = process::spawn(cmd, program, &ctx.work_dir)?;
            Ok((child, ctx.clone()))
        });
        let (slot, (mut child, ctx)) = match started {
            Ok(started) => started,
            Err(e) => {
                warn!("Task not started: {}", e);
                return Execution::Rejected(e);
            }
        };
        let deadline = Instant::now() + self.limits.stream_timeout();

        match ctx.session_id.as_deref() {
            Some(sid) => info!("Resuming session {}", short_id(sid, 12)),
            None => info!("Starting new Claude session"),
        }

        let outbox = Outbox::new(Arc::clone(&self.messenger), chat);
        let placeholder = Placeholder::new(outbox.clone(), self.limits.edit_interval());
        let timer = AbortOnDropHandle::new(
            placeholder.arm(self.limits.placeholder_delay(), PLACEHOLDER_TEXT),
        );
        let stderr = PipeCapture::spawn(child.stderr.take());

        let Some(stdout) = child.stdout.take() else {
            placeholder.disarm().await;
            process::kill_and_reap(&mut child).await;
            return Execution::Rejected(StartError::Spawn("stdout was not captured".into()));
        };
        let mut lines = LossyLines::new(stdout);

        let run = self
            .consume(
                &mut lines,
                &mut child,
                slot.cancel_token(),
                deadline,
                &placeholder,
                &outbox,
                prompt,
                &ctx,
            )
            .await;

        // No placeholder may appear after this point
        placeholder.disarm().await;
        timer.abort();

        let status = match run.end {
            LoopEnd::TimedOut => process::kill_and_reap(&mut child).await,
            LoopEnd::Result => {
                let rest = tokio::time::timeout(DRAIN_GRACE, async {
                    while let Ok(Some(_)) = lines.next_line().await {}
                })
                .await;
                if rest.is_err() {
                    debug!("stdout still open after result, killing");
                }
                process::wait_or_kill(&mut child, DRAIN_GRACE).await
            }
            LoopEnd::Eof | LoopEnd::ReadError => process::wait_or_kill(&mut child, DRAIN_GRACE).await,
        };
        drop(lines);
        let exit_code = process::exit_code(status);
        let stderr = stderr.finish(DRAIN_GRACE).await;

        let elapsed = slot.elapsed();
        let task_id = slot.id();
        slot.release();

        let outcome = match (run.end, run.result) {
            (LoopEnd::TimedOut, _) => TaskOutcome::TimedOut {
                after: self.limits.stream_timeout(),
            },
            (_, Some(text)) => TaskOutcome::Completed { text },
            (_, None) => {
                let diagnostic = stderr.trim();
                if exit_code != 0 && !diagnostic.is_empty() {
                    TaskOutcome::Failed {
                        exit_code,
                        diagnostic: head_chars(diagnostic, self.limits.diagnostic_limit).to_string(),
                    }
                } else {
                    debug!("No result; {} chars streamed", char_len(&run.accumulated));
                    TaskOutcome::Interrupted
                }
            }
        };
        info!(
            "Task {} finished: {} after {:.1}s",
            task_id,
            outcome.display_name(),
            elapsed.as_secs_f64()
        );

        self.deliver(&outcome, &placeholder, &outbox).await;
        Execution::Finished(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn consume(
        &self,
        lines: &mut LossyLines<ChildStdout>,
        child: &mut Child,
        cancel: &CancellationToken,
        deadline: Instant,
        placeholder: &Placeholder,
        outbox: &Outbox,
        prompt: &str,
        ctx: &TaskContext,
    ) -> StreamRun {
        let mut accumulated = String::new();
        let mut terminating = false;

        let end = loop {
            let read = tokio::select! {
                _ = cancel.cancelled(), if !terminating => None,
                read = tokio::time::timeout_at(deadline, lines.next_line()) => Some(read),
            };
            let Some(read) = read else {
                info!("Terminating claude process");
                process::terminate(child);
                terminating = true;
                continue;
            };

            let line = match read {
                Err(_) => {
                    warn!("Claude timed out after {}", describe_duration(self.limits.stream_timeout()));
                    break LoopEnd::TimedOut;
                }
                Ok(Err(e)) => {
                    warn!("Failed to read claude output: {}", e);
                    break LoopEnd::ReadError;
                }
                Ok(Ok(None)) => break LoopEnd::Eof,
                Ok(Ok(Some(line))) => line,
            };

            match parse_line(&line) {
                Some(StreamEvent::Assistant { message }) => {
                    for block in message.content {
                        match block {
                            ContentBlock::Text { text } => {
                                for ln in text.lines() {
                                    info!("  {}", ln);
                                }
                                accumulated.push_str(&text);
                                placeholder.progress(&accumulated).await;
                            }
                            ContentBlock::ToolUse { name, input } => {
                                let notice = format_tool_notification(&name, &input);
                                info!("  {}", notice);
                                outbox.send(&notice).await;
                            }
                            ContentBlock::Other => {}
                        }
                    }
                }
                Some(StreamEvent::Result {
                    result,
                    session_id,
                    duration_ms,
                }) => {
                    let text = select_result_text(result, &accumulated);
                    if let Some(sid) = session_id.filter(|sid| !sid.is_empty()) {
                        if self.state.update_session_id(&sid) {
                            info!("Session updated: {}", short_id(&sid, 12));
                        }
                    }
                    let duration_s = duration_ms.unwrap_or(0.0) / 1000.0;
                    info!("Claude done in {:.1}s ({} chars)", duration_s, char_len(&text));
                    self.record_history(prompt, &text, ctx, duration_s);

                    return StreamRun {
                        end: LoopEnd::Result,
                        accumulated,
                        result: Some(text),
                    };
                }
                Some(StreamEvent::Other) | None => {}
            }
        };

        StreamRun {
            end,
            accumulated,
            result: None,
        }
    }

    fn record_history(&self, prompt: &str, result: &str, ctx: &TaskContext, duration_s: f64) {
        let Some(history) = self.history.as_ref() else {
            return;
        };
        let record = HistoryRecord::new(
            prompt,
            result,
            self.state.session_id(),
            ctx.work_dir.to_string_lossy(),
            duration_s,
        );
        if let Err(e) = history.append(&record) {
            warn!("log_history error: {}", e);
        }
    }

    async fn deliver(&self, outcome: &TaskOutcome, placeholder: &Placeholder, outbox: &Outbox) {
        match outcome {
            TaskOutcome::TimedOut { after } => {
                let text = format!("⏱️ Timed out after {}.", describe_duration(*after));
                placeholder.finish(&text, Markup::Plain).await;
            }
            TaskOutcome::Failed {
                exit_code,
                diagnostic,
            } => {
                error!("claude stderr: {}", diagnostic);
                let text = format!("❌ Error (exit {}):\n{}", exit_code, diagnostic);
                placeholder.finish(&text, Markup::Plain).await;
            }
            TaskOutcome::Interrupted => {
                placeholder.finish("⚠️ Task interrupted.", Markup::Plain).await;
            }
            TaskOutcome::Completed { text } => {
                if char_len(text) > self.limits.file_threshold {
                    placeholder
                        .finish("✅ Done (full response attached)", Markup::Plain)
                        .await;
                    outbox.send_file(text, "result.txt").await;
                } else {
                    let html = self.renderer.render(text);
                    placeholder.finish(&html, Markup::Html).await;
                }
            }
        }
    }
}

/// Inline `result` text wins; otherwise whatever was streamed
fn select_result_text(inline: Option<String>, accumulated: &str) -> String {
    match inline {
        Some(text) if !text.is_empty() => text,
        _ if !accumulated.is_empty() => accumulated.to_string(),
        _ => "(no output)".to_string(),
    }
}
