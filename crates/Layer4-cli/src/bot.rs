//! Poll loop - discovery, authorization filter, dispatch, shutdown

use anyhow::Result;
use nanobot_channel::{TelegramClient, TelegramHtmlRenderer, Update, LONG_POLL_SECS};
use nanobot_foundation::strings::short_id;
use nanobot_foundation::{BotConfig, ChatId, HistoryLog, Messenger, SessionStore};
use nanobot_router::{Dispatcher, Router};
use nanobot_task::{SessionState, ShellExecutor, StreamExecutor};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Wait after a failed `getUpdates`
const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// How long in-flight dispatches get to finish on Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

pub async fn run(config: BotConfig) -> Result<()> {
    let client = Arc::new(TelegramClient::new(&config.telegram, &config.limits)?);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let Some(allowed) = config.telegram.chat_id else {
        discover(&client, &mut shutdown).await;
        return Ok(());
    };

    let state = Arc::new(SessionState::load(
        SessionStore::new(config.memory_store()),
        config.default_work_dir.clone(),
    ));
    info!(
        "Bot started. Work dir: {}, Session: {}",
        state.work_dir().display(),
        state
            .session_id()
            .map(|id| short_id(&id, 12))
            .unwrap_or_else(|| "None".to_string())
    );

    let messenger: Arc<dyn Messenger> = client.clone();
    let stream = StreamExecutor::new(
        Arc::clone(&state),
        Arc::clone(&messenger),
        Arc::new(TelegramHtmlRenderer::new()),
        config.claude.clone(),
        config.limits.clone(),
    )
    .with_history(HistoryLog::in_dir(&config.memory_dir));
    let shell = ShellExecutor::new(Arc::clone(&state), Arc::clone(&messenger), config.limits.clone());
    let router = Arc::new(Router::new(state, stream, shell));
    let mut dispatcher = Dispatcher::new(router, messenger);

    let mut offset = None;
    loop {
        let polled = tokio::select! {
            _ = &mut shutdown => break,
            polled = client.get_updates(offset, LONG_POLL_SECS) => polled,
        };
        let updates = match polled {
            Ok(updates) => updates,
            Err(e) => {
                if e.is_transient() {
                    warn!("getUpdates error: {}", e);
                } else {
                    error!("getUpdates error: {}", e);
                }
                if !backoff(&mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            if let Some((chat, text)) = authorized(&update, allowed) {
                info!("[{}] {:?}", chat, text);
                dispatcher.dispatch(chat, text);
            }
        }
    }

    info!("Shutting down");
    dispatcher.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

/// Log the chat id of the first incoming message, then stop
async fn discover<S>(client: &TelegramClient, shutdown: &mut std::pin::Pin<&mut S>)
where
    S: Future,
{
    info!("TELEGRAM_CHAT_ID not set, running in discovery mode.");
    info!("Send any message to your bot and your chat ID will be printed here.");

    let mut offset = None;
    loop {
        let polled = tokio::select! {
            _ = shutdown.as_mut() => return,
            polled = client.get_updates(offset, LONG_POLL_SECS) => polled,
        };
        match polled {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(chat_id) = update.chat_id() {
                        info!("Your chat ID: {}", chat_id);
                        info!("Set it with: export TELEGRAM_CHAT_ID={}", chat_id);
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("getUpdates error: {}", e);
                if !backoff(shutdown).await {
                    return;
                }
            }
        }
    }
}

/// Sleep out the back-off; false if shutdown arrived first
async fn backoff<S>(shutdown: &mut std::pin::Pin<&mut S>) -> bool
where
    S: Future,
{
    tokio::select! {
        _ = shutdown.as_mut() => false,
        _ = tokio::time::sleep(POLL_BACKOFF) => true,
    }
}

/// Text from the authorized chat; other chats are logged and dropped
fn authorized(update: &Update, allowed: i64) -> Option<(ChatId, String)> {
    let chat_id = update.chat_id()?;
    if chat_id != allowed {
        warn!("Ignored message from unauthorized chat_id={}", chat_id);
        return None;
    }
    let text = update.text();
    if text.is_empty() {
        return None;
    }
    Some((ChatId(chat_id), text.to_string()))
}
