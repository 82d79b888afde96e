//! Dispatcher - one task per inbound message
//!
//! The poll loop never waits on a command: each message is routed on its own
//! task, bounded by a semaphore, and tracked in a [`JoinSet`] so shutdown can
//! wait for in-flight work or abandon it.

use crate::router::Router;
use nanobot_foundation::{ChatId, Markup, Messenger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default bound on concurrently routed messages
pub const MAX_IN_FLIGHT: usize = 16;

pub struct Dispatcher {
    router: Arc<Router>,
    messenger: Arc<dyn Messenger>,
    permits: Arc<Semaphore>,
    in_flight: JoinSet<()>,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>, messenger: Arc<dyn Messenger>) -> Self {
        Self::with_limit(router, messenger, MAX_IN_FLIGHT)
    }

    pub fn with_limit(router: Arc<Router>, messenger: Arc<dyn Messenger>, limit: usize) -> Self {
        Self {
            router,
            messenger,
            permits: Arc::new(Semaphore::new(limit.max(1))),
            in_flight: JoinSet::new(),
        }
    }

    /// Route `text` in the background; a direct reply is sent as plain text
    pub fn dispatch(&mut self, chat: ChatId, text: impl Into<String>) {
        self.reap();

        let text = text.into();
        let router = Arc::clone(&self.router);
        let messenger = Arc::clone(&self.messenger);
        let permits = Arc::clone(&self.permits);

        self.in_flight.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Some(reply) = router.handle(chat, &text).await {
                if let Err(e) = messenger.send(chat, &reply, Markup::Plain).await {
                    error!("Failed to send reply: {}", e);
                }
            }
        });
    }

    /// Messages still being routed
    pub fn in_flight(&mut self) -> usize {
        self.reap();
        self.in_flight.len()
    }

    /// Cancel the running task, give in-flight dispatches `grace` to finish,
    /// then abort whatever is left.
    pub async fn shutdown(mut self, grace: Duration) {
        if self.router.state().cancel_active() {
            info!("Cancelled the running task");
        }
        self.permits.close();

        let in_flight = &mut self.in_flight;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = in_flight.join_next().await {
                log_join_error(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!("Aborting {} in-flight dispatches", self.in_flight.len());
            self.in_flight.shutdown().await;
        }
        debug!("Dispatcher stopped");
    }

    fn reap(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            log_join_error(joined);
        }
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!("Dispatch panicked: {}", e);
        }
    }
}
