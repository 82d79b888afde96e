//! Shared session state
//!
//! The one mutable record shared by every dispatch: work directory, resumable
//! session id, the single task slot and the pending dangerous command. Every
//! field lives behind one lock; callers only ever see copies.
//!
//! The slot is claimed together with the spawn inside the lock, so two
//! concurrent starts can never both observe an empty slot.

use crate::task::{StartError, TaskId, TaskKind};
use nanobot_foundation::strings::short_id;
use nanobot_foundation::{SessionRecord, SessionStore};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Values an executor needs to spawn, copied out under the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub work_dir: PathBuf,
    pub session_id: Option<String>,
}

/// Running task, as reported by `/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub elapsed: Duration,
}

/// Point-in-time copy of the state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub work_dir: PathBuf,
    pub session_id: Option<String>,
    pub running: Option<RunningTask>,
    pub pending_confirmation: Option<String>,
}

struct ActiveTask {
    id: TaskId,
    kind: TaskKind,
    /// Valid exactly as long as the task occupies the slot
    started_at: Instant,
    cancel: CancellationToken,
}

struct Inner {
    work_dir: PathBuf,
    session_id: Option<String>,
    active: Option<ActiveTask>,
    pending_confirmation: Option<String>,
}

/// Process-wide session state
pub struct SessionState {
    inner: Mutex<Inner>,
    store: Option<SessionStore>,
    /// Serializes snapshot+write so the file always holds the latest pair
    persist_lock: Mutex<()>,
}

impl SessionState {
    /// In-memory state without persistence
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                work_dir: work_dir.into(),
                session_id: None,
                active: None,
                pending_confirmation: None,
            }),
            store: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Attach a store; subsequent changes are saved to it
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Load the persisted record, falling back to `default_work_dir`.
    ///
    /// A missing or unreadable file is not an error.
    pub fn load(store: SessionStore, default_work_dir: impl Into<PathBuf>) -> Self {
        let state = Self::new(default_work_dir).with_store(store);
        let Some(store) = state.store.as_ref() else {
            return state;
        };

        match store.load() {
            Ok(Some(record)) => {
                let mut inner = state.inner.lock();
                inner.session_id = record.session_id.filter(|id| !id.is_empty());
                if let Some(work_dir) = record.work_dir {
                    inner.work_dir = PathBuf::from(work_dir);
                }
                info!(
                    "Loaded state: work_dir={}, session={}",
                    inner.work_dir.display(),
                    inner
                        .session_id
                        .as_deref()
                        .map(|id| short_id(id, 12))
                        .unwrap_or_else(|| "None".to_string())
                );
            }
            Ok(None) => debug!("No saved state at {}", store.path().display()),
            Err(e) => warn!("Could not load state: {}", e),
        }
        state
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    pub fn work_dir(&self) -> PathBuf {
        self.inner.lock().work_dir.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id.clone()
    }

    pub fn context(&self) -> TaskContext {
        let inner = self.inner.lock();
        TaskContext {
            work_dir: inner.work_dir.clone(),
            session_id: inner.session_id.clone(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        StateSnapshot {
            work_dir: inner.work_dir.clone(),
            session_id: inner.session_id.clone(),
            running: inner.active.as_ref().map(|task| RunningTask {
                id: task.id,
                kind: task.kind,
                elapsed: task.started_at.elapsed(),
            }),
            pending_confirmation: inner.pending_confirmation.clone(),
        }
    }

    // ========================================================================
    // Task slot
    // ========================================================================

    /// Claim the slot and spawn atomically.
    ///
    /// `spawn` runs while the lock is held; the slot is only occupied if it
    /// succeeds. On contention nothing is spawned.
    pub fn try_start<T, F>(&self, kind: TaskKind, spawn: F) -> Result<(SlotGuard<'_>, T), StartError>
    where
        F: FnOnce(&TaskContext) -> Result<T, StartError>,
    {
        let mut inner = self.inner.lock();
        if inner.active.is_some() {
            return Err(StartError::Busy);
        }

        let context = TaskContext {
            work_dir: inner.work_dir.clone(),
            session_id: inner.session_id.clone(),
        };
        let spawned = spawn(&context)?;

        let id = TaskId::new();
        let cancel = CancellationToken::new();
        let started_at = Instant::now();
        inner.active = Some(ActiveTask {
            id,
            kind,
            started_at,
            cancel: cancel.clone(),
        });
        debug!("Task {} ({}) claimed the slot", id, kind);

        Ok((
            SlotGuard {
                state: self,
                id,
                kind,
                started_at,
                cancel,
                released: false,
            },
            spawned,
        ))
    }

    /// Ask the running task to stop. Does not wait.
    pub fn cancel_active(&self) -> bool {
        let token = {
            let inner = self.inner.lock();
            inner.active.as_ref().map(|task| (task.id, task.cancel.clone()))
        };
        match token {
            Some((id, token)) => {
                info!("Cancellation requested for task {}", id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn release(&self, id: TaskId) -> bool {
        let mut inner = self.inner.lock();
        match inner.active.as_ref() {
            Some(task) if task.id == id => {
                inner.active = None;
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Session / work dir transitions (persisted)
    // ========================================================================

    /// Store a newly reported session id. Returns true if it changed.
    pub fn update_session_id(&self, session_id: &str) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.session_id.as_deref() == Some(session_id) {
                return false;
            }
            inner.session_id = Some(session_id.to_string());
        }
        self.persist();
        true
    }

    pub fn clear_session(&self) {
        self.inner.lock().session_id = None;
        self.persist();
    }

    /// Switch directories; the old conversation does not carry over
    pub fn change_work_dir(&self, work_dir: &Path) {
        {
            let mut inner = self.inner.lock();
            inner.work_dir = work_dir.to_path_buf();
            inner.session_id = None;
        }
        self.persist();
    }

    // ========================================================================
    // Pending confirmation
    // ========================================================================

    /// Park a dangerous command; returns the one it replaced
    pub fn set_pending(&self, command: impl Into<String>) -> Option<String> {
        self.inner.lock().pending_confirmation.replace(command.into())
    }

    pub fn take_pending(&self) -> Option<String> {
        self.inner.lock().pending_confirmation.take()
    }

    pub fn pending(&self) -> Option<String> {
        self.inner.lock().pending_confirmation.clone()
    }

    fn persist(&self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let _write = self.persist_lock.lock();
        let record = {
            let inner = self.inner.lock();
            SessionRecord::new(
                inner.session_id.clone(),
                inner.work_dir.to_string_lossy().into_owned(),
            )
        };
        if let Err(e) = store.save(&record) {
            warn!("Could not save state: {}", e);
        }
    }
}

/// Occupancy of the task slot.
///
/// Dropping the guard frees the slot, so it is released on every exit path of
/// the executor that holds it, panics included.
pub struct SlotGuard<'a> {
    state: &'a SessionState,
    id: TaskId,
    kind: TaskKind,
    started_at: Instant,
    cancel: CancellationToken,
    released: bool,
}

impl SlotGuard<'_> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Fires when `/cancel` targets this task
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Free the slot now
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.state.release(self.id) {
            debug!("Task {} ({}) released the slot", self.id, self.kind);
        } else {
            warn!("Task {} ({}) did not own the slot at release", self.id, self.kind);
        }
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanobot_foundation::JsonStore;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn ok_spawn(_: &TaskContext) -> Result<(), StartError> {
        Ok(())
    }

    #[test]
    fn test_single_flight() {
        let state = SessionState::new("/tmp");
        let (guard, _) = state.try_start(TaskKind::Stream, ok_spawn).unwrap();
        assert!(state.is_busy());

        let mut spawned = false;
        let second = state.try_start(TaskKind::Shell, |_| {
            spawned = true;
            Ok(())
        });
        assert!(matches!(second, Err(StartError::Busy)));
        assert!(!spawned, "contention must not spawn");

        drop(guard);
        assert!(!state.is_busy());
        assert!(state.try_start(TaskKind::Shell, ok_spawn).is_ok());
    }

    #[test]
    fn test_spawn_failure_never_claims() {
        let state = SessionState::new("/tmp");
        let result = state.try_start(TaskKind::Stream, |_| -> Result<(), StartError> {
            Err(StartError::NotFound {
                program: "claude".into(),
            })
        });
        assert!(matches!(result, Err(StartError::NotFound { .. })));
        assert!(!state.is_busy());
    }

    #[test]
    fn test_spawn_sees_context() {
        let state = SessionState::new("/srv/project");
        state.update_session_id("sess-1");
        let (_guard, ctx) = state
            .try_start(TaskKind::Stream, |ctx| Ok(ctx.clone()))
            .unwrap();
        assert_eq!(ctx.work_dir, PathBuf::from("/srv/project"));
        assert_eq!(ctx.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn test_explicit_release_then_drop_releases_once() {
        let state = SessionState::new("/tmp");
        let (guard, _) = state.try_start(TaskKind::Shell, ok_spawn).unwrap();
        guard.release();
        assert!(!state.is_busy());

        // A stale id must not free someone else's slot
        let (second, _) = state.try_start(TaskKind::Stream, ok_spawn).unwrap();
        assert!(!state.release(TaskId::new()));
        assert!(state.is_busy());
        drop(second);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_concurrent_claims() {
        let state = Arc::new(SessionState::new("/tmp"));
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    match state.try_start(TaskKind::Shell, ok_spawn) {
                        Ok((guard, _)) => {
                            std::thread::sleep(Duration::from_millis(50));
                            drop(guard);
                            true
                        }
                        Err(StartError::Busy) => false,
                        Err(e) => panic!("unexpected {e:?}"),
                    }
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert!(winners >= 1);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_at_most_one_active() {
        let state = Arc::new(SessionState::new("/tmp"));
        let active = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let max_seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = Arc::clone(&state);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                std::thread::spawn(move || {
                    use std::sync::atomic::Ordering;
                    for _ in 0..50 {
                        if let Ok((guard, _)) = state.try_start(TaskKind::Stream, ok_spawn) {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            active.fetch_sub(1, Ordering::SeqCst);
                            drop(guard);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_active() {
        let state = SessionState::new("/tmp");
        assert!(!state.cancel_active());

        let (guard, _) = state.try_start(TaskKind::Stream, ok_spawn).unwrap();
        assert!(!guard.cancel_token().is_cancelled());
        assert!(state.cancel_active());
        assert!(guard.cancel_token().is_cancelled());
        // cancelling does not free the slot; the executor does
        assert!(state.is_busy());
    }

    #[test]
    fn test_pending_last_write_wins() {
        let state = SessionState::new("/tmp");
        assert_eq!(state.set_pending("rm a"), None);
        assert_eq!(state.set_pending("rm b"), Some("rm a".to_string()));
        assert_eq!(state.take_pending().as_deref(), Some("rm b"));
        assert_eq!(state.take_pending(), None);
    }

    #[test]
    fn test_snapshot_running() {
        let state = SessionState::new("/tmp");
        assert!(state.snapshot().running.is_none());
        let (guard, _) = state.try_start(TaskKind::Shell, ok_spawn).unwrap();
        let running = state.snapshot().running.unwrap();
        assert_eq!(running.kind, TaskKind::Shell);
        assert_eq!(running.id, guard.id());
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(JsonStore::new(dir.path()));
        let work = tempdir().unwrap();

        let state = SessionState::load(store.clone(), "/default");
        assert_eq!(state.work_dir(), PathBuf::from("/default"));
        assert_eq!(state.session_id(), None);

        assert!(state.update_session_id("abc"));
        assert!(!state.update_session_id("abc"));
        assert_eq!(store.load().unwrap().unwrap().session_id.as_deref(), Some("abc"));

        state.change_work_dir(work.path());
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.session_id, None);
        assert_eq!(saved.work_dir, Some(work.path().to_string_lossy().into_owned()));

        let reloaded = SessionState::load(store, "/default");
        assert_eq!(reloaded.work_dir(), work.path());
    }

    #[test]
    fn test_corrupt_state_file_uses_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(nanobot_foundation::SESSION_FILE), "garbage").unwrap();
        let state = SessionState::load(SessionStore::new(JsonStore::new(dir.path())), "/default");
        assert_eq!(state.work_dir(), PathBuf::from("/default"));
        assert_eq!(state.session_id(), None);
    }
}
