//! Per-user conversation state.

use crate::history::{HistoryBuffer, Turn};
use charter_core::{AppError, AppResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// One user's conversation: its history and a reset epoch.
///
/// A turn snapshots the epoch when it starts and commits its exchange only
/// if no reset happened in between. Sessions are never shared between users.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    history: Mutex<HistoryBuffer>,
    epoch: AtomicU64,
}

impl Session {
    pub fn new(history: HistoryBuffer) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Mutex::new(history),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Snapshot of the current turns, oldest first.
    pub fn history(&self) -> AppResult<Vec<Turn>> {
        Ok(self.lock()?.load())
    }

    /// Clear the history. Turns still in flight will be discarded.
    pub fn reset(&self) -> AppResult<()> {
        let mut history = self.lock()?;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        history.reset();
        tracing::info!(session = %self.id, "Session reset");
        Ok(())
    }

    /// Append an exchange started at `epoch`; `Cancelled` if the session was
    /// reset since.
    pub(crate) fn commit(&self, epoch: u64, human: &str, assistant: &str) -> AppResult<()> {
        let mut history = self.lock()?;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!(session = %self.id, "Discarding answer from before reset");
            return Err(AppError::Cancelled);
        }
        history.append(human, assistant);
        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HistoryBuffer>> {
        self.history
            .lock()
            .map_err(|_| AppError::Other("Session history lock poisoned".to_string()))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(HistoryBuffer::default())
    }
}
