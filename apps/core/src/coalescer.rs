//! Single-slot "latest wins" hand-off between UI edits and the search worker.
//!
//! `submit` never waits on the worker: it swaps the pending query under a
//! short-lived lock and wakes whoever is parked in `await_next` or `pending`.
//! A query that is overwritten before the worker takes it is never processed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

use crate::model::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query slot is closed")]
pub struct SlotClosed;

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<Query>,
    next_seq: u64,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct QueryCoalescer {
    state: Mutex<SlotState>,
    wake: Notify,
}

impl QueryCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `text` in the slot, replacing anything not yet taken.
    pub fn submit(&self, text: impl Into<String>) -> Result<Query, SlotClosed> {
        let mut state = self.lock();
        if state.closed {
            return Err(SlotClosed);
        }

        state.next_seq += 1;
        let query = Query::new(text, state.next_seq);
        if let Some(replaced) = state.pending.replace(query.clone()) {
            debug!(
                replaced_seq = replaced.seq(),
                seq = query.seq(),
                "pending query superseded before processing"
            );
        }
        drop(state);

        self.wake.notify_waiters();
        Ok(query)
    }

    /// Waits for a query and takes it out of the slot. Returns `None` once the
    /// slot is closed.
    pub async fn await_next(&self) -> Option<Query> {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(query) = state.pending.take() {
                    return Some(query);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Resolves as soon as a query is waiting or the slot is closed, without
    /// taking anything.
    pub async fn pending(&self) {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.lock();
                if state.pending.is_some() || state.closed {
                    return;
                }
            }

            notified.await;
        }
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Drops any waiting query and rejects further submissions.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.pending = None;
        drop(state);
        self.wake.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
