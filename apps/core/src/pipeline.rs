//! Long-lived search worker: takes coalesced queries, fetches them one at a
//! time, projects the results and publishes state to the renderer.
//!
//! State machine: `Idle -> Loading -> {Idle, Error} -> Loading ...`, with
//! `Disposed` reachable from anywhere. Only the worker task mutates the
//! state; readers get `Arc` snapshots through a watch channel.
//!
//! A query that is superseded while its fetch is in flight has its
//! cancellation scope cancelled. Its outcome, whatever it turns out to be, is
//! dropped without notifying the renderer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coalescer::{QueryCoalescer, SlotClosed};
use crate::fetcher::{FetchError, Fetcher};
use crate::model::{PipelineState, Query};
use crate::page::{EmptyContent, PageProfile};
use crate::projector::project_all;

/// Receives every completed transition out of `Loading`.
///
/// Called on the worker task. `render` may dispose or drop its own pipeline.
pub trait ResultRenderer: Send + Sync {
    fn render(&self, state: &PipelineState);
}

impl<F> ResultRenderer for F
where
    F: Fn(&PipelineState) + Send + Sync,
{
    fn render(&self, state: &PipelineState) {
        self(state)
    }
}

tokio::task_local! {
    // Identity of the fence whose renderer is running on this task.
    static RENDERING: usize;
}

/// Orders renders against `dispose`: a render holds `render` for its whole
/// duration and checks `disposed` first.
#[derive(Default)]
struct RenderFence {
    disposed: AtomicBool,
    render: Mutex<()>,
}

impl RenderFence {
    fn id(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns `false` if it was already disposed.
    fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    /// Waits out a render in progress, unless the caller is that render.
    fn wait_for_render(self: &Arc<Self>) {
        let id = self.id();
        if RENDERING.try_with(|current| *current == id).unwrap_or(false) {
            return;
        }
        drop(self.render.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

pub struct SearchPipeline {
    profile: PageProfile,
    slot: Arc<QueryCoalescer>,
    root: CancellationToken,
    fence: Arc<RenderFence>,
    snapshots: watch::Receiver<Arc<PipelineState>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SearchPipeline {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(
        fetcher: Fetcher,
        profile: PageProfile,
        renderer: Arc<dyn ResultRenderer>,
    ) -> Self {
        let slot = Arc::new(QueryCoalescer::new());
        let root = CancellationToken::new();
        let fence = Arc::new(RenderFence::default());
        let (state_tx, snapshots) = watch::channel(Arc::new(PipelineState::idle()));

        let worker = Worker {
            profile,
            slot: Arc::clone(&slot),
            root: root.clone(),
            fence: Arc::clone(&fence),
            fetcher,
            renderer,
            state_tx,
        };
        let handle = tokio::spawn(worker.run());

        Self {
            profile,
            slot,
            root,
            fence,
            snapshots,
            worker: Mutex::new(Some(handle)),
        }
    }

    pub fn profile(&self) -> PageProfile {
        self.profile
    }

    /// Hands new search text to the worker without waiting.
    pub fn submit(&self, text: impl Into<String>) -> Result<Query, SlotClosed> {
        self.slot.submit(text)
    }

    /// Editor-facing entry point: ignores edits that leave the text unchanged.
    pub fn update_search_text(&self, old: &str, new: &str) -> Option<Query> {
        if old == new {
            return None;
        }
        self.submit(new).ok()
    }

    pub fn current_state(&self) -> Arc<PipelineState> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineState>> {
        self.snapshots.clone()
    }

    /// Placeholder for an empty result list, reflecting the error flag.
    pub fn empty_content(&self) -> EmptyContent {
        self.profile
            .page
            .empty_content(self.current_state().is_error)
    }

    pub fn is_disposed(&self) -> bool {
        self.fence.is_disposed()
    }

    /// Cancels the active fetch and stops the worker at its next suspension
    /// point. No renderer call starts after this returns. Idempotent, and
    /// safe to call from inside the pipeline's own renderer.
    pub fn dispose(&self) {
        if self.fence.mark_disposed() {
            self.root.cancel();
            self.slot.close();
            info!(page = ?self.profile.page, "search pipeline disposed");
        }
        self.fence.wait_for_render();
    }

    /// Disposes and waits for the worker task to finish.
    pub async fn shutdown(self) {
        self.dispose();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                warn!(%error, "search worker ended abnormally");
            }
        }
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct Worker {
    profile: PageProfile,
    slot: Arc<QueryCoalescer>,
    root: CancellationToken,
    fence: Arc<RenderFence>,
    fetcher: Fetcher,
    renderer: Arc<dyn ResultRenderer>,
    state_tx: watch::Sender<Arc<PipelineState>>,
}

impl Worker {
    async fn run(mut self) {
        info!(page = ?self.profile.page, "search worker started");
        while let Some(query) = self.slot.await_next().await {
            self.process(query).await;
        }
        info!(page = ?self.profile.page, "search worker stopped");
    }

    async fn process(&mut self, query: Query) {
        let scope = self.root.child_token();
        self.state_tx
            .send_modify(|state| *state = Arc::new(PipelineState::loading_from(state)));

        let outcome = {
            let fetch = self.fetcher.fetch(&query, &scope);
            tokio::pin!(fetch);
            loop {
                tokio::select! {
                    biased;
                    () = self.slot.pending(), if !scope.is_cancelled() => {
                        debug!(seq = query.seq(), "newer query arrived; cancelling fetch");
                        scope.cancel();
                    }
                    outcome = &mut fetch => break outcome,
                }
            }
        };

        if scope.is_cancelled() {
            debug!(seq = query.seq(), "discarding superseded fetch");
            return;
        }

        let next = match outcome {
            Ok(records) => {
                let results = project_all(&records, &self.profile);
                debug!(seq = query.seq(), count = results.len(), "search completed");
                PipelineState::loaded(results)
            }
            Err(FetchError::Cancelled) => {
                debug!(seq = query.seq(), "fetch cancelled");
                return;
            }
            Err(error) => {
                warn!(seq = query.seq(), %error, "search failed");
                PipelineState::failed()
            }
        };
        self.publish(next);
    }

    fn publish(&self, next: PipelineState) {
        let _rendering = self
            .fence
            .render
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.fence.is_disposed() {
            return;
        }

        let snapshot = Arc::new(next);
        self.state_tx.send_replace(Arc::clone(&snapshot));
        RENDERING.sync_scope(self.fence.id(), || self.renderer.render(&snapshot));
    }
}
