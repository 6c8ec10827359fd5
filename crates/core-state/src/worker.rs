//! Background completion worker.
//!
//! The worker owns no editor state. It receives a document snapshot, runs the
//! completer on the blocking pool and hands the candidates back tagged with the
//! request and a generation number. The event loop applies a result only if
//! the buffer still shows that exact document; late or superseded results are
//! dropped.

use std::sync::Arc;

use core_text::Document;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::{self, JoinHandle};
use tracing::{debug, trace};

use crate::buffer::CompletionSelect;
use crate::completion::{CompleteEvent, Completer, Completion};

/// What to complete and how to open the menu once candidates arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub document: Document,
    pub event: CompleteEvent,
    pub select: CompletionSelect,
    pub insert_common_part: bool,
}

impl CompletionRequest {
    /// Complete-while-typing: open the menu without selecting anything.
    pub fn typed(document: Document) -> Self {
        Self {
            document,
            event: CompleteEvent::typed(),
            select: CompletionSelect::None,
            insert_common_part: false,
        }
    }

    /// The same request against a newer document.
    pub fn retarget(&self, document: Document) -> Self {
        Self {
            document,
            ..self.clone()
        }
    }
}

/// Candidates computed for `request.document`.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub generation: u64,
    pub request: CompletionRequest,
    pub completions: Vec<Completion>,
}

pub struct CompletionWorker {
    requests: UnboundedSender<(u64, CompletionRequest)>,
    results: UnboundedReceiver<CompletionResult>,
    generation: u64,
    handle: JoinHandle<()>,
}

impl CompletionWorker {
    /// Spawn the worker task. Must be called inside a tokio runtime.
    pub fn spawn(completer: Arc<dyn Completer>) -> Self {
        let (req_tx, mut req_rx) = unbounded_channel::<(u64, CompletionRequest)>();
        let (res_tx, res_rx) = unbounded_channel::<CompletionResult>();
        let handle = task::spawn(async move {
            while let Some(mut next) = req_rx.recv().await {
                // Only the newest queued request matters.
                while let Ok(newer) = req_rx.try_recv() {
                    next = newer;
                }
                let (generation, request) = next;
                let completer = completer.clone();
                let snapshot = request.clone();
                let computed =
                    task::spawn_blocking(move || completer.get_completions(&snapshot.document, &snapshot.event))
                        .await;
                let completions = match computed {
                    Ok(completions) => completions,
                    Err(err) => {
                        debug!(target: "state.completion", generation, %err, "completer_failed");
                        continue;
                    }
                };
                trace!(target: "state.completion", generation, count = completions.len(), "worker_done");
                let result = CompletionResult {
                    generation,
                    request,
                    completions,
                };
                if res_tx.send(result).is_err() {
                    break;
                }
            }
        });
        Self {
            requests: req_tx,
            results: res_rx,
            generation: 0,
            handle,
        }
    }

    /// Queue a computation, superseding earlier requests.
    pub fn request(&mut self, request: CompletionRequest) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        if self.requests.send((generation, request)).is_err() {
            debug!(target: "state.completion", "worker_gone");
        }
        generation
    }

    /// Make every outstanding result stale.
    pub fn cancel(&mut self) {
        self.generation += 1;
        trace!(target: "state.completion", generation = self.generation, "worker_cancel");
    }

    pub fn is_current(&self, result: &CompletionResult) -> bool {
        result.generation == self.generation
    }

    /// Next finished computation; `None` once the worker task is gone.
    pub async fn next_result(&mut self) -> Option<CompletionResult> {
        self.results.recv().await
    }
}

impl Drop for CompletionWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
