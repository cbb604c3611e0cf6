//! Background lane worker
//!
//! One worker task per overlay. The render loop sends it full planning batches
//! and polls for replies between ticks; both sides only exchange owned copies
//! over channels, so the worker shares no mutable state with the overlay.
//!
//! ```text
//! RenderLoop ──(generation, WorkerRequest)──▶ worker task
//!     ▲                                         │ plan_lanes()
//!     └──────(generation, WorkerResponse)───────┘
//! ```
//!
//! Each batch carries a generation number. When batches queue up faster than
//! the worker drains them, only the newest is planned.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::planner::{respond, WorkerRequest, WorkerResponse};

/// Reasons the worker cannot be used
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// Spawned outside a Tokio runtime
    #[error("no async runtime available to host the lane worker")]
    NoRuntime,

    /// The worker task has exited or was terminated
    #[error("lane worker has stopped")]
    Closed,
}

/// Handle to a background lane planning task
#[derive(Debug)]
pub struct LaneWorker {
    requests: mpsc::UnboundedSender<(u64, WorkerRequest)>,
    replies: mpsc::UnboundedReceiver<(u64, WorkerResponse)>,
    task: JoinHandle<()>,
    next_generation: u64,
}

impl LaneWorker {
    /// Spawn the worker on the current Tokio runtime
    pub fn spawn() -> Result<Self, WorkerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WorkerError::NoRuntime)?;

        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<(u64, WorkerRequest)>();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        let task = runtime.spawn(async move {
            while let Some(mut batch) = request_rx.recv().await {
                while let Ok(newer) = request_rx.try_recv() {
                    batch = newer;
                }
                let (generation, request) = batch;
                let reply = respond(&request);
                debug!(
                    generation,
                    items = request.items.len(),
                    ok = reply.ok,
                    "Lane worker planned batch"
                );
                if reply_tx.send((generation, reply)).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            task,
            next_generation: 1,
        })
    }

    /// Queue a batch; returns its generation
    pub fn submit(&mut self, request: WorkerRequest) -> Result<u64, WorkerError> {
        let generation = self.next_generation;
        self.requests
            .send((generation, request))
            .map_err(|_| WorkerError::Closed)?;
        self.next_generation += 1;
        Ok(generation)
    }

    /// Next reply, if one has arrived
    pub fn poll(&mut self) -> Result<Option<(u64, WorkerResponse)>, WorkerError> {
        match self.replies.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(WorkerError::Closed),
        }
    }

    /// Wait for the next reply
    pub async fn recv(&mut self) -> Result<(u64, WorkerResponse), WorkerError> {
        self.replies.recv().await.ok_or(WorkerError::Closed)
    }

    /// Generation of the most recently submitted batch (0 before any)
    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        self.next_generation - 1
    }

    /// Stop the worker task
    pub fn terminate(&self) {
        self.task.abort();
    }
}

impl Drop for LaneWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
