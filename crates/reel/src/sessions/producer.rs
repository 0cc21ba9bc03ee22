//! Background frame rendering into a session's bounded queue.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::media::FrameRenderer;
use crate::types::FrameItem;

/// How a producer task finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerOutcome {
    /// Every frame was enqueued, followed by [`FrameItem::End`].
    Completed,
    /// Cancelled, or the queue's receiver went away.
    Cancelled,
    /// A frame failed to render. No `End` was enqueued.
    Failed,
}

/// Handle to the single task writing a session's frame queue.
///
/// Dropping the handle cancels the task but does not wait for it; call
/// [`FrameProducer::cancel`] to wait.
pub struct FrameProducer {
    token: CancellationToken,
    handle: JoinHandle<ProducerOutcome>,
}

impl FrameProducer {
    pub fn spawn(
        sources: Vec<PathBuf>,
        renderer: Arc<dyn FrameRenderer>,
        tx: mpsc::Sender<FrameItem>,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(produce(sources, renderer, tx, token.clone()));
        Self { token, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to settle.
    ///
    /// Returns `None` if the task panicked.
    pub async fn cancel(mut self) -> Option<ProducerOutcome> {
        self.token.cancel();
        match (&mut self.handle).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Frame producer task did not complete cleanly");
                None
            }
        }
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for FrameProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameProducer")
            .field("cancelled", &self.token.is_cancelled())
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

async fn produce(
    sources: Vec<PathBuf>,
    renderer: Arc<dyn FrameRenderer>,
    tx: mpsc::Sender<FrameItem>,
    token: CancellationToken,
) -> ProducerOutcome {
    let total = sources.len();
    debug!(total, "Frame producer started");

    for (index, source) in sources.into_iter().enumerate() {
        if token.is_cancelled() {
            debug!(index, "Frame producer cancelled before render");
            return ProducerOutcome::Cancelled;
        }

        let renderer = Arc::clone(&renderer);
        let path = source.clone();
        let render = tokio::task::spawn_blocking(move || renderer.render(&path));

        let rendered = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(index, "Frame producer cancelled during render");
                return ProducerOutcome::Cancelled;
            }
            result = render => result,
        };

        let frame = match rendered {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!(
                    index,
                    source = %source.display(),
                    error = %e,
                    "Frame render failed, stopping producer"
                );
                return ProducerOutcome::Failed;
            }
            Err(e) => {
                warn!(
                    index,
                    source = %source.display(),
                    error = %e,
                    "Frame render task failed, stopping producer"
                );
                return ProducerOutcome::Failed;
            }
        };

        if let Some(outcome) = enqueue(&tx, &token, FrameItem::Frame(frame)).await {
            return outcome;
        }
    }

    if let Some(outcome) = enqueue(&tx, &token, FrameItem::End).await {
        return outcome;
    }

    info!(frames = total, "Frame producer finished");
    ProducerOutcome::Completed
}

/// Send one item, giving up on cancellation while the queue is full.
async fn enqueue(
    tx: &mpsc::Sender<FrameItem>,
    token: &CancellationToken,
    item: FrameItem,
) -> Option<ProducerOutcome> {
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("Frame producer cancelled while queue was full");
            Some(ProducerOutcome::Cancelled)
        }
        sent = tx.send(item) => match sent {
            Ok(()) => None,
            Err(_) => {
                debug!("Frame queue receiver dropped");
                Some(ProducerOutcome::Cancelled)
            }
        },
    }
}
