//! Outbound write serialization for one session.
//! Frames are served strictly in submission order with at most one
//! write in flight; the session runtime drains the receiving end and
//! reports each frame's terminal outcome back through its oneshot.

use tokio::sync::{mpsc, oneshot};

use crate::core::bluetooth::commands::Frame;
use crate::error::{Error, Result};

/// Queued writes beyond this many backpressure the submitter.
const QUEUE_DEPTH: usize = 32;

/// One queued frame and the sink its terminal outcome lands in.
pub(crate) struct WriteRequest {
    pub(crate) frame: Frame,
    pub(crate) done: oneshot::Sender<Result<()>>,
}

/// Submission side of a session's write queue.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::Sender<WriteRequest>,
}

impl WriteQueue {
    pub(crate) fn channel() -> (Self, mpsc::Receiver<WriteRequest>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (Self { tx }, rx)
    }

    /// Queues one frame and waits until it is written or abandoned.
    pub async fn submit(&self, frame: Frame) -> Result<()> {
        let (done, outcome) = oneshot::channel();
        self.tx
            .send(WriteRequest { frame, done })
            .await
            .map_err(|_| Error::SessionClosed)?;
        outcome.await.map_err(|_| Error::SessionClosed)?
    }
}
