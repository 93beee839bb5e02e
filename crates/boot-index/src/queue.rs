use crate::error::{IndexError, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to one queued index operation.
///
/// Dropping the handle does not cancel the operation; call [`IndexTask::cancel`].
pub struct IndexTask<T> {
    token: CancellationToken,
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> IndexTask<T> {
    fn new(token: CancellationToken, rx: oneshot::Receiver<Result<T>>) -> Self {
        Self { token, rx }
    }

    fn failed(token: CancellationToken, err: IndexError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self::new(token, rx)
    }

    /// Asks the operation to stop at its next checkpoint. Operations that already
    /// passed their commit point still complete.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits until the operation has run (or was skipped) and returns its outcome.
    pub async fn join(self) -> Result<T> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(IndexError::QueueClosed),
        }
    }
}

impl<T> std::fmt::Debug for IndexTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexTask")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Strict FIFO of index operations executed by one dedicated worker thread.
///
/// Operations never overlap, so each one sees every effect of the ones submitted
/// before it.
pub(crate) struct UpdateQueue {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
}

impl UpdateQueue {
    pub(crate) fn new(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        std::thread::Builder::new()
            .name(format!("boot-index-{name}"))
            .spawn(move || {
                for job in rx {
                    job();
                }
                tracing::debug!(target = "boot.index", "update queue drained; worker exiting");
            })
            .map_err(IndexError::Worker)?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
        })
    }

    pub(crate) fn submit<T, F>(&self, operation: &'static str, token: CancellationToken, f: F) -> IndexTask<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        if token.is_cancelled() {
            return IndexTask::failed(token, IndexError::Cancelled);
        }
        let Some(sender) = self.tx.lock().clone() else {
            return IndexTask::failed(token, IndexError::QueueClosed);
        };

        let (tx, rx) = oneshot::channel();
        let token_for_job = token.clone();
        let job: Job = Box::new(move || {
            let result = if token_for_job.is_cancelled() {
                Err(IndexError::Cancelled)
            } else {
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&token_for_job))) {
                    Ok(result) => result,
                    Err(panic) => {
                        tracing::error!(
                            target = "boot.index",
                            operation,
                            panic = %panic_payload_to_str(&*panic),
                            "index operation panicked"
                        );
                        Err(IndexError::Panicked)
                    }
                }
            };
            if let Err(err) = &result {
                tracing::debug!(target = "boot.index", operation, error = %err, "index operation failed");
            }
            let _ = tx.send(result);
        });

        if sender.send(job).is_err() {
            return IndexTask::failed(token, IndexError::QueueClosed);
        }
        IndexTask::new(token, rx)
    }

    /// Stops accepting operations. Already queued ones still run.
    pub(crate) fn close(&self) {
        self.tx.lock().take();
    }
}

pub(crate) fn panic_payload_to_str(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
