use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    Arc,
};

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressId(pub u64);

/// Progress of a full project scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin {
        id: ProgressId,
        project: String,
        total_files: usize,
    },
    Report {
        id: ProgressId,
        scanned_files: usize,
        total_files: usize,
        percentage: u32,
    },
    End {
        id: ProgressId,
        message: Option<String>,
    },
}

pub type ProgressReceiver = broadcast::Receiver<ProgressEvent>;

/// Fan-out of scan progress. Sending never blocks and never fails; events are simply
/// dropped when nobody subscribed.
#[derive(Clone)]
pub struct ProgressSender {
    tx: broadcast::Sender<ProgressEvent>,
    next_id: Arc<AtomicU64>,
}

impl ProgressSender {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> ProgressReceiver {
        self.tx.subscribe()
    }

    pub fn start(&self, project: impl Into<String>, total_files: usize) -> Progress {
        let id = ProgressId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _ = self.tx.send(ProgressEvent::Begin {
            id,
            project: project.into(),
            total_files,
        });
        Progress {
            id,
            total_files,
            tx: self.tx.clone(),
            last_percentage: AtomicU32::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender")
            .field("receivers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

/// One running scan. Ends itself on drop if not finished explicitly.
pub struct Progress {
    id: ProgressId,
    total_files: usize,
    tx: broadcast::Sender<ProgressEvent>,
    last_percentage: AtomicU32,
    finished: AtomicBool,
}

impl Progress {
    pub fn id(&self) -> ProgressId {
        self.id
    }

    /// Reports `scanned_files` done; only whole-percent changes are sent.
    pub fn report(&self, scanned_files: usize) {
        let percentage = if self.total_files == 0 {
            100
        } else {
            ((scanned_files.min(self.total_files) * 100) / self.total_files) as u32
        };
        if self.last_percentage.swap(percentage, Ordering::Relaxed) == percentage {
            return;
        }
        let _ = self.tx.send(ProgressEvent::Report {
            id: self.id,
            scanned_files,
            total_files: self.total_files,
            percentage,
        });
    }

    pub fn finish(&self, message: impl Into<Option<String>>) {
        let message = message.into();
        if self
            .finished
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.tx.send(ProgressEvent::End {
                id: self.id,
                message,
            });
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish(None);
    }
}
