use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Unit of work handed to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub task_id: String,
}

/// In-process job queue feeding the scrape workers.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
    pending: Arc<AtomicUsize>,
}

/// Consuming side of [`JobQueue`], shared by every worker.
#[derive(Clone)]
pub struct JobReceiver {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<QueuedJob>>>,
    pending: Arc<AtomicUsize>,
}

impl JobQueue {
    pub fn new() -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            Self {
                sender,
                pending: pending.clone(),
            },
            JobReceiver {
                receiver: Arc::new(Mutex::new(receiver)),
                pending,
            },
        )
    }

    /// Enqueue a scrape job.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), QueueError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed(job.task_id));
        }
        metrics::gauge!("scrape_queue_depth").set(self.depth() as f64);
        Ok(())
    }

    /// Jobs enqueued but not yet picked up by a worker.
    pub fn depth(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl JobReceiver {
    /// Wait for the next job. Returns `None` once every sender is gone.
    pub async fn recv(&self) -> Option<QueuedJob> {
        let job = self.receiver.lock().await.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!("scrape_queue_depth").set(self.pending.load(Ordering::SeqCst) as f64);
        Some(job)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueueError {
    #[error("job queue closed, task {0} was not scheduled")]
    Closed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> QueuedJob {
        QueuedJob {
            task_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fifo_and_depth() {
        let (queue, jobs) = JobQueue::new();
        queue.enqueue(job("a")).unwrap();
        queue.enqueue(job("b")).unwrap();
        assert_eq!(queue.depth(), 2);

        assert_eq!(jobs.recv().await, Some(job("a")));
        assert_eq!(queue.depth(), 1);
        assert_eq!(jobs.recv().await, Some(job("b")));
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_closed_queue() {
        let (queue, jobs) = JobQueue::new();
        drop(jobs);
        assert_eq!(
            queue.enqueue(job("a")),
            Err(QueueError::Closed("a".to_string()))
        );
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (queue, jobs) = JobQueue::new();
        queue.enqueue(job("a")).unwrap();
        drop(queue);
        assert_eq!(jobs.recv().await, Some(job("a")));
        assert_eq!(jobs.recv().await, None);
    }
}
