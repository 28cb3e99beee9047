//! Transfer handles: awaitable result plus ordered progress events
//!
//! Each transfer runs in its own tokio task. The task publishes events through
//! a [`Progress`] publisher, which only lets a stage through when it comes
//! strictly after the last published one. The event channel closes before the
//! terminal result is delivered, and dropping the handle aborts the task.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ptokens_core::TransferError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::events::{Direction, Stage, TransferEvent, TransferStatus};

/// Publisher side of a transfer, owned by the transfer task
pub struct Progress {
    id: Uuid,
    direction: Direction,
    last_rank: Mutex<usize>,
    events: mpsc::UnboundedSender<TransferEvent>,
    status: Arc<watch::Sender<TransferStatus>>,
}

impl Progress {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Publish `event` if its stage comes after the current one.
    ///
    /// Returns whether the event was published; duplicates and out-of-order
    /// events are dropped.
    pub fn emit(&self, event: TransferEvent) -> bool {
        let stage = event.stage();
        let Some(rank) = self.direction.rank(stage) else {
            tracing::warn!(transfer = %self.id, stage = %stage, "Dropping event foreign to transfer direction");
            return false;
        };

        {
            let mut last = self.last_rank.lock().unwrap_or_else(|e| e.into_inner());
            if rank <= *last {
                return false;
            }
            *last = rank;
        }

        tracing::info!(
            transfer = %self.id,
            stage = %stage,
            tx_id = %event.tx_id(),
            "Transfer progressed"
        );
        self.status.send_replace(TransferStatus::InProgress(stage));
        // The receiver may be gone if the caller stopped listening; the result still matters.
        let _ = self.events.send(event);
        true
    }

    /// Last published stage
    pub fn stage(&self) -> Stage {
        let last = *self.last_rank.lock().unwrap_or_else(|e| e.into_inner());
        self.direction.stages()[last]
    }
}

/// Caller side of one issue or redeem operation
pub struct TransferHandle<T> {
    id: Uuid,
    direction: Direction,
    events: mpsc::UnboundedReceiver<TransferEvent>,
    status: watch::Receiver<TransferStatus>,
    result: Option<oneshot::Receiver<Result<T, TransferError>>>,
    outcome: Option<Result<T, TransferError>>,
    task: Option<JoinHandle<()>>,
}

impl<T> TransferHandle<T>
where
    T: Clone + Send + 'static,
{
    /// Spawn `run` as a transfer task.
    ///
    /// `max_wait` bounds the whole transfer; exceeding it fails the handle with
    /// `Timeout`.
    pub fn spawn<F, Fut>(direction: Direction, max_wait: Option<Duration>, run: F) -> Self
    where
        F: FnOnce(Progress) -> Fut,
        Fut: Future<Output = Result<T, TransferError>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let initial = direction.initial_stage();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(TransferStatus::InProgress(initial));
        let status_tx = Arc::new(status_tx);
        let (result_tx, result_rx) = oneshot::channel();

        let progress = Progress {
            id,
            direction,
            last_rank: Mutex::new(0),
            events: event_tx,
            status: Arc::clone(&status_tx),
        };
        let fut = run(progress);

        let task = tokio::spawn(async move {
            let result = match max_wait {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(TransferError::Timeout {
                        stage: status_tx.borrow().stage_name(),
                        waited_secs: limit.as_secs(),
                    }),
                },
                None => fut.await,
            };

            match &result {
                Ok(_) => {
                    tracing::info!(transfer = %id, "Transfer completed");
                    status_tx.send_replace(TransferStatus::Completed);
                }
                Err(e) => {
                    tracing::warn!(transfer = %id, error = %e, "Transfer failed");
                    status_tx.send_replace(TransferStatus::Failed(e.clone()));
                }
            }
            let _ = result_tx.send(result);
        });

        Self {
            id,
            direction,
            events: event_rx,
            status: status_rx,
            result: Some(result_rx),
            outcome: None,
            task: Some(task),
        }
    }

    /// A handle that failed before any I/O happened
    pub fn rejected(direction: Direction, error: TransferError) -> Self {
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (_status_tx, status_rx) = watch::channel(TransferStatus::Failed(error.clone()));

        Self {
            id: Uuid::new_v4(),
            direction,
            events: event_rx,
            status: status_rx,
            result: None,
            outcome: Some(Err(error)),
            task: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current status snapshot
    pub fn status(&self) -> TransferStatus {
        self.status.borrow().clone()
    }

    /// Next progress event, `None` once the transfer reached a terminal state
    /// and all events were consumed
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    /// Wait for the terminal result. Repeated calls return the same outcome.
    pub async fn result(&mut self) -> Result<T, TransferError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = match self.result.take() {
            Some(rx) => rx.await.unwrap_or(Err(TransferError::Cancelled)),
            None => Err(TransferError::Cancelled),
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Stop the transfer task
    pub fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!(transfer = %self.id, "Aborting transfer");
            task.abort();
        }
    }
}

impl<T> Drop for TransferHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl TransferStatus {
    fn stage_name(&self) -> String {
        match self {
            Self::InProgress(stage) => format!("waiting after {}", stage),
            Self::Completed => "completed".to_string(),
            Self::Failed(_) => "failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptokens_core::TxId;

    fn native_broadcasted(id: &str) -> TransferEvent {
        TransferEvent::NativeTxBroadcasted { tx_id: TxId::from(id) }
    }

    fn native_confirmed(id: &str) -> TransferEvent {
        TransferEvent::NativeTxConfirmed { tx_id: TxId::from(id) }
    }

    #[tokio::test]
    async fn test_events_in_order_then_result() {
        let mut handle = TransferHandle::spawn(Direction::Issue, None, |progress| async move {
            assert!(progress.emit(native_broadcasted("a")));
            assert!(!progress.emit(native_broadcasted("a")));
            assert!(progress.emit(native_confirmed("a")));
            // stale stage after a later one is dropped
            assert!(!progress.emit(native_broadcasted("b")));
            Ok::<_, TransferError>(42u32)
        });

        assert_eq!(handle.next_event().await, Some(native_broadcasted("a")));
        assert_eq!(handle.next_event().await, Some(native_confirmed("a")));
        assert_eq!(handle.next_event().await, None);

        assert_eq!(handle.result().await, Ok(42));
        assert_eq!(handle.result().await, Ok(42));
        assert_eq!(handle.status(), TransferStatus::Completed);
    }

    #[tokio::test]
    async fn test_failure_is_terminal() {
        let mut handle = TransferHandle::<()>::spawn(Direction::Redeem, None, |_progress| async move {
            Err(TransferError::HostTxFailed {
                tx_hash: "0x9864".into(),
            })
        });

        let err = handle.result().await.unwrap_err();
        assert_eq!(err.error_code(), "host_tx_failed");
        assert!(matches!(handle.status(), TransferStatus::Failed(_)));
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn test_rejected_handle() {
        let mut handle = TransferHandle::<()>::rejected(
            Direction::Redeem,
            TransferError::InvalidAmount {
                message: "negative".into(),
            },
        );
        assert!(handle.status().is_terminal());
        assert_eq!(handle.next_event().await, None);
        assert_eq!(handle.result().await.unwrap_err().error_code(), "invalid_amount");
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_times_out() {
        let mut handle = TransferHandle::<()>::spawn(
            Direction::Issue,
            Some(Duration::from_secs(10)),
            |progress| async move {
                progress.emit(native_broadcasted("a"));
                std::future::pending::<()>().await;
                Ok(())
            },
        );

        assert_eq!(handle.next_event().await, Some(native_broadcasted("a")));
        let err = handle.result().await.unwrap_err();
        assert!(matches!(err, TransferError::Timeout { waited_secs: 10, .. }));
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn test_abort_cancels() {
        let mut handle = TransferHandle::<()>::spawn(Direction::Issue, None, |_progress| async move {
            std::future::pending::<()>().await;
            Ok(())
        });

        handle.abort();
        assert_eq!(handle.result().await, Err(TransferError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let polls = Arc::new(AtomicU32::new(0));
        let task_polls = Arc::clone(&polls);
        let handle = TransferHandle::<()>::spawn(Direction::Issue, None, move |_progress| async move {
            while task_polls.fetch_add(1, Ordering::SeqCst) < u32::MAX {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        let before = polls.load(Ordering::SeqCst);
        assert!(before >= 3, "{before}");

        drop(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(polls.load(Ordering::SeqCst), before);
        // the task and everything it captured is gone
        assert_eq!(Arc::strong_count(&polls), 1);
    }

    #[test]
    fn test_progress_foreign_stage_dropped() {
        let (events, _rx) = mpsc::unbounded_channel();
        let (status, _status_rx) = watch::channel(TransferStatus::InProgress(Stage::PendingHostBroadcast));
        let progress = Progress {
            id: Uuid::new_v4(),
            direction: Direction::Redeem,
            last_rank: Mutex::new(0),
            events,
            status: Arc::new(status),
        };

        assert!(!progress.emit(native_broadcasted("a")));
        assert_eq!(progress.stage(), Stage::PendingHostBroadcast);
    }
}
