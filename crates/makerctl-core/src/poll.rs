//! Long-running operation poller
//!
//! Cloud control-plane operations (cluster provisioning, node-group scaling)
//! are asynchronous and eventually consistent. None of the three provider
//! APIs push completion events through this tool's access pattern, so the
//! only correct strategy is to re-describe the resource on a fixed interval
//! until it reaches a terminal state.
//!
//! The loop is bounded by a deadline (`PollTimeout` past it) and can be
//! aborted through a [`CancelToken`], so a wait never outlives the caller's
//! patience. Progress events are emitted for UI layers that want a spinner.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{CoreError, Result};

/// Fixed-interval poll configuration.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Time between describe calls
    pub interval: Duration,
    /// Deadline for reaching a terminal state
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(1800),
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The wait has begun
    Started { subject: String },
    /// One polling iteration with the observed status
    Polling {
        subject: String,
        status: String,
        elapsed: Duration,
    },
    /// The wait finished in a success state
    Completed { subject: String, status: String },
    /// The wait finished in a failure state, timed out, or was cancelled
    Failed { subject: String, error: String },
}

/// Callback type for progress updates. The CLI hooks a spinner up to this;
/// headless callers pass `None`.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cancellation signal observed by the poller.
///
/// A token obtained from [`cancel_pair`] trips when the matching handle is
/// cancelled; [`CancelToken::none`] never trips.
#[derive(Clone, Default)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

/// The triggering side of a cancellation pair.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Create a linked (handle, token) cancellation pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the token is cancelled; pends forever for [`Self::none`].
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            // A dropped handle means cancellation can no longer happen.
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

/// Poll `fetch` until `is_ready` or `is_failed` matches the observed value.
///
/// `label` extracts the status string used for progress reporting and for
/// the `PollFailed` error. Returns the final observed value on success so
/// callers can proceed to dependent steps (e.g. read the endpoint off a
/// cluster that just went ready).
#[allow(clippy::too_many_arguments)]
pub async fn wait_for<T, F, Fut>(
    subject: &str,
    mut fetch: F,
    label: impl Fn(&T) -> String,
    is_ready: impl Fn(&T) -> bool,
    is_failed: impl Fn(&T) -> bool,
    settings: PollSettings,
    cancel: &CancelToken,
    on_progress: Option<&ProgressCallback>,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    emit(
        on_progress,
        ProgressEvent::Started {
            subject: subject.to_string(),
        },
    );

    loop {
        if cancel.is_cancelled() {
            emit(
                on_progress,
                ProgressEvent::Failed {
                    subject: subject.to_string(),
                    error: "cancelled".to_string(),
                },
            );
            return Err(CoreError::Cancelled);
        }

        let observed = fetch().await?;
        let status = label(&observed);
        tracing::debug!(subject, %status, "polled");
        emit(
            on_progress,
            ProgressEvent::Polling {
                subject: subject.to_string(),
                status: status.clone(),
                elapsed: start.elapsed(),
            },
        );

        if is_ready(&observed) {
            emit(
                on_progress,
                ProgressEvent::Completed {
                    subject: subject.to_string(),
                    status,
                },
            );
            return Ok(observed);
        }
        if is_failed(&observed) {
            emit(
                on_progress,
                ProgressEvent::Failed {
                    subject: subject.to_string(),
                    error: format!("reached failure state '{status}'"),
                },
            );
            return Err(CoreError::PollFailed { status });
        }
        if start.elapsed() >= settings.timeout {
            emit(
                on_progress,
                ProgressEvent::Failed {
                    subject: subject.to_string(),
                    error: format!("timed out after {:?}", settings.timeout),
                },
            );
            return Err(CoreError::PollTimeout(settings.timeout));
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        subject: subject.to_string(),
                        error: "cancelled".to_string(),
                    },
                );
                return Err(CoreError::Cancelled);
            }
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}

/// String-status convenience wrapper over [`wait_for`].
pub async fn wait_for_status<F, Fut>(
    subject: &str,
    fetch: F,
    is_ready: impl Fn(&str) -> bool,
    is_failed: impl Fn(&str) -> bool,
    settings: PollSettings,
    cancel: &CancelToken,
    on_progress: Option<&ProgressCallback>,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    wait_for(
        subject,
        fetch,
        |status: &String| status.clone(),
        |status| is_ready(status),
        |status| is_failed(status),
        settings,
        cancel,
        on_progress,
    )
    .await
}

fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scripted(
        statuses: &[&str],
    ) -> (
        Arc<AtomicUsize>,
        impl FnMut() -> std::future::Ready<Result<String>>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let fetch = move || {
            let idx = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(statuses[idx.min(statuses.len() - 1)].clone()))
        };
        (calls, fetch)
    }

    fn fast() -> PollSettings {
        PollSettings::new(Duration::from_secs(1), Duration::from_secs(600))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_three_polls_and_two_sleeps() {
        let (calls, fetch) = scripted(&["Pending", "Pending", "Succeeded"]);
        let start = Instant::now();

        let status = wait_for_status(
            "cluster demo",
            fetch,
            |s| s == "Succeeded",
            |s| s == "Failed",
            fast(),
            &CancelToken::none(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(status, "Succeeded");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two sleeps of one interval each; fetches are instant under a
        // paused clock.
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fails_after_two_polls_without_a_third_fetch() {
        let (calls, fetch) = scripted(&["Pending", "Failed"]);

        let err = wait_for_status(
            "cluster demo",
            fetch,
            |s| s == "Succeeded",
            |s| s == "Failed",
            fast(),
            &CancelToken::none(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::PollFailed { ref status } if status == "Failed"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expires_with_poll_timeout() {
        let (calls, fetch) = scripted(&["Pending"]);
        let settings = PollSettings::new(Duration::from_secs(1), Duration::from_secs(3));

        let err = wait_for_status(
            "cluster demo",
            fetch,
            |s| s == "Succeeded",
            |s| s == "Failed",
            settings,
            &CancelToken::none(),
            None,
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        // interval 1s, deadline 3s: polls at t=0,1,2,3 then stops.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_the_sleep() {
        let (calls, fetch) = scripted(&["Pending"]);
        let (handle, token) = cancel_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            handle.cancel();
        });

        let err = wait_for_status(
            "cluster demo",
            fetch,
            |s| s == "Succeeded",
            |s| s == "Failed",
            PollSettings::new(Duration::from_secs(60), Duration::from_secs(600)),
            &token,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::Cancelled));
        // Cancelled mid-sleep after the first fetch.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_never_fetches() {
        let (calls, fetch) = scripted(&["Pending"]);
        let (handle, token) = cancel_pair();
        handle.cancel();

        let err = wait_for_status(
            "cluster demo",
            fetch,
            |s| s == "Succeeded",
            |s| s == "Failed",
            fast(),
            &token,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn typed_wait_returns_the_final_observation() {
        #[derive(Clone)]
        struct Described {
            status: &'static str,
            endpoint: &'static str,
        }

        let script = [
            Described { status: "RUNNING", endpoint: "" },
            Described { status: "RUNNING", endpoint: "203.0.113.7" },
        ];
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let fetch = move || {
            let idx = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(script[idx.min(script.len() - 1)].clone()))
        };

        let observed = wait_for(
            "cluster demo",
            fetch,
            |d: &Described| d.status.to_string(),
            |d| d.status == "RUNNING" && !d.endpoint.is_empty(),
            |d| d.status == "ERROR",
            fast(),
            &CancelToken::none(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(observed.endpoint, "203.0.113.7");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_events_are_emitted_in_order() {
        let (_, fetch) = scripted(&["Pending", "Succeeded"]);
        let seen: Arc<std::sync::Mutex<Vec<String>>> = Arc::default();
        let sink = seen.clone();
        let callback: ProgressCallback = Box::new(move |event| {
            let tag = match event {
                ProgressEvent::Started { .. } => "started",
                ProgressEvent::Polling { .. } => "polling",
                ProgressEvent::Completed { .. } => "completed",
                ProgressEvent::Failed { .. } => "failed",
            };
            sink.lock().unwrap().push(tag.to_string());
        });

        wait_for_status(
            "database demo",
            fetch,
            |s| s == "Succeeded",
            |s| s == "Failed",
            fast(),
            &CancelToken::none(),
            Some(&callback),
        )
        .await
        .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["started", "polling", "polling", "completed"]
        );
    }
}
