// Cancellation Token
//
// A watch channel carries the first cancellation reason to every clone of the
// token. A token may also carry a deadline, which fires as
// `CancelReason::DeadlineExceeded` without anyone calling `cancel`.

use crate::domain::CancelReason;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Cancellation signal observed by the poller between evaluations
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: Option<watch::Receiver<Option<CancelReason>>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never canceled
    pub fn never() -> Self {
        Self {
            rx: None,
            deadline: None,
        }
    }

    /// Derive a token that also fires at `deadline`
    ///
    /// An existing earlier deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            rx: self.rx.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Current cancellation reason, if any
    ///
    /// An explicit cancellation wins over an expired deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if let Some(rx) = &self.rx {
            if let Some(reason) = rx.borrow().clone() {
                return Some(reason);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Check if cancellation was requested or the deadline passed
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Wait until the token is canceled and return the reason
    ///
    /// Never resolves for [`CancelToken::never`] or when every
    /// [`CancelSource`] was dropped without canceling.
    pub async fn cancelled(&self) -> CancelReason {
        if let Some(reason) = self.reason() {
            return reason;
        }

        let deadline = self.deadline;
        tokio::select! {
            biased;
            reason = signalled(self.rx.clone()) => reason,
            _ = expired(deadline) => {
                // a cancel racing the deadline still wins
                self.reason().unwrap_or(CancelReason::DeadlineExceeded)
            }
        }
    }
}

async fn signalled(rx: Option<watch::Receiver<Option<CancelReason>>>) -> CancelReason {
    if let Some(mut rx) = rx {
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone(),
            Err(_) => None,
        };
        if let Some(reason) = reason {
            return reason;
        }
    }
    std::future::pending().await
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cancellation sender
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<Option<CancelReason>>,
}

impl CancelSource {
    /// Cancel every token of this channel
    ///
    /// Only the first reason is kept; later calls are ignored.
    pub fn cancel(&self, reason: CancelReason) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    /// Another token observing this source
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
            deadline: None,
        }
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelSource, CancelToken) {
    let (tx, rx) = watch::channel(None);
    (
        CancelSource { tx },
        CancelToken {
            rx: Some(rx),
            deadline: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_token_is_not_cancelled() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[tokio::test]
    async fn test_cancel_reaches_every_clone() {
        let (source, token) = cancel_channel();
        let other = token.clone();

        source.cancel(CancelReason::Interrupted);

        assert_eq!(token.reason(), Some(CancelReason::Interrupted));
        assert_eq!(other.cancelled().await, CancelReason::Interrupted);
        assert_eq!(source.token().reason(), Some(CancelReason::Interrupted));
    }

    #[tokio::test]
    async fn test_first_reason_wins() {
        let (source, token) = cancel_channel();

        source.cancel(CancelReason::Requested("first".into()));
        source.cancel(CancelReason::Interrupted);

        assert_eq!(token.reason(), Some(CancelReason::Requested("first".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_as_deadline_exceeded() {
        let token = CancelToken::never().with_deadline(Instant::now() + Duration::from_millis(50));
        assert!(!token.is_cancelled());

        let reason = token.cancelled().await;

        assert_eq!(reason, CancelReason::DeadlineExceeded);
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_deadline_is_kept() {
        let now = Instant::now();
        let token = CancelToken::never()
            .with_deadline(now + Duration::from_millis(10))
            .with_deadline(now + Duration::from_secs(10));

        assert_eq!(token.deadline(), Some(now + Duration::from_millis(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel_wins_over_expired_deadline() {
        let (source, token) = cancel_channel();
        let token = token.with_deadline(Instant::now() + Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel(CancelReason::Interrupted);

        assert_eq!(token.reason(), Some(CancelReason::Interrupted));
        assert_eq!(token.cancelled().await, CancelReason::Interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_source_never_cancels() {
        let (source, token) = cancel_channel();
        drop(source);

        let waited = tokio::time::timeout(Duration::from_secs(1), token.cancelled()).await;

        assert!(waited.is_err());
    }
}
