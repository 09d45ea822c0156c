//! Condition Poller - Re-evaluates a condition until it holds, time runs out,
//! or the caller cancels.
//!
//! Timing contract:
//! - The first evaluation happens immediately; a condition that is already
//!   true returns without ever sleeping.
//! - Later evaluations are spaced `interval` after the previous one finished.
//!   Evaluations never overlap and are never interrupted mid-flight, so a slow
//!   evaluation can overrun the deadline by up to its own duration.
//! - Cancellation (and the deadline) is observed only between evaluations.
//!   When both are pending at the same time, explicit cancellation wins.

use crate::application::cancel::CancelToken;
use crate::application::constants::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT, MIN_POLL_INTERVAL};
use crate::domain::{CancelReason, PollError, PollStats};
use crate::port::Condition;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

/// Immutable parameters of one poll operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub interval: Duration,
    /// Total budget measured from entry; `None` waits until canceled
    pub timeout: Option<Duration>,
}

impl Default for PollRequest {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Reusable poller configuration
///
/// # Example
/// ```text
/// let poller = ConditionPoller::new(Duration::from_millis(500))
///     .with_timeout(Duration::from_secs(30));
/// poller.poll(&mut condition, &CancelToken::never()).await?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionPoller {
    request: PollRequest,
}

impl ConditionPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            request: PollRequest {
                interval,
                timeout: None,
            },
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    pub fn request(&self) -> PollRequest {
        self.request
    }

    /// Poll `condition` under this configuration
    ///
    /// With a timeout this behaves like [`poll_with_timeout_and_cancel`],
    /// without one like [`poll_until_canceled`].
    pub async fn poll<C>(
        &self,
        condition: &mut C,
        cancel: &CancelToken,
    ) -> Result<PollStats, PollError>
    where
        C: Condition + ?Sized,
    {
        match self.request.timeout {
            Some(timeout) => {
                poll_with_timeout_and_cancel(condition, self.request.interval, timeout, cancel)
                    .await
            }
            None => poll_until_canceled(condition, self.request.interval, cancel).await,
        }
    }
}

/// Poll until the condition holds or `timeout` elapses
///
/// A zero timeout evaluates the condition exactly once.
///
/// # Errors
/// - `PollError::TimedOut` if the deadline passed without the condition holding
pub async fn poll_with_timeout<C>(
    condition: &mut C,
    interval: Duration,
    timeout: Duration,
) -> Result<PollStats, PollError>
where
    C: Condition + ?Sized,
{
    poll_with_timeout_and_cancel(condition, interval, timeout, &CancelToken::never()).await
}

/// Poll until the condition holds, `timeout` elapses, or `cancel` fires
///
/// A timeout too large to add to the current instant (e.g. `Duration::MAX`)
/// means no deadline at all.
///
/// The deadline is implemented as a derived cancellation token; its
/// `DeadlineExceeded` reason is translated into `PollError::TimedOut` here so
/// callers never see the generic signal. Every other reason passes through.
///
/// # Errors
/// - `PollError::TimedOut` on deadline expiry
/// - `PollError::Canceled` with the caller's reason on cancellation
pub async fn poll_with_timeout_and_cancel<C>(
    condition: &mut C,
    interval: Duration,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<PollStats, PollError>
where
    C: Condition + ?Sized,
{
    // the deadline clock starts once, at entry
    let Some(deadline) = Instant::now().checked_add(timeout) else {
        debug!(
            timeout_ms = %timeout.as_millis(),
            "Timeout beyond the clock range, polling without a deadline"
        );
        return poll_until_canceled(condition, interval, cancel).await;
    };
    let scoped = cancel.with_deadline(deadline);

    match poll_until_canceled(condition, interval, &scoped).await {
        Err(PollError::Canceled(CancelReason::DeadlineExceeded)) => {
            debug!(timeout_ms = %timeout.as_millis(), "Poll deadline exceeded");
            Err(PollError::TimedOut)
        }
        other => other,
    }
}

/// Poll until the condition holds or `cancel` fires
///
/// # Errors
/// - `PollError::Canceled` carrying the token's reason
pub async fn poll_until_canceled<C>(
    condition: &mut C,
    interval: Duration,
    cancel: &CancelToken,
) -> Result<PollStats, PollError>
where
    C: Condition + ?Sized,
{
    let interval = effective_interval(interval);
    let started = Instant::now();
    let mut evaluations: u32 = 0;

    loop {
        evaluations += 1;
        trace!(evaluation = evaluations, "Evaluating condition");

        if condition.evaluate().await {
            let stats = PollStats {
                evaluations,
                elapsed: started.elapsed(),
            };
            debug!(
                evaluations = stats.evaluations,
                elapsed_ms = %stats.elapsed.as_millis(),
                "Condition satisfied"
            );
            return Ok(stats);
        }

        // a cancel or deadline that arrived during the evaluation ends the loop here
        if let Some(reason) = cancel.reason() {
            return Err(canceled(reason, evaluations));
        }

        tokio::select! {
            biased;
            reason = cancel.cancelled() => return Err(canceled(reason, evaluations)),
            _ = sleep(interval) => {}
        }
    }
}

fn effective_interval(interval: Duration) -> Duration {
    if interval < MIN_POLL_INTERVAL {
        warn!(
            interval_ms = %interval.as_millis(),
            min_ms = %MIN_POLL_INTERVAL.as_millis(),
            "Poll interval too small, clamping"
        );
        return MIN_POLL_INTERVAL;
    }
    interval
}

fn canceled(reason: CancelReason, evaluations: u32) -> PollError {
    debug!(evaluations, reason = %reason, "Poll canceled");
    PollError::Canceled(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cancel::cancel_channel;
    use crate::port::condition::{from_fn, MockCondition};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    const INTERVAL: Duration = Duration::from_millis(10);
    const TIMEOUT: Duration = Duration::from_millis(100);

    /// Condition that turns true on the `n`th evaluation (never if 0)
    fn true_on(n: u32) -> (Arc<AtomicU32>, impl Condition) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let condition = from_fn(move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            n != 0 && call >= n
        });
        (calls, condition)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediately_true_evaluates_once_without_waiting() {
        let mut condition = MockCondition::new();
        condition.expect_evaluate().times(1).returning(|| true);

        let started = Instant::now();
        let stats = assert_ok!(poll_with_timeout(&mut condition, INTERVAL, TIMEOUT).await);

        assert_eq!(stats.evaluations, 1);
        assert!(started.elapsed() < INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_true_times_out_within_bound() {
        let (calls, mut condition) = true_on(0);

        let err = assert_err!(poll_with_timeout(&mut condition, INTERVAL, TIMEOUT).await);

        assert_eq!(err, PollError::TimedOut);
        let n = calls.load(Ordering::SeqCst);
        let bound = (TIMEOUT.as_millis() / INTERVAL.as_millis()) as u32 + 2;
        assert!(n >= 1 && n <= bound, "{} evaluations, bound {}", n, bound);
        assert!(n > 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eventually_true_returns_early() {
        let (calls, mut condition) = true_on(3);

        let started = Instant::now();
        let stats = assert_ok!(poll_with_timeout(&mut condition, INTERVAL, TIMEOUT).await);

        assert_eq!(stats.evaluations, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // evaluations at 0, 10ms, 20ms
        let elapsed = started.elapsed();
        assert!(elapsed >= INTERVAL * 2 && elapsed < INTERVAL * 3, "{:?}", elapsed);
        assert!(stats.elapsed < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_evaluates_once() {
        let (calls, mut condition) = true_on(0);

        let err = assert_err!(poll_with_timeout(&mut condition, INTERVAL, Duration::ZERO).await);

        assert_eq!(err, PollError::TimedOut);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_longer_than_timeout_does_not_spin() {
        let (calls, mut condition) = true_on(0);

        let started = Instant::now();
        let err = assert_err!(
            poll_with_timeout(&mut condition, Duration::from_secs(10), Duration::from_secs(1)).await
        );

        assert_eq!(err, PollError::TimedOut);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_evaluation_overruns_deadline_without_trailing_eval() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut condition = crate::port::condition::from_async_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(80)).await;
                false
            }
        });

        let started = Instant::now();
        let err = assert_err!(poll_with_timeout(&mut condition, INTERVAL, TIMEOUT).await);

        assert_eq!(err, PollError::TimedOut);
        // 0..80 eval, sleep to 90, 90..170 eval, deadline already passed
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(170) && elapsed < Duration::from_millis(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_canceled_keeps_polling() {
        let (calls, mut condition) = true_on(0);
        let (source, token) = cancel_channel();

        let poll = poll_until_canceled(&mut condition, INTERVAL, &token);
        let stop = async {
            sleep(Duration::from_millis(195)).await;
            source.cancel(CancelReason::Requested("stop".into()));
        };
        let (result, _) = tokio::join!(poll, stop);

        assert_eq!(
            result,
            Err(PollError::Canceled(CancelReason::Requested("stop".into())))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_evaluating() {
        let (calls, mut condition) = true_on(0);
        let (source, token) = cancel_channel();

        let poll = poll_with_timeout_and_cancel(&mut condition, INTERVAL, TIMEOUT, &token);
        let stop = async {
            sleep(Duration::from_millis(25)).await;
            source.cancel(CancelReason::Interrupted);
        };
        let (result, _) = tokio::join!(poll, stop);

        assert_eq!(result, Err(PollError::Canceled(CancelReason::Interrupted)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        sleep(TIMEOUT).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wins_when_coinciding_with_deadline() {
        let (source, token) = cancel_channel();
        let source = &source;
        let mut condition = crate::port::condition::from_async_fn(move || async move {
            // both signals become due while this evaluation is in flight
            sleep(Duration::from_millis(150)).await;
            source.cancel(CancelReason::Requested("shutdown".into()));
            false
        });

        let result = poll_with_timeout_and_cancel(&mut condition, INTERVAL, TIMEOUT, &token).await;

        assert_eq!(
            result,
            Err(PollError::Canceled(CancelReason::Requested("shutdown".into())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_canceled_still_evaluates_first_tick() {
        let (source, token) = cancel_channel();
        source.cancel(CancelReason::Interrupted);
        let mut condition = MockCondition::new();
        condition.expect_evaluate().times(1).returning(|| false);

        let result = poll_until_canceled(&mut condition, INTERVAL, &token).await;

        assert_eq!(result, Err(PollError::Canceled(CancelReason::Interrupted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_does_not_overflow() {
        let mut condition = MockCondition::new();
        condition.expect_evaluate().times(1).returning(|| true);

        let stats = assert_ok!(poll_with_timeout(&mut condition, INTERVAL, Duration::MAX).await);
        assert_eq!(stats.evaluations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_still_honors_cancel() {
        let (calls, mut condition) = true_on(0);
        let (source, token) = cancel_channel();

        let poll = poll_with_timeout_and_cancel(&mut condition, INTERVAL, Duration::MAX, &token);
        let stop = async {
            sleep(Duration::from_secs(60)).await;
            source.cancel(CancelReason::Interrupted);
        };
        let (result, _) = tokio::join!(poll, stop);

        assert_eq!(result, Err(PollError::Canceled(CancelReason::Interrupted)));
        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_default_request() {
        assert_eq!(
            ConditionPoller::default().request(),
            PollRequest {
                interval: DEFAULT_INTERVAL,
                timeout: Some(DEFAULT_TIMEOUT),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_deadline_token_is_not_remapped() {
        let (calls, mut condition) = true_on(0);
        let token = CancelToken::never().with_deadline(Instant::now() + TIMEOUT);

        let result = poll_until_canceled(&mut condition, INTERVAL, &token).await;

        assert_eq!(result, Err(PollError::Canceled(CancelReason::DeadlineExceeded)));
        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let (calls, mut condition) = true_on(5);

        let started = Instant::now();
        let stats = assert_ok!(poll_with_timeout(&mut condition, Duration::ZERO, TIMEOUT).await);

        assert_eq!(stats.evaluations, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(started.elapsed() < INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_struct_dispatches_on_timeout() {
        let (_, mut never) = true_on(0);
        let (source, token) = cancel_channel();

        let bounded = ConditionPoller::new(INTERVAL).with_timeout(TIMEOUT);
        assert_eq!(bounded.request().timeout, Some(TIMEOUT));
        assert_eq!(bounded.poll(&mut never, &token).await, Err(PollError::TimedOut));

        let unbounded = ConditionPoller::new(INTERVAL);
        let poll = unbounded.poll(&mut never, &token);
        let stop = async {
            sleep(Duration::from_secs(1)).await;
            source.cancel(CancelReason::Interrupted);
        };
        let (result, _) = tokio::join!(poll, stop);
        assert_eq!(result, Err(PollError::Canceled(CancelReason::Interrupted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dyn_condition_is_accepted() {
        let (_, condition) = true_on(2);
        let mut boxed: Box<dyn Condition> = Box::new(condition);

        let stats = assert_ok!(poll_with_timeout(boxed.as_mut(), INTERVAL, TIMEOUT).await);

        assert_eq!(stats.evaluations, 2);
    }
}
