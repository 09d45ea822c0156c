// Condition Port
// The only thing the poller knows about a check: evaluate it, get a bool back.
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// A zero-argument check evaluated once per poll tick
///
/// There is deliberately no error channel: a condition source that hits an
/// I/O failure reports `false` (and may log the failure to its sink), so a
/// transient connection refusal simply means "not yet".
///
/// Evaluations may have side effects (dialing, spawning a process) and are
/// re-run on every tick; implementations must not cache results.
///
/// # Example
/// ```text
/// let mut ready = from_fn(|| std::path::Path::new("/tmp/ready").exists());
/// poll_with_timeout(&mut ready, interval, timeout).await?;
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Condition: Send {
    /// Run the check once
    async fn evaluate(&mut self) -> bool;
}

#[async_trait]
impl<C> Condition for Box<C>
where
    C: Condition + ?Sized,
{
    async fn evaluate(&mut self) -> bool {
        (**self).evaluate().await
    }
}

/// Condition backed by a synchronous closure
pub struct FnCondition<F> {
    f: F,
}

/// Wrap a synchronous closure as a [`Condition`]
pub fn from_fn<F>(f: F) -> FnCondition<F>
where
    F: FnMut() -> bool + Send,
{
    FnCondition { f }
}

#[async_trait]
impl<F> Condition for FnCondition<F>
where
    F: FnMut() -> bool + Send,
{
    async fn evaluate(&mut self) -> bool {
        (self.f)()
    }
}

/// Condition backed by a closure returning a future
pub struct AsyncFnCondition<F, Fut> {
    f: F,
    // ties the future's lifetime to Self for the boxed async-trait future
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a [`Condition`]
///
/// # Example
/// ```text
/// let check = PortCheck::new(5432);
/// let mut open = from_async_fn(|| check.is_open());
/// ```
pub fn from_async_fn<F, Fut>(f: F) -> AsyncFnCondition<F, Fut>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    AsyncFnCondition {
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> Condition for AsyncFnCondition<F, Fut>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    async fn evaluate(&mut self) -> bool {
        (self.f)().await
    }
}

/// Logical negation of another condition
pub struct Not<C> {
    inner: C,
}

/// Wait for `condition` to become false instead of true
pub fn not<C: Condition>(condition: C) -> Not<C> {
    Not { inner: condition }
}

#[async_trait]
impl<C: Condition> Condition for Not<C> {
    async fn evaluate(&mut self) -> bool {
        !self.inner.evaluate().await
    }
}
