//! Shared helpers for end-to-end scenarios

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use waitfor_core::port::Condition;

/// Wraps a condition and counts its evaluations, whatever the outcome
pub struct Counted<C> {
    inner: C,
    count: Arc<AtomicU32>,
}

impl<C> Counted<C> {
    pub fn new(inner: C) -> (Self, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        (
            Self {
                inner,
                count: count.clone(),
            },
            count,
        )
    }
}

#[async_trait]
impl<C: Condition> Condition for Counted<C> {
    async fn evaluate(&mut self) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate().await
    }
}

/// A local TCP port nothing listens on (at the time of the call)
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
