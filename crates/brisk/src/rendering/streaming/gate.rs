use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::RenderError;

use super::types::RegionId;

pub type GateFuture = BoxFuture<'static, Settlement>;

/// A gate's outcome, stamped with the order in which it completed.
#[derive(Debug)]
pub struct Settlement {
    pub sequence: u64,
    pub result: Result<(), RenderError>,
}

/// Hands out settlement stamps. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct SettlementClock {
    next: Arc<AtomicU64>,
}

impl SettlementClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Stamps the result of `future` on the task that completes it.
    pub fn stamp<F>(&self, future: F) -> impl Future<Output = Settlement> + Send + 'static
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        let clock = self.clone();
        async move {
            let result = future.await;
            Settlement { sequence: clock.tick(), result }
        }
    }
}

/// Pending computation whose settlement releases a region's buffer.
pub struct Gate {
    pub id: RegionId,
    future: GateFuture,
}

impl Gate {
    /// A gate driven by whoever polls it.
    pub fn inline<F>(id: RegionId, clock: &SettlementClock, future: F) -> Self
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        Self { id, future: Box::pin(clock.stamp(future)) }
    }

    /// A gate running on its own task from the moment it is created.
    pub fn spawned<F>(id: RegionId, clock: &SettlementClock, future: F) -> Self
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        let task = SpawnedGate::spawn(clock.stamp(future));
        let clock = clock.clone();
        let future = async move {
            match task.await {
                Ok(settlement) => settlement,
                Err(e) => Settlement { sequence: clock.tick(), result: Err(e) },
            }
        };
        Self { id, future: Box::pin(future) }
    }

    pub fn poll_settled(&mut self, cx: &mut Context<'_>) -> Poll<Settlement> {
        self.future.as_mut().poll(cx)
    }
}

/// A future running as its own tokio task. Dropping it aborts the task.
pub struct SpawnedGate<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> SpawnedGate<T> {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self { handle: tokio::spawn(future) }
    }
}

impl<T> Future for SpawnedGate<T> {
    type Output = Result<T, RenderError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(RenderError::TaskAborted(e.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for SpawnedGate<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn with_timeout<F>(id: RegionId, limit: Duration, future: F) -> Result<(), RenderError>
where
    F: Future<Output = Result<(), RenderError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::RegionTimeout(id, limit.as_millis() as u64)),
    }
}
