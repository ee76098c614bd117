// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Outstanding-demand accounting shared between a consumer and a producer.
//!
//! The consumer side holds a [`DemandHandle`] and asks for more items with
//! [`request`](DemandHandle::request). The producer side holds a
//! [`DemandGate`]: it may only hand out one item per unit of outstanding demand
//! and pauses (without spinning) while the counter is zero.

use event_listener::{Event, EventListener};
use parking_lot::Mutex;
use pullmerge_core::{MergeError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug, Default)]
struct DemandCounter {
    outstanding: usize,
    completed: bool,
    closed: bool,
}

#[derive(Debug, Default)]
struct DemandState {
    counter: Mutex<DemandCounter>,
    changed: Event,
}

/// Outcome of trying to take one unit of demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// One unit was consumed; the item may be delivered.
    Granted,
    /// No outstanding demand; delivering now violates the protocol.
    Exhausted,
    /// The subscription was torn down or the producer already completed.
    Closed,
}

/// Consumer-side handle used to request items from a producer.
#[derive(Debug, Clone)]
pub struct DemandHandle {
    state: Arc<DemandState>,
}

/// Producer-side view of the same demand counter.
#[derive(Debug)]
pub struct DemandGate {
    state: Arc<DemandState>,
    listener: Option<EventListener>,
}

/// Create a connected handle/gate pair with no outstanding demand.
#[must_use]
pub fn demand_pair() -> (DemandHandle, DemandGate) {
    let state = Arc::new(DemandState::default());
    (
        DemandHandle {
            state: state.clone(),
        },
        DemandGate {
            state,
            listener: None,
        },
    )
}

impl DemandHandle {
    /// Ask the producer for `n` more items.
    ///
    /// A no-op once the producer completed or the subscription was closed.
    pub fn request(&self, n: usize) {
        if n == 0 {
            return;
        }
        {
            let mut counter = self.state.counter.lock();
            if counter.completed || counter.closed {
                debug!("ignoring request({n}) on a finished producer");
                return;
            }
            counter.outstanding = counter.outstanding.saturating_add(n);
        }
        self.state.changed.notify(usize::MAX);
    }

    /// Demand requested but not yet delivered.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.counter.lock().outstanding
    }

    /// Tear the subscription down: the producer observes `Closed` from now on.
    pub fn close(&self) {
        close(&self.state);
    }

    /// Returns `true` once [`close`](Self::close) was called on either side.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.counter.lock().closed
    }

    /// Returns `true` once the producer reported completion.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.counter.lock().completed
    }
}

impl DemandGate {
    /// Take one unit of demand if any is outstanding.
    pub fn try_acquire(&self) -> Acquire {
        let mut counter = self.state.counter.lock();
        if counter.closed || counter.completed {
            Acquire::Closed
        } else if counter.outstanding == 0 {
            Acquire::Exhausted
        } else {
            counter.outstanding -= 1;
            Acquire::Granted
        }
    }

    /// A fresh producer-side view of the same counter.
    pub(crate) fn view(&self) -> Self {
        Self {
            state: self.state.clone(),
            listener: None,
        }
    }

    /// Take one unit of demand after an item was delivered through a gated poll.
    pub(crate) fn consume(&self) {
        let mut counter = self.state.counter.lock();
        counter.outstanding = counter.outstanding.saturating_sub(1);
    }

    /// Poll until demand is outstanding, without consuming it.
    ///
    /// Resolves to `Err(MergeError::SourceClosed)` once the subscription is closed
    /// or the producer completed.
    pub fn poll_demand(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        loop {
            {
                let counter = self.state.counter.lock();
                if counter.closed || counter.completed {
                    self.listener = None;
                    return Poll::Ready(Err(MergeError::SourceClosed));
                }
                if counter.outstanding > 0 {
                    self.listener = None;
                    return Poll::Ready(Ok(()));
                }
            }

            match self.listener.as_mut() {
                // Registered before re-checking, so a concurrent request() is not lost
                None => self.listener = Some(self.state.changed.listen()),
                Some(listener) => match Pin::new(listener).poll(cx) {
                    Poll::Ready(()) => self.listener = None,
                    Poll::Pending => return Poll::Pending,
                },
            }
        }
    }

    /// Wait until demand is outstanding.
    ///
    /// # Errors
    /// Returns `MergeError::SourceClosed` if the subscription is torn down first.
    pub async fn ready(&mut self) -> Result<()> {
        futures::future::poll_fn(|cx| self.poll_demand(cx)).await
    }

    /// Wait until the subscription is torn down.
    pub async fn closed(&self) {
        loop {
            let listener = self.state.changed.listen();
            if self.is_closed() {
                return;
            }
            listener.await;
        }
    }

    /// Record that the producer will not deliver anything else.
    pub fn mark_completed(&self) {
        {
            let mut counter = self.state.counter.lock();
            counter.completed = true;
            counter.outstanding = 0;
        }
        self.state.changed.notify(usize::MAX);
    }

    /// Tear the subscription down from the producer side.
    pub fn close(&self) {
        close(&self.state);
    }

    /// Returns `true` once the subscription was torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.counter.lock().closed
    }

    /// Returns `true` once the producer completed or the subscription was torn down.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let counter = self.state.counter.lock();
        counter.closed || counter.completed
    }

    /// Demand requested but not yet delivered.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.counter.lock().outstanding
    }
}

fn close(state: &DemandState) {
    {
        let mut counter = state.counter.lock();
        if counter.closed {
            return;
        }
        counter.closed = true;
        counter.outstanding = 0;
    }
    state.changed.notify(usize::MAX);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accumulates_and_acquire_consumes() {
        let (handle, gate) = demand_pair();
        assert_eq!(gate.try_acquire(), Acquire::Exhausted);

        handle.request(2);
        assert_eq!(handle.outstanding(), 2);
        assert_eq!(gate.try_acquire(), Acquire::Granted);
        assert_eq!(gate.try_acquire(), Acquire::Granted);
        assert_eq!(gate.try_acquire(), Acquire::Exhausted);
    }

    #[test]
    fn test_request_after_completion_is_noop() {
        let (handle, gate) = demand_pair();
        gate.mark_completed();

        handle.request(5);

        assert_eq!(handle.outstanding(), 0);
        assert!(handle.is_completed());
        assert_eq!(gate.try_acquire(), Acquire::Closed);
    }

    #[test]
    fn test_request_zero_is_noop() {
        let (handle, _gate) = demand_pair();
        handle.request(0);
        assert_eq!(handle.outstanding(), 0);
    }

    #[test]
    fn test_close_discards_outstanding_demand() {
        let (handle, gate) = demand_pair();
        handle.request(3);

        handle.close();

        assert!(gate.is_closed());
        assert_eq!(gate.outstanding(), 0);
        assert_eq!(gate.try_acquire(), Acquire::Closed);
        handle.request(1);
        assert_eq!(handle.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_ready_waits_for_request() {
        let (handle, mut gate) = demand_pair();

        let waiter = tokio::spawn(async move {
            gate.ready().await.map(|()| gate.outstanding())
        });
        tokio::task::yield_now().await;
        handle.request(1);

        let outstanding = waiter.await.expect("waiter should not panic");
        assert_eq!(outstanding.expect("demand should be granted"), 1);
    }

    #[tokio::test]
    async fn test_ready_fails_once_closed() {
        let (handle, mut gate) = demand_pair();

        let waiter = tokio::spawn(async move { gate.ready().await });
        tokio::task::yield_now().await;
        handle.close();

        let result = waiter.await.expect("waiter should not panic");
        assert!(matches!(result, Err(MergeError::SourceClosed)));
    }
}
