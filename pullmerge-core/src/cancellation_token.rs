// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Runtime-agnostic cancellation token.
//!
//! Disposing a merge cancels one token; every task spawned for that merge
//! (the coordinator and one pump per source) races its work against
//! [`CancellationToken::cancelled`] and stops at the next wake-up.

use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use event_listener::{Event, EventListener};
use std::sync::Arc;

/// Cloneable handle to a shared cancellation flag.
///
/// # Example
///
/// ```
/// use pullmerge_core::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
///
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    event: Event,
}

impl CancellationToken {
    /// Create a new, not yet cancelled, token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                event: Event::new(),
            }),
        }
    }

    /// Cancel the token, waking every waiter. Idempotent.
    pub fn cancel(&self) {
        // Release pairs with the Acquire in is_cancelled
        if !self.inner.cancelled.swap(true, Ordering::Release) {
            self.inner.event.notify(usize::MAX);
        }
    }

    /// Check whether the token has been cancelled (non-blocking).
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token is cancelled; immediately if it already is.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled {
            token: self,
            listener: None,
        }
    }

    /// Returns a guard that cancels this token when dropped.
    #[must_use]
    pub fn drop_guard(self) -> DropGuard {
        DropGuard { token: self }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`CancellationToken::cancelled()`].
pub struct Cancelled<'a> {
    token: &'a CancellationToken,
    listener: Option<EventListener>,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            if self.token.is_cancelled() {
                return Poll::Ready(());
            }

            match self.listener.as_mut() {
                None => {
                    // Re-check after registering: cancel() may have run in between
                    self.listener = Some(self.token.inner.event.listen());
                }
                Some(listener) => match Pin::new(listener).poll(cx) {
                    Poll::Ready(()) => self.listener = None,
                    Poll::Pending => return Poll::Pending,
                },
            }
        }
    }
}

/// Cancels its token on drop.
#[derive(Debug)]
pub struct DropGuard {
    token: CancellationToken,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
