// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug, Default)]
struct ProbeState {
    polls: AtomicUsize,
    yielded: AtomicUsize,
    dropped: AtomicBool,
}

/// Observer side of a [`ProbedStream`].
#[derive(Debug, Clone, Default)]
pub struct Probe {
    state: Arc<ProbeState>,
}

impl Probe {
    /// How many times the wrapped stream was polled.
    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// How many items the wrapped stream produced.
    pub fn yielded(&self) -> usize {
        self.state.yielded.load(Ordering::SeqCst)
    }

    /// Whether the wrapped stream has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.state.dropped.load(Ordering::SeqCst)
    }
}

/// A stream wrapper that records polls, yielded items and its own disposal.
#[derive(Debug)]
pub struct ProbedStream<S> {
    inner: S,
    probe: Probe,
}

/// Wrap `inner` and return it with its [`Probe`].
pub fn probed<S>(inner: S) -> (ProbedStream<S>, Probe) {
    let probe = Probe::default();
    (
        ProbedStream {
            inner,
            probe: probe.clone(),
        },
        probe,
    )
}

impl<S> Stream for ProbedStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.probe.state.polls.fetch_add(1, Ordering::SeqCst);
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(_)) = &polled {
            self.probe.state.yielded.fetch_add(1, Ordering::SeqCst);
        }
        polled
    }
}

impl<S> Drop for ProbedStream<S> {
    fn drop(&mut self) {
        self.probe.state.dropped.store(true, Ordering::SeqCst);
    }
}
