// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The two-phase source contract.
//!
//! Subscribing to a [`Source`] yields a [`Subscription`]: a [`DemandHandle`] the
//! consumer uses to request items, plus the stream those items arrive on. The
//! handle exists before any item is delivered, so the consumer can keep it
//! around and issue requests from outside the delivery path.

use crate::demand::{demand_pair, DemandHandle};
use crate::gated_stream::DemandGated;
use crate::pull_controller::PushSource;
use futures::stream::{Flatten, StreamExt};
use futures::Stream;
use pullmerge_core::StreamItem;
use std::fmt;
use std::pin::Pin;

/// Boxed, type-erased item stream of a subscription.
pub type BoxItemStream<T> = Pin<Box<dyn Stream<Item = StreamItem<T>> + Send + 'static>>;

/// A live subscription: request demand through [`demand`](Self::demand), receive
/// items from the stream.
pub struct Subscription<T> {
    demand: DemandHandle,
    items: BoxItemStream<T>,
}

impl<T> Subscription<T> {
    pub fn new<S>(demand: DemandHandle, items: S) -> Self
    where
        S: Stream<Item = StreamItem<T>> + Send + 'static,
    {
        Self {
            demand,
            items: Box::pin(items),
        }
    }

    #[must_use]
    pub const fn demand(&self) -> &DemandHandle {
        &self.demand
    }

    #[must_use]
    pub fn into_parts(self) -> (DemandHandle, BoxItemStream<T>) {
        (self.demand, self.items)
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("demand", &self.demand)
            .finish_non_exhaustive()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = StreamItem<T>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.items.as_mut().poll_next(cx)
    }
}

/// A demand-driven producer of `StreamItem<T>`.
///
/// Subscribing consumes the source; a source delivers at most as many values
/// as were requested through the subscription's [`DemandHandle`].
pub trait Source<T>: Send + 'static {
    fn subscribe(self) -> Subscription<T>;
}

impl<T: Send + 'static> Source<T> for Subscription<T> {
    fn subscribe(self) -> Subscription<T> {
        self
    }
}

impl<T: Send + 'static> Source<T> for PushSource<T> {
    fn subscribe(self) -> Subscription<T> {
        let (demand, stream) = self.into_parts();
        Subscription::new(demand, stream)
    }
}

/// Adapts any stream of `StreamItem<T>` into a demand-gated [`Source`].
#[derive(Debug)]
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> StreamSource<Flatten<S>>
where
    S: Stream,
    S::Item: Stream,
{
    /// A source whose items come from a stream of inner streams, each inner
    /// stream drained to completion before the next one starts.
    pub fn flattened(outer: S) -> Self {
        Self::new(outer.flatten())
    }
}

impl<S, T> Source<T> for StreamSource<S>
where
    S: Stream<Item = StreamItem<T>> + Send + 'static,
    T: Send + 'static,
{
    fn subscribe(self) -> Subscription<T> {
        let (demand, gate) = demand_pair();
        Subscription::new(demand, DemandGated::new(self.inner, gate))
    }
}

/// Extension trait turning streams of `StreamItem<T>` into sources.
pub trait SourceExt<T>: Stream<Item = StreamItem<T>> + Sized {
    fn into_source(self) -> StreamSource<Self> {
        StreamSource::new(self)
    }
}

impl<S, T> SourceExt<T> for S where S: Stream<Item = StreamItem<T>> + Sized {}
