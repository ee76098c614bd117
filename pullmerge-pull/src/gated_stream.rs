// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::demand::DemandGate;
use futures::Stream;
use pin_project::pin_project;
use pullmerge_core::StreamItem;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Wraps a stream so that it is only polled while demand is outstanding.
///
/// Each delivered value consumes one unit of demand. The inner stream is never
/// polled ahead of demand, so once every requested value was delivered its end
/// (or an error) is only observed after the next request. The end of the inner
/// stream marks the producer completed so later requests become no-ops. A
/// closed subscription ends the gated stream without polling the inner one
/// again.
#[pin_project]
#[derive(Debug)]
pub struct DemandGated<S> {
    #[pin]
    inner: S,
    gate: DemandGate,
    finished: bool,
}

impl<S> DemandGated<S> {
    pub(crate) const fn new(inner: S, gate: DemandGate) -> Self {
        Self {
            inner,
            gate,
            finished: false,
        }
    }
}

impl<S, T> Stream for DemandGated<S>
where
    S: Stream<Item = StreamItem<T>>,
{
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        match this.gate.poll_demand(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(_closed)) => {
                *this.finished = true;
                return Poll::Ready(None);
            }
            Poll::Ready(Ok(())) => {}
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(StreamItem::Value(value))) => {
                this.gate.consume();
                Poll::Ready(Some(StreamItem::Value(value)))
            }
            Poll::Ready(Some(StreamItem::Error(error))) => {
                *this.finished = true;
                this.gate.close();
                Poll::Ready(Some(StreamItem::Error(error)))
            }
            Poll::Ready(None) => {
                *this.finished = true;
                this.gate.mark_completed();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
