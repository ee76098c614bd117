// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stream wrappers that inject `StreamItem::Error` values for failure tests.

use futures::Stream;
use pullmerge_core::{MergeError, StreamItem};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Wraps plain values in `StreamItem::Value` and emits an error at a fixed position.
///
/// ```rust
/// use pullmerge_core::StreamItem;
/// use pullmerge_test_utils::ErrorInjectingStream;
/// use futures::{stream, StreamExt};
///
/// # async fn example() {
/// let mut items = ErrorInjectingStream::new(stream::iter(vec![1, 2]), 1);
///
/// assert!(matches!(items.next().await, Some(StreamItem::Value(1))));
/// assert!(matches!(items.next().await, Some(StreamItem::Error(_))));
/// # }
/// ```
#[derive(Debug)]
pub struct ErrorInjectingStream<S> {
    inner: S,
    inject_error_at: Option<usize>,
    count: usize,
}

impl<S> ErrorInjectingStream<S> {
    /// `inject_error_at` is the 0-based position of the error among emitted items.
    pub const fn new(inner: S, inject_error_at: usize) -> Self {
        Self {
            inner,
            inject_error_at: Some(inject_error_at),
            count: 0,
        }
    }
}

impl<S> Stream for ErrorInjectingStream<S>
where
    S: Stream + Unpin,
{
    type Item = StreamItem<S::Item>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.inject_error_at == Some(self.count) {
            self.inject_error_at = None;
            self.count += 1;
            return Poll::Ready(Some(StreamItem::Error(MergeError::stream_error(
                "Injected test error",
            ))));
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => {
                self.count += 1;
                Poll::Ready(Some(StreamItem::Value(item)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
