// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Extension methods for tokio `UnboundedReceiver` to create merge sources.

use futures::stream::{Map, StreamExt};
use pullmerge_core::StreamItem;
use pullmerge_pull::StreamSource;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Source built from a tokio unbounded channel.
pub type ReceiverSource<T> =
    StreamSource<Map<UnboundedReceiverStream<T>, fn(T) -> StreamItem<T>>>;

/// Extension trait turning a tokio `UnboundedReceiver` into a [`Source`](pullmerge_pull::Source).
pub trait UnboundedReceiverExt<T> {
    /// Wrap the receiver as a demand-gated source.
    ///
    /// Senders keep pushing into the channel; the merge only reads as much as
    /// it requested, so unread items wait in the channel. The source completes
    /// once every sender is dropped.
    ///
    /// ```rust
    /// use pullmerge::prelude::*;
    /// use tokio::sync::mpsc;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> pullmerge::Result<()> {
    /// let (tx, rx) = mpsc::unbounded_channel::<u32>();
    /// tx.send(2).unwrap();
    /// tx.send(7).unwrap();
    /// drop(tx);
    ///
    /// let merged = merge(vec![rx.into_source()], |value: &u32| *value, 1)?;
    /// let values: Vec<_> = merged.map(|item| item.unwrap()).collect().await;
    /// assert_eq!(values, vec![2, 7]);
    /// # Ok(())
    /// # }
    /// ```
    fn into_source(self) -> ReceiverSource<T>;
}

impl<T: Send + 'static> UnboundedReceiverExt<T> for mpsc::UnboundedReceiver<T> {
    fn into_source(self) -> ReceiverSource<T> {
        StreamSource::new(
            UnboundedReceiverStream::new(self).map(StreamItem::Value as fn(T) -> StreamItem<T>),
        )
    }
}
