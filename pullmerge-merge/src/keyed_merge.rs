// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Merging several sources into one key-ordered stream.
//!
//! ```
//! use futures::{stream, StreamExt};
//! use pullmerge_core::StreamItem;
//! use pullmerge_merge::merge;
//! use pullmerge_pull::SourceExt;
//!
//! # #[tokio::main]
//! # async fn main() -> pullmerge_core::Result<()> {
//! let a = stream::iter(vec![(1, "a1"), (3, "a2")].into_iter().map(StreamItem::Value));
//! let b = stream::iter(vec![(2, "b1"), (4, "b2")].into_iter().map(StreamItem::Value));
//!
//! let merged = merge(vec![a.into_source(), b.into_source()], |(key, _): &(i32, &str)| *key, 1)?;
//! let labels: Vec<_> = merged.map(|item| item.unwrap().1).collect().await;
//!
//! assert_eq!(labels, vec!["a1", "b1", "a2", "b2"]);
//! # Ok(())
//! # }
//! ```

use crate::actor::{self, Downstream};
use crate::config::MergeConfig;
use crate::coordinator::Coordinator;
use crate::key_mapper::KeyMapper;
use crate::ordering_enforcer::{self, OrderedOutput};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::Stream;
use pin_project::pin_project;
use pullmerge_core::{MergeError, MergeTask, Result, SourceIndex, StreamItem};
use pullmerge_pull::Source;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The merged output of several sources, in non-decreasing key order within
/// the limits of the lookahead window.
///
/// Ends once every source completed and every buffer drained. The first
/// failure is delivered as the last item. Dropping the stream tears every
/// source subscription down.
#[pin_project]
#[derive(Debug)]
pub struct KeyedMerge<T> {
    #[pin]
    receiver: UnboundedReceiver<StreamItem<T>>,
    task: MergeTask,
}

impl<T: Send + 'static> KeyedMerge<T> {
    fn spawn<K, S>(sources: Vec<S>, key_mapper: KeyMapper<T, K>, config: &MergeConfig) -> Result<Self>
    where
        K: Ord + Clone + Send + 'static,
        S: Source<T>,
    {
        let coordinator = Coordinator::new(sources.len(), config)?;
        let (sender, receiver) = mpsc::unbounded();
        let task = MergeTask::spawn(actor::run(
            sources,
            key_mapper,
            coordinator,
            MergedOutput { sender },
        ));
        Ok(Self { receiver, task })
    }
}

impl<T> KeyedMerge<T> {
    /// Stop the merge and tear every source down. The stream then ends.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }
}

impl<T> Stream for KeyedMerge<T> {
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().receiver.poll_next(cx)
    }
}

struct MergedOutput<T> {
    sender: UnboundedSender<StreamItem<T>>,
}

impl<T: Send + 'static> Downstream<T> for MergedOutput<T> {
    fn emit(&mut self, _source: SourceIndex, item: T) {
        let _ = self.sender.unbounded_send(StreamItem::Value(item));
    }

    fn source_completed(&mut self, source: SourceIndex) {
        debug!("keyed merge: source {source} drained");
    }

    fn completed(&mut self) {
        self.sender.close_channel();
    }

    fn failed(&mut self, error: MergeError) {
        let _ = self.sender.unbounded_send(StreamItem::Error(error));
        self.sender.close_channel();
    }
}

/// Merge `sources` into one stream ordered by `key_mapper`, buffering up to
/// `lookahead` items per source.
///
/// # Errors
/// Returns `MergeError::InvalidLookahead` if `lookahead` is zero.
pub fn merge<T, K, S, F>(sources: Vec<S>, key_mapper: F, lookahead: usize) -> Result<KeyedMerge<T>>
where
    T: Send + 'static,
    K: Ord + Clone + Send + 'static,
    S: Source<T>,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    merge_with_config(sources, key_mapper, MergeConfig::new(lookahead))
}

/// [`merge`] with a full [`MergeConfig`].
///
/// # Errors
/// Returns `MergeError::InvalidLookahead` if the configured lookahead is zero.
pub fn merge_with_config<T, K, S, F>(
    sources: Vec<S>,
    key_mapper: F,
    config: MergeConfig,
) -> Result<KeyedMerge<T>>
where
    T: Send + 'static,
    K: Ord + Clone + Send + 'static,
    S: Source<T>,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    KeyedMerge::spawn(sources, KeyMapper::new(key_mapper), &config)
}

/// [`merge`] with a fallible key mapper. A key mapper failure terminates the
/// merge with `MergeError::KeyMapper`, attributed to the item's source.
///
/// # Errors
/// Returns `MergeError::InvalidLookahead` if `lookahead` is zero.
pub fn try_merge<T, K, S, F, E>(
    sources: Vec<S>,
    key_mapper: F,
    lookahead: usize,
) -> Result<KeyedMerge<T>>
where
    T: Send + 'static,
    K: Ord + Clone + Send + 'static,
    S: Source<T>,
    F: Fn(&T) -> core::result::Result<K, E> + Send + Sync + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    KeyedMerge::spawn(
        sources,
        KeyMapper::fallible(key_mapper),
        &MergeConfig::new(lookahead),
    )
}

/// Extension trait for merging a vector of sources by key.
pub trait KeyedMergeExt<T> {
    /// See [`merge`].
    ///
    /// # Errors
    /// Returns `MergeError::InvalidLookahead` if `lookahead` is zero.
    fn keyed_merge<K, F>(self, key_mapper: F, lookahead: usize) -> Result<KeyedMerge<T>>
    where
        K: Ord + Clone + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static;

    /// See [`enforce_ordering`](crate::enforce_ordering).
    ///
    /// # Errors
    /// Returns `MergeError::InvalidLookahead` if `lookahead` is zero.
    fn enforce_ordering<K, F>(self, key_mapper: F, lookahead: usize) -> Result<Vec<OrderedOutput<T>>>
    where
        K: Ord + Clone + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static;
}

impl<T, S> KeyedMergeExt<T> for Vec<S>
where
    T: Send + 'static,
    S: Source<T>,
{
    fn keyed_merge<K, F>(self, key_mapper: F, lookahead: usize) -> Result<KeyedMerge<T>>
    where
        K: Ord + Clone + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        merge(self, key_mapper, lookahead)
    }

    fn enforce_ordering<K, F>(self, key_mapper: F, lookahead: usize) -> Result<Vec<OrderedOutput<T>>>
    where
        K: Ord + Clone + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        ordering_enforcer::enforce_ordering(self, key_mapper, lookahead)
    }
}
