// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Reordering hot sources while keeping one output per source.
//!
//! The enforcer runs the same selection loop as [`merge`](crate::merge), but
//! instead of a single merged stream it hands back one [`OrderedOutput`] per
//! input. Each item is released on the output of the source it came from, in
//! the global key order. Nothing is released before every source delivered
//! its first item or completed.

use crate::actor::{self, Downstream};
use crate::config::MergeConfig;
use crate::coordinator::Coordinator;
use crate::key_mapper::KeyMapper;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::Stream;
use pin_project::pin_project;
use pullmerge_core::{MergeError, MergeTask, Result, SourceIndex, StreamItem};
use pullmerge_pull::Source;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// The reordered output of one source.
///
/// Ends when its source is retired. If any source fails, the failing source's
/// output receives the error and every other output receives
/// `MergeError::SiblingFailed`. The enforcer keeps running while at least one
/// output is alive.
#[pin_project]
#[derive(Debug)]
pub struct OrderedOutput<T> {
    index: SourceIndex,
    #[pin]
    receiver: UnboundedReceiver<StreamItem<T>>,
    task: Arc<MergeTask>,
}

impl<T> OrderedOutput<T> {
    /// Registration index of the source this output belongs to.
    #[must_use]
    pub const fn source_index(&self) -> SourceIndex {
        self.index
    }

    /// Stop the enforcer; every output then ends.
    pub fn cancel(&self) {
        self.task.cancel();
    }
}

impl<T> Stream for OrderedOutput<T> {
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().receiver.poll_next(cx)
    }
}

struct PerSourceOutputs<T> {
    senders: Vec<UnboundedSender<StreamItem<T>>>,
}

impl<T: Send + 'static> Downstream<T> for PerSourceOutputs<T> {
    fn emit(&mut self, source: SourceIndex, item: T) {
        let _ = self.senders[source].unbounded_send(StreamItem::Value(item));
    }

    fn source_completed(&mut self, source: SourceIndex) {
        debug!("ordering enforcer: closing output {source}");
        self.senders[source].close_channel();
    }

    fn completed(&mut self) {
        for sender in &self.senders {
            sender.close_channel();
        }
    }

    fn failed(&mut self, error: MergeError) {
        match error.source_index() {
            Some(origin) if origin < self.senders.len() => {
                for (index, sender) in self.senders.iter().enumerate() {
                    if index != origin {
                        let _ = sender.unbounded_send(StreamItem::Error(
                            MergeError::SiblingFailed { index: origin },
                        ));
                    }
                }
                let _ = self.senders[origin].unbounded_send(StreamItem::Error(error));
            }
            _ => {
                for sender in &self.senders {
                    let _ = sender.unbounded_send(StreamItem::Error(error.clone()));
                }
            }
        }
        self.completed();
    }
}

/// Reorder `sources` by `key_mapper`, returning one output per source in
/// registration order.
///
/// # Errors
/// Returns `MergeError::InvalidLookahead` if `lookahead` is zero.
pub fn enforce_ordering<T, K, S, F>(
    sources: Vec<S>,
    key_mapper: F,
    lookahead: usize,
) -> Result<Vec<OrderedOutput<T>>>
where
    T: Send + 'static,
    K: Ord + Clone + Send + 'static,
    S: Source<T>,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    enforce_ordering_with_config(sources, key_mapper, MergeConfig::new(lookahead))
}

/// [`enforce_ordering`] with a full [`MergeConfig`].
///
/// # Errors
/// Returns `MergeError::InvalidLookahead` if the configured lookahead is zero.
pub fn enforce_ordering_with_config<T, K, S, F>(
    sources: Vec<S>,
    key_mapper: F,
    config: MergeConfig,
) -> Result<Vec<OrderedOutput<T>>>
where
    T: Send + 'static,
    K: Ord + Clone + Send + 'static,
    S: Source<T>,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    let coordinator = Coordinator::new(sources.len(), &config)?;
    let (senders, receivers): (Vec<_>, Vec<_>) = (0..sources.len()).map(|_| mpsc::unbounded()).unzip();

    let task = Arc::new(MergeTask::spawn(actor::run(
        sources,
        KeyMapper::new(key_mapper),
        coordinator,
        PerSourceOutputs { senders },
    )));

    Ok(receivers
        .into_iter()
        .enumerate()
        .map(|(index, receiver)| OrderedOutput {
            index,
            receiver,
            task: task.clone(),
        })
        .collect())
}
