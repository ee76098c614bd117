// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The coordinator task.
//!
//! Every source is pumped by its own task that forwards items, completion and
//! errors to a single mailbox. One worker loop owns the [`Coordinator`] and
//! handles the mailbox one event at a time, so tracker state is never shared.

use crate::coordinator::{Coordinator, Emission};
use crate::key_mapper::KeyMapper;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use pullmerge_core::{MergeError, MergeTask, Result, SourceIndex, StreamItem};
use pullmerge_pull::{BoxItemStream, DemandHandle, Source};

/// Events sent by source pumps to the coordinator.
#[derive(Debug)]
pub(crate) enum SourceEvent<T> {
    Item(SourceIndex, T),
    Completed(SourceIndex),
    Failed(SourceIndex, MergeError),
}

/// Where the coordinator delivers its output.
pub(crate) trait Downstream<T>: Send + 'static {
    fn emit(&mut self, source: SourceIndex, item: T);

    fn source_completed(&mut self, source: SourceIndex);

    fn completed(&mut self);

    fn failed(&mut self, error: MergeError);
}

struct Actor<K, T, D> {
    coordinator: Coordinator<K, T>,
    key_mapper: KeyMapper<T, K>,
    demands: Vec<DemandHandle>,
    downstream: D,
    _pumps: Vec<MergeTask>,
}

/// Subscribe to every source and run the merge until it completes, fails or
/// is cancelled.
pub(crate) async fn run<T, K, S, D>(
    sources: Vec<S>,
    key_mapper: KeyMapper<T, K>,
    coordinator: Coordinator<K, T>,
    downstream: D,
) where
    T: Send + 'static,
    K: Ord + Clone + Send + 'static,
    S: Source<T>,
    D: Downstream<T>,
{
    let (mailbox, mut events) = mpsc::unbounded();
    let mut demands = Vec::with_capacity(sources.len());
    let mut pumps = Vec::with_capacity(sources.len());

    for (index, source) in sources.into_iter().enumerate() {
        let (demand, items) = source.subscribe().into_parts();
        demands.push(demand);
        pumps.push(MergeTask::spawn(pump(index, items, mailbox.clone())));
    }
    drop(mailbox);

    debug!("keyed merge: subscribed to {} sources", demands.len());
    let mut actor = Actor {
        coordinator,
        key_mapper,
        demands,
        downstream,
        _pumps: pumps,
    };

    if !actor.start() {
        return;
    }
    while let Some(event) = events.next().await {
        if !actor.handle(event) {
            return;
        }
    }
    warn!("keyed merge: every source pump stopped before the merge finished");
}

async fn pump<T>(
    index: SourceIndex,
    mut items: BoxItemStream<T>,
    mailbox: UnboundedSender<SourceEvent<T>>,
) {
    while let Some(item) = items.next().await {
        let (event, last) = match item {
            StreamItem::Value(value) => (SourceEvent::Item(index, value), false),
            StreamItem::Error(error) => (SourceEvent::Failed(index, error), true),
        };
        if mailbox.unbounded_send(event).is_err() || last {
            return;
        }
    }
    let _ = mailbox.unbounded_send(SourceEvent::Completed(index));
}

impl<K, T, D> Actor<K, T, D>
where
    K: Ord + Clone,
    D: Downstream<T>,
{
    /// Issue the initial demand. Returns `false` if the merge already finished.
    fn start(&mut self) -> bool {
        for (index, amount) in self.coordinator.initial_requests() {
            self.demands[index].request(amount);
        }
        self.reconcile()
    }

    /// Apply one event. Returns `false` once the merge is over.
    fn handle(&mut self, event: SourceEvent<T>) -> bool {
        if let Err(error) = self.apply(event) {
            self.fail(error);
            return false;
        }
        self.reconcile()
    }

    fn apply(&mut self, event: SourceEvent<T>) -> Result<()> {
        match event {
            SourceEvent::Item(index, item) => {
                let key = self.key_mapper.key_of(index, &item)?;
                self.coordinator.on_item(index, key, item)
            }
            SourceEvent::Completed(index) => self.coordinator.on_completed(index),
            SourceEvent::Failed(index, error) => Err(MergeError::from_source(index, error)),
        }
    }

    fn reconcile(&mut self) -> bool {
        let tick = self.coordinator.process_reads();

        for emission in tick.emissions {
            match emission {
                Emission::Item { source, item } => self.downstream.emit(source, item),
                Emission::SourceCompleted { source } => self.downstream.source_completed(source),
                Emission::Completed => {
                    debug!("keyed merge: completed");
                    self.downstream.completed();
                }
            }
        }
        for (index, amount) in tick.refills {
            self.demands[index].request(amount);
        }

        !self.coordinator.state().is_terminal()
    }

    fn fail(&mut self, failure: MergeError) {
        error!("keyed merge: {failure}, tearing down every source");
        self.coordinator.fail();
        self.downstream.failed(failure);
        self.close_sources();
    }
}

impl<K, T, D> Actor<K, T, D> {
    fn close_sources(&self) {
        for demand in &self.demands {
            demand.close();
        }
    }
}

impl<K, T, D> Drop for Actor<K, T, D> {
    fn drop(&mut self) {
        self.close_sources();
    }
}
