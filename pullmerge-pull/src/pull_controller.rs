// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Push-style producers made demand-driven.
//!
//! [`push_source`] splits a source into a [`PullController`] for the producer
//! and a [`PushSource`] for the consumer. The producer may push one item per
//! unit of requested demand; pushing with zero demand is a protocol violation
//! that tears the source down.
//!
//! ```
//! use pullmerge_pull::{push_source, Source};
//! use pullmerge_core::MergeError;
//!
//! let (controller, source) = push_source::<u32>();
//! let subscription = source.subscribe();
//!
//! subscription.demand().request(1);
//! assert!(controller.emit(1).is_ok());
//!
//! // No demand left: the push is rejected and the source is torn down
//! assert!(matches!(controller.emit(2), Err(MergeError::DemandExceeded)));
//! assert!(controller.is_closed());
//! ```

use crate::demand::{demand_pair, Acquire, DemandGate, DemandHandle};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::Stream;
use pullmerge_core::{MergeError, Result, StreamItem};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Producer half of a push source.
///
/// Cheap to clone; every clone pushes into the same source and draws from the
/// same demand counter.
#[derive(Debug)]
pub struct PullController<T> {
    gate: Arc<DemandGate>,
    sender: UnboundedSender<StreamItem<T>>,
}

/// Consumer half of a push source; subscribe to it through [`Source`](crate::Source).
#[derive(Debug)]
pub struct PushSource<T> {
    demand: DemandHandle,
    receiver: UnboundedReceiver<StreamItem<T>>,
}

/// Create a connected controller/source pair.
#[must_use]
pub fn push_source<T>() -> (PullController<T>, PushSource<T>) {
    let (demand, gate) = demand_pair();
    let (sender, receiver) = mpsc::unbounded();
    (
        PullController {
            gate: Arc::new(gate),
            sender,
        },
        PushSource { demand, receiver },
    )
}

impl<T> PullController<T> {
    /// Deliver `item` if demand is outstanding, consuming one unit.
    ///
    /// # Errors
    /// - `MergeError::DemandExceeded` if no demand is outstanding. The violation
    ///   is fatal: the consumer receives the error and the source is torn down.
    /// - `MergeError::SourceClosed` if the source was completed or torn down.
    pub fn emit(&self, item: T) -> Result<()> {
        match self.gate.try_acquire() {
            Acquire::Granted => self
                .sender
                .unbounded_send(StreamItem::Value(item))
                .map_err(|_| MergeError::SourceClosed),
            Acquire::Closed => Err(MergeError::SourceClosed),
            Acquire::Exhausted => {
                error!("pull controller: item pushed without outstanding demand, tearing source down");
                let _ = self
                    .sender
                    .unbounded_send(StreamItem::Error(MergeError::DemandExceeded));
                self.teardown();
                Err(MergeError::DemandExceeded)
            }
        }
    }

    /// Signal that no more items will be pushed.
    ///
    /// # Errors
    /// Returns `MergeError::SourceClosed` if the source was already completed or torn down.
    pub fn complete(&self) -> Result<()> {
        if self.gate.is_finished() {
            return Err(MergeError::SourceClosed);
        }
        debug!("pull controller: producer completed");
        self.gate.mark_completed();
        self.sender.close_channel();
        Ok(())
    }

    /// Deliver an error to the consumer and tear the source down.
    ///
    /// Errors bypass demand accounting.
    ///
    /// # Errors
    /// Returns `MergeError::SourceClosed` if the source was already completed or torn down.
    pub fn error(&self, error: MergeError) -> Result<()> {
        if self.gate.is_finished() {
            return Err(MergeError::SourceClosed);
        }
        self.sender
            .unbounded_send(StreamItem::Error(error))
            .map_err(|_| MergeError::SourceClosed)?;
        self.teardown();
        Ok(())
    }

    /// Wait until at least one item may be pushed.
    ///
    /// # Errors
    /// Returns `MergeError::SourceClosed` if the source is torn down while waiting.
    pub async fn wait_for_demand(&self) -> Result<()> {
        loop {
            match self.peek() {
                Acquire::Granted => return Ok(()),
                Acquire::Closed => return Err(MergeError::SourceClosed),
                Acquire::Exhausted => {}
            }
            self.gate.view().ready().await?;
        }
    }

    /// Resolves once the consumer disposed the source (or it was torn down).
    pub async fn closed(&self) {
        self.gate.closed().await;
    }

    /// Returns `true` once the source was torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Demand requested by the consumer but not yet pushed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.gate.outstanding()
    }

    fn peek(&self) -> Acquire {
        if self.gate.is_finished() || self.sender.is_closed() {
            Acquire::Closed
        } else if self.gate.outstanding() == 0 {
            Acquire::Exhausted
        } else {
            Acquire::Granted
        }
    }

    fn teardown(&self) {
        self.gate.close();
        self.sender.close_channel();
    }
}

impl<T> Clone for PullController<T> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<T> PushSource<T> {
    pub(crate) fn into_parts(self) -> (DemandHandle, PushStream<T>) {
        let stream = PushStream {
            demand: self.demand.clone(),
            receiver: self.receiver,
        };
        (self.demand, stream)
    }
}

/// Item stream of a subscribed [`PushSource`].
///
/// Dropping it disposes the subscription, which the producer observes through
/// [`PullController::closed`].
#[derive(Debug)]
pub struct PushStream<T> {
    demand: DemandHandle,
    receiver: UnboundedReceiver<StreamItem<T>>,
}

impl<T> Stream for PushStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl<T> Drop for PushStream<T> {
    fn drop(&mut self) {
        self.demand.close();
    }
}
