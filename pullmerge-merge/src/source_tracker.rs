// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-source buffering and demand accounting.
//!
//! A [`SourceTracker`] holds the items a source delivered but the merge has not
//! emitted yet, the smallest key among them, and how much demand is still
//! outstanding. It never talks to the source directly: the coordinator reads
//! [`refill_amount`](SourceTracker::refill_amount) and forwards the request.

use pullmerge_core::{MergeError, Result, SourceIndex};
use std::collections::VecDeque;

/// Items removed by [`SourceTracker::drain_to_key`].
#[derive(Debug)]
pub struct Drained<T> {
    /// Drained items, in arrival order.
    pub items: Vec<T>,
    /// `true` if this drain retired the source (completed and now empty).
    pub retired: bool,
}

#[derive(Debug)]
pub struct SourceTracker<K, T> {
    index: SourceIndex,
    buffer: VecDeque<(K, T)>,
    closest_key: Option<K>,
    outstanding: usize,
    completed: bool,
    completion_signalled: bool,
}

impl<K: Ord + Clone, T> SourceTracker<K, T> {
    #[must_use]
    pub const fn new(index: SourceIndex) -> Self {
        Self {
            index,
            buffer: VecDeque::new(),
            closest_key: None,
            outstanding: 0,
            completed: false,
            completion_signalled: false,
        }
    }

    /// Buffer an item delivered by the source.
    ///
    /// # Errors
    /// - `MergeError::DemandExceeded` if the source delivered without outstanding demand.
    /// - `MergeError::SourceClosed` if the source already completed.
    pub fn accept(&mut self, key: K, item: T) -> Result<()> {
        if self.completed {
            return Err(MergeError::SourceClosed);
        }
        if self.outstanding == 0 {
            return Err(MergeError::DemandExceeded);
        }
        self.outstanding -= 1;
        if self.closest_key.as_ref().is_none_or(|closest| key < *closest) {
            self.closest_key = Some(key.clone());
        }
        self.buffer.push_back((key, item));
        Ok(())
    }

    /// Record that the source will not deliver anything else.
    ///
    /// Returns `true` if the source retires right away (nothing buffered). A
    /// source with buffered items retires on the drain that empties it.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.outstanding = 0;
        self.signal_if_retired()
    }

    /// Remove items from the front of the buffer up to the run of `key`.
    ///
    /// Items ahead of the first `key` item are taken as they are, then items
    /// equal to `key` are taken until the front key differs or `max_count` of
    /// them were taken.
    pub fn drain_to_key(&mut self, key: &K, max_count: usize) -> Drained<T> {
        let mut items = Vec::new();

        while let Some((front, _)) = self.buffer.front() {
            if front == key {
                break;
            }
            if let Some((_, item)) = self.buffer.pop_front() {
                items.push(item);
            }
        }

        let mut taken = 0;
        while taken < max_count && self.buffer.front().is_some_and(|(front, _)| front == key) {
            if let Some((_, item)) = self.buffer.pop_front() {
                items.push(item);
                taken += 1;
            }
        }

        self.closest_key = self.buffer.iter().map(|(k, _)| k).min().cloned();
        let retired = self.signal_if_retired();
        Drained { items, retired }
    }

    /// Demand to request so that `len + outstanding` is back at `lookahead`.
    #[must_use]
    pub fn refill_amount(&self, lookahead: usize) -> usize {
        if self.completed {
            return 0;
        }
        lookahead.saturating_sub(self.buffer.len() + self.outstanding)
    }

    /// Compute the refill for `lookahead` and account for it as outstanding.
    pub fn request_refill(&mut self, lookahead: usize) -> usize {
        let amount = self.refill_amount(lookahead);
        self.outstanding += amount;
        amount
    }

    /// Buffer full, or nothing more will arrive.
    #[must_use]
    pub fn is_ready(&self, lookahead: usize) -> bool {
        self.completed || self.buffer.len() >= lookahead
    }

    /// Completed with nothing left to drain.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.completed && self.buffer.is_empty()
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub const fn closest_key(&self) -> Option<&K> {
        self.closest_key.as_ref()
    }

    #[must_use]
    pub const fn index(&self) -> SourceIndex {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn signal_if_retired(&mut self) -> bool {
        if self.is_retired() && !self.completion_signalled {
            self.completion_signalled = true;
            return true;
        }
        false
    }
}
