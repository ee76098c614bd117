// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The merge state machine.
//!
//! [`Coordinator`] owns one [`SourceTracker`] per source and decides, on every
//! tick, which buffered items can be emitted and how much demand each source
//! should be asked for. It performs no I/O: callers feed it source events and
//! act on the [`Tick`] it returns, which keeps the selection logic testable
//! without a runtime.
//!
//! Selection works on whole lookahead windows. Nothing is emitted until every
//! live source is *ready* (holds `lookahead` items, or completed). The active
//! source is then the one with the smallest buffered key, the lowest index
//! winning ties; its run of that key is drained and its window refilled.

use crate::config::MergeConfig;
use crate::source_tracker::SourceTracker;
use pullmerge_core::{MergeError, Result, SourceIndex};

/// Lifecycle of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    /// Waiting for every source to fill its first window.
    Startup,
    /// Selecting and draining.
    Steady,
    /// Every source completed; emptying the remaining buffers.
    Draining,
    /// Every source retired; the merged output has ended.
    Completed,
    /// A source or key-mapper failed; nothing else is emitted.
    Failed,
}

impl MergeState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Something the caller must forward downstream.
#[derive(Debug, PartialEq, Eq)]
pub enum Emission<T> {
    Item { source: SourceIndex, item: T },
    SourceCompleted { source: SourceIndex },
    Completed,
}

/// Work produced by one tick, in the order it must be applied: emissions first,
/// then demand refills.
#[derive(Debug)]
pub struct Tick<T> {
    pub emissions: Vec<Emission<T>>,
    pub refills: Vec<(SourceIndex, usize)>,
}

impl<T> Tick<T> {
    const fn new(emissions: Vec<Emission<T>>) -> Self {
        Self {
            emissions,
            refills: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Coordinator<K, T> {
    trackers: Vec<SourceTracker<K, T>>,
    lookahead: usize,
    max_drain: usize,
    state: MergeState,
    pending: Vec<Emission<T>>,
}

impl<K: Ord + Clone, T> Coordinator<K, T> {
    /// # Errors
    /// Returns `MergeError::InvalidLookahead` if the configuration is invalid.
    pub fn new(sources: usize, config: &MergeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            trackers: (0..sources).map(SourceTracker::new).collect(),
            lookahead: config.lookahead(),
            max_drain: config.max_drain(),
            state: MergeState::Startup,
            pending: Vec::new(),
        })
    }

    #[must_use]
    pub const fn state(&self) -> MergeState {
        self.state
    }

    #[must_use]
    pub fn tracker(&self, index: SourceIndex) -> Option<&SourceTracker<K, T>> {
        self.trackers.get(index)
    }

    /// Demand to issue right after subscribing: a full window per source.
    pub fn initial_requests(&mut self) -> Vec<(SourceIndex, usize)> {
        let lookahead = self.lookahead;
        self.trackers
            .iter_mut()
            .map(|tracker| (tracker.index(), tracker.request_refill(lookahead)))
            .filter(|(_, amount)| *amount > 0)
            .collect()
    }

    /// Buffer an item delivered by `index`.
    ///
    /// # Errors
    /// Fails when the source broke the demand protocol; the error is attributed
    /// to the source.
    pub fn on_item(&mut self, index: SourceIndex, key: K, item: T) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.tracker_mut(index)?
            .accept(key, item)
            .map_err(|error| MergeError::from_source(index, error))
    }

    /// Record the completion of `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is not a source of this merge.
    pub fn on_completed(&mut self, index: SourceIndex) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        if self.tracker_mut(index)?.mark_completed() {
            debug!("keyed merge: source {index} retired");
            self.pending.push(Emission::SourceCompleted { source: index });
        }
        Ok(())
    }

    /// Stop the merge; later events and ticks are ignored.
    pub fn fail(&mut self) {
        self.pending.clear();
        self.transition(MergeState::Failed);
    }

    /// Run the selection loop until it has to wait for a source.
    pub fn process_reads(&mut self) -> Tick<T> {
        let mut tick = Tick::new(std::mem::take(&mut self.pending));
        if self.state.is_terminal() {
            return tick;
        }

        if self.state == MergeState::Startup {
            // A ready source holds a full window or completed, so it has
            // delivered its first item or finished
            if !self.all_ready() {
                return tick;
            }
            self.transition(MergeState::Steady);
        }

        loop {
            if !self.all_ready() {
                break;
            }
            if self.state == MergeState::Steady && self.all_completed() {
                self.transition(MergeState::Draining);
            }

            let Some(active) = self.active_source() else {
                if self.all_completed() {
                    self.transition(MergeState::Completed);
                    tick.emissions.push(Emission::Completed);
                }
                break;
            };

            let lookahead = self.lookahead;
            let max_drain = self.max_drain;
            let tracker = &mut self.trackers[active];
            let Some(key) = tracker.closest_key().cloned() else {
                break;
            };
            let drained = tracker.drain_to_key(&key, max_drain);
            let refill = tracker.request_refill(lookahead);

            tick.emissions.extend(
                drained
                    .items
                    .into_iter()
                    .map(|item| Emission::Item {
                        source: active,
                        item,
                    }),
            );
            if drained.retired {
                debug!("keyed merge: source {active} retired");
                tick.emissions.push(Emission::SourceCompleted { source: active });
            }
            if refill > 0 {
                tick.refills.push((active, refill));
            }
        }

        tick
    }

    fn all_ready(&self) -> bool {
        self.trackers
            .iter()
            .all(|tracker| tracker.is_ready(self.lookahead))
    }

    fn all_completed(&self) -> bool {
        self.trackers.iter().all(SourceTracker::is_completed)
    }

    fn active_source(&self) -> Option<SourceIndex> {
        let mut active: Option<(SourceIndex, &K)> = None;
        for tracker in &self.trackers {
            if let Some(key) = tracker.closest_key() {
                // Strict comparison keeps the lowest index on ties
                if active.is_none_or(|(_, best)| key < best) {
                    active = Some((tracker.index(), key));
                }
            }
        }
        active.map(|(index, _)| index)
    }

    fn tracker_mut(&mut self, index: SourceIndex) -> Result<&mut SourceTracker<K, T>> {
        self.trackers
            .get_mut(index)
            .ok_or_else(|| MergeError::stream_error(format!("unknown source index {index}")))
    }

    fn transition(&mut self, next: MergeState) {
        if self.state != next {
            debug!("keyed merge: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(sources: usize, lookahead: usize) -> Coordinator<u32, &'static str> {
        Coordinator::new(sources, &MergeConfig::new(lookahead)).expect("valid config")
    }

    fn items(tick: &Tick<&'static str>) -> Vec<&'static str> {
        tick.emissions
            .iter()
            .filter_map(|emission| match emission {
                Emission::Item { item, .. } => Some(*item),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_zero_sources_complete_immediately() {
        let mut coordinator = coordinator(0, 1);

        assert!(coordinator.initial_requests().is_empty());
        let tick = coordinator.process_reads();

        assert_eq!(tick.emissions, vec![Emission::Completed]);
        assert_eq!(coordinator.state(), MergeState::Completed);
    }

    #[test]
    fn test_startup_waits_for_every_window() {
        let mut coordinator = coordinator(2, 1);
        assert_eq!(coordinator.initial_requests(), vec![(0, 1), (1, 1)]);

        coordinator.on_item(0, 1, "a1").expect("demand outstanding");
        let tick = coordinator.process_reads();

        assert!(tick.emissions.is_empty());
        assert_eq!(coordinator.state(), MergeState::Startup);
    }

    #[test]
    fn test_selects_smallest_key_and_refills_active_source() {
        let mut coordinator = coordinator(2, 1);
        coordinator.initial_requests();
        coordinator.on_item(0, 3, "a").expect("demand outstanding");
        coordinator.on_item(1, 2, "b").expect("demand outstanding");

        let tick = coordinator.process_reads();

        assert_eq!(items(&tick), vec!["b"]);
        assert_eq!(tick.refills, vec![(1, 1)]);
        assert_eq!(coordinator.state(), MergeState::Steady);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let mut coordinator = coordinator(2, 1);
        coordinator.initial_requests();
        coordinator.on_item(1, 4, "b").expect("demand outstanding");
        coordinator.on_item(0, 4, "a").expect("demand outstanding");

        let tick = coordinator.process_reads();

        assert_eq!(
            tick.emissions,
            vec![Emission::Item {
                source: 0,
                item: "a"
            }]
        );
    }

    #[test]
    fn test_uncorrected_disorder_with_unit_lookahead() {
        let mut coordinator = coordinator(2, 1);
        coordinator.initial_requests();
        coordinator.on_item(0, 5, "x").expect("demand outstanding");
        coordinator.on_item(1, 2, "z").expect("demand outstanding");
        let mut emitted = items(&coordinator.process_reads());

        coordinator.on_completed(1).expect("known source");
        emitted.extend(items(&coordinator.process_reads()));
        coordinator.on_item(0, 1, "y").expect("demand outstanding");
        emitted.extend(items(&coordinator.process_reads()));
        coordinator.on_completed(0).expect("known source");
        let last = coordinator.process_reads();

        assert_eq!(emitted, vec!["z", "x", "y"]);
        assert_eq!(last.emissions.last(), Some(&Emission::Completed));
    }

    #[test]
    fn test_completion_moves_through_draining() {
        let mut coordinator = coordinator(1, 2);
        coordinator.initial_requests();
        coordinator.on_item(0, 1, "a").expect("demand outstanding");
        coordinator.on_item(0, 2, "b").expect("demand outstanding");
        let first = coordinator.process_reads();
        assert_eq!(items(&first), vec!["a"]);
        assert_eq!(first.refills, vec![(0, 1)]);

        coordinator.on_completed(0).expect("known source");
        let tick = coordinator.process_reads();

        assert_eq!(
            tick.emissions,
            vec![
                Emission::Item {
                    source: 0,
                    item: "b"
                },
                Emission::SourceCompleted { source: 0 },
                Emission::Completed,
            ]
        );
        assert_eq!(coordinator.state(), MergeState::Completed);
    }

    #[test]
    fn test_early_completion_signals_source_once() {
        let mut coordinator = coordinator(2, 1);
        coordinator.initial_requests();
        coordinator.on_completed(0).expect("known source");
        coordinator.on_completed(0).expect("known source");

        let tick = coordinator.process_reads();

        assert_eq!(
            tick.emissions,
            vec![Emission::SourceCompleted { source: 0 }]
        );
        assert_eq!(coordinator.state(), MergeState::Startup);
    }

    #[test]
    fn test_startup_waits_until_every_source_delivered_or_completed() {
        let mut coordinator = coordinator(2, 1);
        coordinator.initial_requests();
        coordinator.on_item(0, 9, "a").expect("demand outstanding");

        assert!(coordinator.process_reads().emissions.is_empty());
        assert_eq!(coordinator.state(), MergeState::Startup);

        coordinator.on_completed(1).expect("known source");
        let tick = coordinator.process_reads();

        assert_eq!(items(&tick), vec!["a"]);
        assert_ne!(coordinator.state(), MergeState::Startup);
    }

    #[test]
    fn test_item_without_demand_is_attributed_to_source() {
        let mut coordinator = coordinator(2, 1);
        coordinator.initial_requests();
        coordinator.on_item(1, 1, "b").expect("demand outstanding");

        let error = coordinator
            .on_item(1, 2, "c")
            .expect_err("second item exceeds the window");

        assert_eq!(error.source_index(), Some(1));
        assert!(error.is_protocol_violation());
    }

    #[test]
    fn test_failed_merge_ignores_later_events() {
        let mut coordinator = coordinator(1, 1);
        coordinator.initial_requests();
        coordinator.fail();

        coordinator.on_item(0, 1, "a").expect("ignored after failure");
        let tick = coordinator.process_reads();

        assert!(tick.emissions.is_empty());
        assert_eq!(coordinator.state(), MergeState::Failed);
    }

    #[test]
    fn test_backpressure_window_never_exceeded() {
        let lookahead = 3;
        let mut coordinator = coordinator(2, lookahead);
        coordinator.initial_requests();
        for key in 0..3 {
            coordinator.on_item(0, key * 2, "a").expect("demand outstanding");
            coordinator.on_item(1, key * 2 + 1, "b").expect("demand outstanding");
        }

        coordinator.process_reads();

        for index in 0..2 {
            let tracker = coordinator.tracker(index).expect("known source");
            assert!(tracker.len() + tracker.outstanding() <= lookahead);
        }
    }
}
