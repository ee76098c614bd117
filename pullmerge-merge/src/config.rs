// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::num::NonZeroUsize;
use pullmerge_core::{MergeError, Result};

/// Tuning knobs of a keyed merge.
///
/// ```
/// use core::num::NonZeroUsize;
/// use pullmerge_merge::MergeConfig;
///
/// let config = MergeConfig::default()
///     .with_lookahead(4)
///     .with_max_drain(NonZeroUsize::new(2).unwrap());
///
/// assert_eq!(config.lookahead(), 4);
/// assert_eq!(config.max_drain(), 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    lookahead: usize,
    max_drain: Option<NonZeroUsize>,
}

impl MergeConfig {
    /// A configuration with the given lookahead window and default drain bound.
    #[must_use]
    pub const fn new(lookahead: usize) -> Self {
        Self {
            lookahead,
            max_drain: None,
        }
    }

    /// Per-source buffer capacity `L`. Larger windows correct more disorder at
    /// the cost of memory; `1` performs no correction.
    #[must_use]
    pub const fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Maximum number of equal-key items drained from the active source per
    /// selection. Defaults to the lookahead.
    #[must_use]
    pub const fn with_max_drain(mut self, max_drain: NonZeroUsize) -> Self {
        self.max_drain = Some(max_drain);
        self
    }

    #[must_use]
    pub const fn lookahead(&self) -> usize {
        self.lookahead
    }

    #[must_use]
    pub fn max_drain(&self) -> usize {
        self.max_drain.map_or(self.lookahead, NonZeroUsize::get)
    }

    /// # Errors
    /// Returns `MergeError::InvalidLookahead` if the lookahead is zero.
    pub const fn validate(&self) -> Result<()> {
        if self.lookahead == 0 {
            return Err(MergeError::InvalidLookahead {
                lookahead: self.lookahead,
            });
        }
        Ok(())
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new(1)
    }
}
