// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]

#[macro_use]
mod logging;
mod actor;

pub mod config;
pub mod coordinator;
pub mod key_mapper;
pub mod keyed_merge;
pub mod ordering_enforcer;
pub mod source_tracker;

pub use self::config::MergeConfig;
pub use self::coordinator::{Coordinator, Emission, MergeState, Tick};
pub use self::key_mapper::KeyMapper;
pub use self::keyed_merge::{merge, merge_with_config, try_merge, KeyedMerge, KeyedMergeExt};
pub use self::ordering_enforcer::{
    enforce_ordering, enforce_ordering_with_config, OrderedOutput,
};
pub use self::source_tracker::{Drained, SourceTracker};
