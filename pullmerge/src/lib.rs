// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # pullmerge
//!
//! Ordered merging of several independent, demand-driven async sources.
//!
//! ## Overview
//!
//! Every source tags its items with a key, extracted by a key mapper. The
//! merge buffers at most `lookahead` items per source, emits them in
//! non-decreasing key order across sources and asks each source for exactly as
//! many items as it has room for. A producer that outpaces the merge is
//! paused, never buffered without bound.
//!
//! - [`merge`] / [`try_merge`] / [`merge_with_config`] produce a single
//!   [`KeyedMerge`] stream.
//! - [`enforce_ordering`] produces one [`OrderedOutput`] per source, each
//!   released in the global key order.
//! - Sources are anything implementing [`Source`]: plain streams through
//!   [`SourceExt::into_source`], push-style producers through [`push_source`],
//!   tokio channels through [`UnboundedReceiverExt::into_source`].
//!
//! Within a source, items keep their arrival order. A larger lookahead lets the
//! merge correct more disorder between sources; `lookahead = 1` corrects none.
//!
//! ## Quick Start
//!
//! ```rust
//! use pullmerge::prelude::*;
//! use futures::stream;
//!
//! # #[tokio::main]
//! # async fn main() -> pullmerge::Result<()> {
//! let a = stream::iter(vec![1u64, 3]).map(StreamItem::Value).into_source();
//! let b = stream::iter(vec![2u64, 4]).map(StreamItem::Value).into_source();
//!
//! let merged = merge(vec![a, b], |key: &u64| *key, 1)?;
//! let keys: Vec<u64> = merged.map(|item| item.unwrap()).collect().await;
//!
//! assert_eq!(keys, vec![1, 2, 3, 4]);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod receiver_ext;

pub use pullmerge_core::{MergeError, Result, ResultExt, SourceIndex, StreamItem};
pub use pullmerge_merge::{
    enforce_ordering, enforce_ordering_with_config, merge, merge_with_config, try_merge,
    KeyedMerge, KeyedMergeExt, MergeConfig, OrderedOutput,
};
pub use pullmerge_pull::{
    push_source, DemandHandle, PullController, PushSource, Source, SourceExt, StreamSource,
    Subscription,
};
pub use receiver_ext::{ReceiverSource, UnboundedReceiverExt};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::receiver_ext::UnboundedReceiverExt;
    pub use futures::StreamExt;
    pub use pullmerge_core::{MergeError, StreamItem};
    pub use pullmerge_merge::{
        enforce_ordering, merge, merge_with_config, try_merge, KeyedMergeExt, MergeConfig,
    };
    pub use pullmerge_pull::{push_source, Source, SourceExt, StreamSource};
}
