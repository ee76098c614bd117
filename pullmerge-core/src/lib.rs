// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod cancellation_token;
pub mod error;
pub mod merge_task;
pub mod stream_item;

pub use self::cancellation_token::{CancellationToken, Cancelled, DropGuard};
pub use self::error::{IntoMergeError, MergeError, Result, ResultExt};
pub use self::merge_task::MergeTask;
pub use self::stream_item::StreamItem;

/// Position of a source in the vector handed to a merge, used as its identity
/// and as the tie-break between equal keys.
pub type SourceIndex = usize;
