// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities and fixtures for the pullmerge workspace.
//!
//! Intended for development and testing only.
//!
//! - [`Stamped<T>`] pairs a fixture with an explicit merge key.
//! - [`test_data`] holds `Person`, `Animal` and `Plant` fixtures.
//! - [`helpers`] holds assertion helpers for `StreamItem` streams.
//! - [`probe`] wraps a stream to observe polls and disposal.
//! - [`test_channel`] / [`test_channel_with_errors`] feed a stream imperatively.
//!
//! ```rust
//! use pullmerge_test_utils::test_data::person_alice;
//!
//! let alice = person_alice().at(7);
//! assert_eq!(alice.key(), 7);
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod error_injection;
pub mod helpers;
pub mod probe;
pub mod stamped;
pub mod test_data;

use futures::{Stream, StreamExt};
use pullmerge_core::StreamItem;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub use error_injection::ErrorInjectingStream;
pub use helpers::{
    assert_no_element_emitted, collect_items, collect_values, expect_end, expect_next_error,
    expect_next_value, TEST_TIMEOUT,
};
pub use probe::{probed, Probe, ProbedStream};
pub use stamped::{stamped, Stamped};
pub use test_data::TestData;

/// Creates a test channel that wraps sent values in `StreamItem::Value`.
///
/// The stream ends once every sender is dropped.
pub fn test_channel<T: Send + 'static>() -> (
    mpsc::UnboundedSender<T>,
    impl Stream<Item = StreamItem<T>> + Send,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = UnboundedReceiverStream::new(rx).map(StreamItem::Value);
    (tx, stream)
}

/// Creates a test channel that accepts `StreamItem<T>` for error propagation tests.
pub fn test_channel_with_errors<T: Send + 'static>() -> (
    mpsc::UnboundedSender<StreamItem<T>>,
    impl Stream<Item = StreamItem<T>> + Send,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, UnboundedReceiverStream::new(rx))
}
