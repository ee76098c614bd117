// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::stream::StreamExt;
use futures::Stream;
use pullmerge_core::{MergeError, StreamItem};
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Upper bound for any single await in a test before it is considered hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        _item = stream.next() => {
            panic!("Unexpected item emitted, expected no output.");
        }
        () = sleep(Duration::from_millis(timeout_ms)) => {}
    }
}

/// Await the next item and assert it is `StreamItem::Value(expected)`.
pub async fn expect_next_value<S, T>(stream: &mut S, expected: T)
where
    S: Stream<Item = StreamItem<T>> + Unpin,
    T: PartialEq + Debug,
{
    let item = timeout(TEST_TIMEOUT, stream.next())
        .await
        .expect("timed out waiting for the next item")
        .expect("expected next item");
    match item {
        StreamItem::Value(value) => assert_eq!(value, expected),
        StreamItem::Error(e) => panic!("expected {expected:?}, got error: {e}"),
    }
}

/// Await the next item and return the error it carries.
pub async fn expect_next_error<S, T>(stream: &mut S) -> MergeError
where
    S: Stream<Item = StreamItem<T>> + Unpin,
    T: Debug,
{
    let item = timeout(TEST_TIMEOUT, stream.next())
        .await
        .expect("timed out waiting for the next item")
        .expect("expected an error item");
    match item {
        StreamItem::Error(e) => e,
        StreamItem::Value(value) => panic!("expected an error, got value: {value:?}"),
    }
}

/// Assert the stream has ended.
pub async fn expect_end<S, T>(stream: &mut S)
where
    S: Stream<Item = StreamItem<T>> + Unpin,
    T: Debug,
{
    let next = timeout(TEST_TIMEOUT, stream.next())
        .await
        .expect("timed out waiting for the end of the stream");
    if let Some(item) = next {
        panic!("expected end of stream, got: {item:?}");
    }
}

/// Drain a stream to its end, panicking on the first error.
pub async fn collect_values<S, T>(stream: S) -> Vec<T>
where
    S: Stream<Item = StreamItem<T>>,
{
    let items = timeout(TEST_TIMEOUT, stream.collect::<Vec<_>>())
        .await
        .expect("timed out draining the stream");
    items
        .into_iter()
        .map(|item| match item {
            StreamItem::Value(value) => value,
            StreamItem::Error(e) => panic!("unexpected error while collecting: {e}"),
        })
        .collect()
}

/// Drain a stream to its end, keeping values and errors.
pub async fn collect_items<S, T>(stream: S) -> Vec<StreamItem<T>>
where
    S: Stream<Item = StreamItem<T>>,
{
    timeout(TEST_TIMEOUT, stream.collect::<Vec<_>>())
        .await
        .expect("timed out draining the stream")
}
