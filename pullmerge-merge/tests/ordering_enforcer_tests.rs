// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::stream;
use pullmerge_core::{MergeError, StreamItem};
use pullmerge_merge::{enforce_ordering, merge, KeyedMergeExt};
use pullmerge_pull::{push_source, Source, SourceExt};
use pullmerge_test_utils::test_data::{
    animal_dog, animal_spider, person_alice, person_bob, plant_rose, TestData,
};
use pullmerge_test_utils::{
    assert_no_element_emitted, collect_values, expect_end, expect_next_error, expect_next_value,
    test_channel_with_errors, Stamped, TEST_TIMEOUT,
};
use tokio::time::timeout;

fn source_of(items: Vec<Stamped<TestData>>) -> impl Source<Stamped<TestData>> {
    stream::iter(items.into_iter().map(StreamItem::Value)).into_source()
}

fn key(item: &Stamped<TestData>) -> u64 {
    item.key
}

#[tokio::test]
async fn test_each_source_keeps_its_own_output() -> anyhow::Result<()> {
    // Arrange
    let a = source_of(vec![person_alice().at(1), person_bob().at(3)]);
    let b = source_of(vec![animal_dog().at(2), animal_spider().at(4)]);

    // Act
    let outputs = enforce_ordering(vec![a, b], key, 1)?;

    // Assert
    assert_eq!(outputs.len(), 2);
    let mut outputs = outputs.into_iter();
    let (first, second) = (outputs.next().unwrap(), outputs.next().unwrap());
    assert_eq!(first.source_index(), 0);
    assert_eq!(second.source_index(), 1);

    let (first, second) = tokio::join!(collect_values(first), collect_values(second));
    assert_eq!(first, vec![person_alice().at(1), person_bob().at(3)]);
    assert_eq!(second, vec![animal_dog().at(2), animal_spider().at(4)]);
    Ok(())
}

#[tokio::test]
async fn test_items_are_held_until_every_source_started() -> anyhow::Result<()> {
    // Arrange
    let (a_ctl, a) = push_source();
    let (b_ctl, b) = push_source();
    let mut outputs = vec![a, b].enforce_ordering(key, 1)?;
    let mut second = outputs.pop().unwrap();
    let mut first = outputs.pop().unwrap();

    // Act
    a_ctl.wait_for_demand().await?;
    a_ctl.emit(person_alice().at(5))?;

    // Assert
    assert_no_element_emitted(&mut first, 50).await;

    b_ctl.wait_for_demand().await?;
    b_ctl.emit(plant_rose().at(2))?;
    expect_next_value(&mut second, plant_rose().at(2)).await;
    assert_no_element_emitted(&mut first, 50).await;

    b_ctl.wait_for_demand().await?;
    b_ctl.emit(animal_dog().at(7))?;
    expect_next_value(&mut first, person_alice().at(5)).await;
    assert_no_element_emitted(&mut second, 50).await;
    Ok(())
}

#[tokio::test]
async fn test_retired_source_output_ends_early() -> anyhow::Result<()> {
    // Arrange
    let empty = source_of(vec![]);
    let (_live_ctl, live) = push_source();
    let sources = vec![empty.subscribe(), live.subscribe()];

    // Act
    let mut outputs = enforce_ordering(sources, key, 1)?;

    // Assert
    let mut live_output = outputs.pop().unwrap();
    let mut empty_output = outputs.pop().unwrap();
    expect_end(&mut empty_output).await;
    assert_no_element_emitted(&mut live_output, 50).await;
    Ok(())
}

#[tokio::test]
async fn test_failure_reaches_every_output() -> anyhow::Result<()> {
    // Arrange
    let (a_ctl, a) = push_source::<Stamped<TestData>>();
    let (b_ctl, b) = push_source::<Stamped<TestData>>();
    let mut outputs = enforce_ordering(vec![a, b], key, 1)?;
    let mut second = outputs.pop().unwrap();
    let mut first = outputs.pop().unwrap();
    b_ctl.wait_for_demand().await?;

    // Act
    b_ctl.error(MergeError::stream_error("feed lost"))?;

    // Assert
    let own = expect_next_error(&mut second).await;
    assert_eq!(own.source_index(), Some(1));
    assert!(own.to_string().contains("feed lost"));
    let sibling = expect_next_error(&mut first).await;
    assert!(matches!(sibling, MergeError::SiblingFailed { index: 1 }));
    expect_end(&mut first).await;
    expect_end(&mut second).await;
    timeout(TEST_TIMEOUT, a_ctl.closed()).await?;
    Ok(())
}

#[tokio::test]
async fn test_dropping_every_output_disposes_sources() -> anyhow::Result<()> {
    // Arrange
    let (a_ctl, a) = push_source::<Stamped<TestData>>();
    let (b_ctl, b) = push_source::<Stamped<TestData>>();
    let mut outputs = enforce_ordering(vec![a, b], key, 1)?;
    a_ctl.wait_for_demand().await?;
    b_ctl.wait_for_demand().await?;

    // Act
    let last = outputs.pop();
    drop(outputs);
    assert!(!a_ctl.is_closed());
    drop(last);

    // Assert
    timeout(TEST_TIMEOUT, a_ctl.closed()).await?;
    timeout(TEST_TIMEOUT, b_ctl.closed()).await?;
    Ok(())
}

#[tokio::test]
async fn test_nested_merge_failure_reaches_its_own_output() -> anyhow::Result<()> {
    // Arrange
    let (tx, broken) = test_channel_with_errors();
    let inner = merge(
        vec![
            broken.into_source().subscribe(),
            source_of(vec![animal_spider().at(8)]).subscribe(),
        ],
        key,
        1,
    )?;
    let mut outputs = enforce_ordering(
        vec![
            source_of(vec![person_bob().at(3)]).subscribe(),
            inner.into_source().subscribe(),
        ],
        key,
        1,
    )?;
    let mut nested = outputs.pop().unwrap();
    let mut healthy = outputs.pop().unwrap();

    // Act
    tx.send(StreamItem::Error(MergeError::stream_error("inner feed broke")))?;

    // Assert
    let own = expect_next_error(&mut nested).await;
    assert_eq!(own.source_index(), Some(1));
    assert!(own.to_string().contains("inner feed broke"));
    let sibling = expect_next_error(&mut healthy).await;
    assert!(matches!(sibling, MergeError::SiblingFailed { index: 1 }));
    expect_end(&mut healthy).await;
    expect_end(&mut nested).await;
    Ok(())
}
