// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::{stream, StreamExt};
use pullmerge_core::StreamItem;
use pullmerge_pull::{Source, SourceExt, StreamSource, Subscription};
use pullmerge_test_utils::test_data::{animal_dog, person_alice, person_bob, plant_rose};
use pullmerge_test_utils::{
    assert_no_element_emitted, expect_end, expect_next_error, expect_next_value, probed,
    test_channel, ErrorInjectingStream,
};

fn values<T>(items: Vec<T>) -> impl futures::Stream<Item = StreamItem<T>> {
    stream::iter(items.into_iter().map(StreamItem::Value))
}

#[tokio::test]
async fn test_stream_source_waits_for_demand() -> anyhow::Result<()> {
    // Arrange
    let (inner, probe) = probed(values(vec![person_alice(), person_bob()]));
    let mut subscription = StreamSource::new(inner).subscribe();

    // Act & Assert
    assert_no_element_emitted(&mut subscription, 50).await;
    assert_eq!(probe.polls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_stream_source_delivers_exactly_requested() -> anyhow::Result<()> {
    // Arrange
    let (inner, probe) = probed(values(vec![person_alice(), person_bob(), animal_dog()]));
    let mut subscription = StreamSource::new(inner).subscribe();

    // Act
    subscription.demand().request(2);

    // Assert
    expect_next_value(&mut subscription, person_alice()).await;
    expect_next_value(&mut subscription, person_bob()).await;
    assert_no_element_emitted(&mut subscription, 50).await;
    assert_eq!(probe.yielded(), 2);
    assert_eq!(subscription.demand().outstanding(), 0);

    subscription.demand().request(1);
    expect_next_value(&mut subscription, animal_dog()).await;
    Ok(())
}

#[tokio::test]
async fn test_stream_source_completion_marks_demand_completed() -> anyhow::Result<()> {
    // Arrange
    let mut subscription = values(vec![plant_rose()]).into_source().subscribe();

    // Act
    subscription.demand().request(5);

    // Assert
    expect_next_value(&mut subscription, plant_rose()).await;
    expect_end(&mut subscription).await;
    assert!(subscription.demand().is_completed());
    assert_eq!(subscription.demand().outstanding(), 0);
    Ok(())
}

#[tokio::test]
async fn test_stream_source_forwards_error_and_ends() -> anyhow::Result<()> {
    // Arrange
    let inner = ErrorInjectingStream::new(stream::iter(vec![person_alice(), person_bob()]), 1);
    let mut subscription = inner.into_source().subscribe();

    // Act
    subscription.demand().request(3);

    // Assert
    expect_next_value(&mut subscription, person_alice()).await;
    let error = expect_next_error(&mut subscription).await;
    assert!(error.to_string().contains("Injected test error"));
    expect_end(&mut subscription).await;
    Ok(())
}

#[tokio::test]
async fn test_closed_subscription_stops_polling_inner() -> anyhow::Result<()> {
    // Arrange
    let (tx, inner) = test_channel();
    let (inner, probe) = probed(Box::pin(inner));
    let mut subscription = StreamSource::new(inner).subscribe();
    subscription.demand().request(1);

    // Act
    subscription.demand().close();
    tx.send(person_alice())?;

    // Assert
    expect_end(&mut subscription).await;
    assert_eq!(probe.yielded(), 0);
    drop(subscription);
    assert!(probe.is_dropped());
    Ok(())
}

#[tokio::test]
async fn test_flattened_source_concatenates_inner_streams() -> anyhow::Result<()> {
    // Arrange
    let outer = stream::iter(vec![
        values(vec![person_alice(), person_bob()]).boxed(),
        values(vec![animal_dog()]).boxed(),
    ]);
    let mut subscription = StreamSource::flattened(outer).subscribe();

    // Act
    subscription.demand().request(3);

    // Assert
    expect_next_value(&mut subscription, person_alice()).await;
    expect_next_value(&mut subscription, person_bob()).await;
    expect_next_value(&mut subscription, animal_dog()).await;
    subscription.demand().request(1);
    expect_end(&mut subscription).await;
    Ok(())
}

#[tokio::test]
async fn test_stream_source_end_surfaces_on_next_request() -> anyhow::Result<()> {
    // Arrange
    let (inner, probe) = probed(values(vec![person_alice(), person_bob()]));
    let mut subscription = StreamSource::new(inner).subscribe();
    subscription.demand().request(2);
    expect_next_value(&mut subscription, person_alice()).await;
    expect_next_value(&mut subscription, person_bob()).await;

    // Act
    assert_no_element_emitted(&mut subscription, 50).await;
    let completed_before_request = subscription.demand().is_completed();
    subscription.demand().request(1);

    // Assert
    assert!(!completed_before_request);
    expect_end(&mut subscription).await;
    assert!(subscription.demand().is_completed());
    assert_eq!(probe.yielded(), 2);
    Ok(())
}

#[tokio::test]
async fn test_subscription_is_its_own_source() -> anyhow::Result<()> {
    // Arrange
    let subscription: Subscription<_> = values(vec![plant_rose()]).into_source().subscribe();
    let demand = subscription.demand().clone();

    // Act
    let (handle, mut items) = subscription.subscribe().into_parts();
    handle.request(1);

    // Assert
    assert_eq!(demand.outstanding(), 1);
    assert_eq!(items.next().await, Some(StreamItem::Value(plant_rose())));
    Ok(())
}
