// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use pullmerge::prelude::*;
use pullmerge::PullController;
use pullmerge_test_utils::test_data::{
    animal_bird, animal_dog, person_alice, person_bob, plant_fern, plant_rose, TestData,
};
use pullmerge_test_utils::{collect_items, collect_values, Stamped};
use tokio::sync::mpsc::unbounded_channel;

fn key(item: &Stamped<TestData>) -> u64 {
    item.key
}

async fn produce(
    controller: PullController<Stamped<TestData>>,
    items: Vec<Stamped<TestData>>,
) -> pullmerge::Result<()> {
    for item in items {
        controller.wait_for_demand().await?;
        controller.emit(item)?;
    }
    controller.complete()
}

#[tokio::test]
async fn test_functional_cooperative_producers() -> anyhow::Result<()> {
    // Arrange
    let mut sources = Vec::new();
    let mut producers = Vec::new();
    for offset in 0..3u64 {
        let (controller, source) = push_source();
        let items = (0..20u64)
            .map(|i| person_alice().at(i * 3 + offset))
            .collect();
        sources.push(source);
        producers.push(tokio::spawn(produce(controller, items)));
    }

    // Act
    let values = collect_values(merge(sources, key, 2)?).await;

    // Assert
    let keys: Vec<u64> = values.iter().map(Stamped::key).collect();
    assert_eq!(keys, (0..60).collect::<Vec<_>>());
    for producer in producers {
        producer.await??;
    }
    Ok(())
}

#[tokio::test]
async fn test_functional_receiver_sources() -> anyhow::Result<()> {
    // Arrange
    let (people_tx, people_rx) = unbounded_channel();
    let (animals_tx, animals_rx) = unbounded_channel();
    people_tx.send(person_alice().at(10))?;
    animals_tx.send(animal_dog().at(15))?;
    people_tx.send(person_bob().at(20))?;
    animals_tx.send(animal_bird().at(5))?;
    drop((people_tx, animals_tx));

    // Act
    let merged = vec![people_rx.into_source(), animals_rx.into_source()].keyed_merge(key, 2)?;
    let values = collect_values(merged).await;

    // Assert
    assert_eq!(
        values,
        vec![
            animal_dog().at(15),
            animal_bird().at(5),
            person_alice().at(10),
            person_bob().at(20),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_functional_enforce_ordering_on_hot_channels() -> anyhow::Result<()> {
    // Arrange
    let (people_tx, people_rx) = unbounded_channel();
    let (plants_tx, plants_rx) = unbounded_channel();
    let mut outputs = enforce_ordering(vec![people_rx.into_source(), plants_rx.into_source()], key, 1)?;
    let plants = outputs.pop().unwrap();
    let people = outputs.pop().unwrap();

    // Act
    plants_tx.send(plant_rose().at(1))?;
    people_tx.send(person_alice().at(2))?;
    plants_tx.send(plant_fern().at(3))?;
    drop((people_tx, plants_tx));

    // Assert
    let (people, plants) = tokio::join!(collect_values(people), collect_values(plants));
    assert_eq!(people, vec![person_alice().at(2)]);
    assert_eq!(plants, vec![plant_rose().at(1), plant_fern().at(3)]);
    Ok(())
}

#[tokio::test]
async fn test_functional_failing_producer_stops_the_merge() -> anyhow::Result<()> {
    // Arrange
    let (healthy, healthy_source) = push_source();
    let (failing, failing_source) = push_source();
    let healthy_task = tokio::spawn(produce(
        healthy,
        (1..100).map(|k| person_bob().at(k * 2)).collect(),
    ));
    tokio::spawn(async move {
        failing.wait_for_demand().await?;
        failing.emit(animal_dog().at(1))?;
        failing.wait_for_demand().await?;
        failing.error(MergeError::stream_error("producer crashed"))
    });

    // Act
    let items = collect_items(merge(vec![healthy_source, failing_source], key, 1)?).await;

    // Assert
    let (last, emitted) = items.split_last().expect("at least the error");
    assert!(emitted.iter().all(StreamItem::is_value));
    match last {
        StreamItem::Error(error) => {
            assert_eq!(error.source_index(), Some(1));
            assert!(error.to_string().contains("producer crashed"));
        }
        StreamItem::Value(value) => panic!("expected the merge to end with an error, got {value:?}"),
    }
    assert!(matches!(
        healthy_task.await?,
        Err(MergeError::SourceClosed)
    ));
    Ok(())
}
