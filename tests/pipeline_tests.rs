use fanout_stream::stage::{self, Stage, StageKind};
use fanout_stream::{Consumer, Mapper, Pipeline, Predicate, StreamError};
use futures_util::stream::{self, StreamExt};
use quickcheck::quickcheck;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn letter_to_int() -> HashMap<char, i32> {
    [('a', 1), ('b', 2), ('c', 3), ('d', 4), ('e', 5)]
        .into_iter()
        .collect()
}

// ================================
// Sources
// ================================

#[tokio::test]
async fn test_input_list() {
    let result = Pipeline::of(vec![1, 2, 3, 4]).to_list().await;
    assert_eq!(result, Ok(vec![1, 2, 3, 4]));
}

#[tokio::test]
async fn test_input_empty() {
    let result = Pipeline::<i32>::empty().to_list().await;
    assert_eq!(result, Ok(vec![]));
}

#[tokio::test]
async fn test_input_lazy_stream() {
    let result = Pipeline::from_stream(stream::iter(1..=5)).to_list().await;
    assert_eq!(result, Ok(vec![1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_input_options_pass_through() {
    let result = Pipeline::of(vec![Some(1), Some(2), None, Some(4)]).to_list().await;
    assert_eq!(result, Ok(vec![Some(1), Some(2), None, Some(4)]));
}

#[tokio::test]
async fn test_input_try_stream_stops_at_error() {
    let source = stream::iter(vec![
        Ok(1),
        Ok(2),
        Err(StreamError::custom("source broke")),
        Ok(4),
    ]);
    let result = Pipeline::from_try_stream(source).to_list().await;
    assert_eq!(result, Err(StreamError::custom("source broke")));
}

#[tokio::test]
async fn test_input_pushed_into_channel() {
    let (tx, rx) = mpsc::channel(4);
    let producer = tokio::spawn(async move {
        for i in 0..10 {
            if tx.send(i).await.is_err() {
                break;
            }
        }
    });

    let result = Pipeline::from_receiver(rx).map(|x: i32| x * 2).to_list().await;
    producer.await.unwrap();

    assert_eq!(result, Ok((0..10).map(|x| x * 2).collect::<Vec<_>>()));
}

#[tokio::test]
async fn test_one_shot_source_reports_second_drive() {
    let pipeline = Pipeline::from_stream(stream::iter(vec![1, 2, 3]));

    assert_eq!(pipeline.to_list().await, Ok(vec![1, 2, 3]));
    assert!(matches!(
        pipeline.to_list().await,
        Err(StreamError::Usage(_))
    ));
}

#[tokio::test]
async fn test_concat() {
    let a = Pipeline::of(vec![1, 2, 3, 4]);
    let b = Pipeline::of(vec![5, 6, 7]);

    let result = Pipeline::concat(a, b).to_list().await;
    assert_eq!(result, Ok(vec![1, 2, 3, 4, 5, 6, 7]));
}

#[tokio::test]
async fn test_concat_keeps_each_side_chain() {
    let a = Pipeline::of(vec![1, 2, 3]).map(|x: i32| x * 10);
    let b = Pipeline::of(vec![4, 5, 6]).filter(|x: &i32| x % 2 == 0);

    let result = Pipeline::concat(a, b).map(|x: i32| x + 1).to_list().await;
    assert_eq!(result, Ok(vec![11, 21, 31, 5, 7]));
}

#[tokio::test]
async fn test_builder() {
    let mut builder = Pipeline::builder().add(1).add(2);
    builder.accept(3);
    builder.accept(4);
    assert_eq!(builder.len(), 4);

    let result = builder.build().to_list().await;
    assert_eq!(result, Ok(vec![1, 2, 3, 4]));
}

#[tokio::test]
async fn test_empty_builder() {
    let builder = fanout_stream::StreamBuilder::<String>::new();
    assert!(builder.is_empty());
    assert_eq!(builder.build().count().await, Ok(0));
}

// ================================
// Laziness and re-driving
// ================================

#[tokio::test]
async fn test_nothing_runs_before_first_pull() {
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = calls.clone();

    let pipeline = Pipeline::of(vec![1, 2, 3]).peek(move |_| {
        observed.fetch_add(1, Ordering::SeqCst);
    });
    let mut seq = pipeline.drive();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(seq.next().await, Some(Ok(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhausted_sequence_keeps_signalling_end() {
    let mut seq = Pipeline::of(vec![1]).drive();
    assert_eq!(seq.next().await, Some(Ok(1)));
    assert_eq!(seq.next().await, None);
    assert_eq!(seq.next().await, None);
}

#[tokio::test]
async fn test_definition_can_be_driven_repeatedly() {
    let pipeline = Pipeline::of(vec![3, 1, 2, 3, 1])
        .distinct()
        .map(|x: i32| x * 2);

    assert_eq!(pipeline.to_list().await, Ok(vec![6, 2, 4]));
    assert_eq!(pipeline.count().await, Ok(3));
    assert_eq!(pipeline.to_list().await, Ok(vec![6, 2, 4]));
}

#[tokio::test]
async fn test_extending_a_definition_leaves_it_unchanged() {
    let base = Pipeline::of(vec![1, 2, 3, 4]);
    let evens = base.clone().filter(|x: &i32| x % 2 == 0);

    assert_eq!(base.to_list().await, Ok(vec![1, 2, 3, 4]));
    assert_eq!(evens.to_list().await, Ok(vec![2, 4]));
    assert_eq!(base.depth(), 0);
    assert_eq!(evens.depth(), 1);
}

#[tokio::test]
async fn test_sequential_and_parallel_from_same_definition() {
    let pipeline = Pipeline::of((1..=20).collect::<Vec<i32>>()).map(|x: i32| x + 1);

    let mut parallel = pipeline.clone().parallel().to_list().await.unwrap();
    let sequential = pipeline.sequential().to_list().await.unwrap();

    parallel.sort();
    assert_eq!(sequential, (2..=21).collect::<Vec<_>>());
    assert_eq!(parallel, sequential);
}

// ================================
// Filter / Map
// ================================

#[tokio::test]
async fn test_filter_chain() {
    let result = Pipeline::of(vec![1, 2, 3, 4, 5, 6])
        .filter(|x: &i32| *x > 3)
        .filter(|x: &i32| *x < 6)
        .to_list()
        .await;
    assert_eq!(result, Ok(vec![4, 5]));
}

#[tokio::test]
async fn test_filter_chain_suspending() {
    let result = Pipeline::of(vec![1, 2, 3, 4, 5, 6])
        .filter_async(|x: &i32| {
            let x = *x;
            async move {
                sleep(Duration::from_millis(1)).await;
                x > 3
            }
        })
        .filter_with(Predicate::suspending(|x: &i32| {
            let x = *x;
            async move { x < 6 }
        }))
        .to_list()
        .await;
    assert_eq!(result, Ok(vec![4, 5]));
}

#[tokio::test]
async fn test_filter_rejecting_everything() {
    let result = Pipeline::of((0..1000).collect::<Vec<i32>>())
        .filter(|_: &i32| false)
        .to_list()
        .await;
    assert_eq!(result, Ok(vec![]));
}

#[tokio::test]
async fn test_map_letters_to_ints_then_reduce() {
    let table = letter_to_int();
    let result = Pipeline::of(vec!['a', 'b', 'c', 'd'])
        .map(move |c: char| table[&c])
        .reduce(0, |acc, x| acc + x)
        .await;
    assert_eq!(result, Ok(10));
}

#[tokio::test]
async fn test_map_suspending() {
    let result = Pipeline::of(vec![1, 2, 3])
        .map_async(|x: i32| async move {
            sleep(Duration::from_millis(1)).await;
            format!("#{}", x)
        })
        .to_list()
        .await;
    assert_eq!(
        result,
        Ok(vec!["#1".to_string(), "#2".to_string(), "#3".to_string()])
    );
}

#[tokio::test]
async fn test_mixed_plain_and_suspending_stages() {
    let result = Pipeline::of(vec![1, 2, 3, 4, 5])
        .map_with(Mapper::suspending(|x: i32| async move { x * 3 }))
        .filter(|x: &i32| x % 2 == 1)
        .map(|x: i32| x + 1)
        .to_list()
        .await;
    assert_eq!(result, Ok(vec![4, 10, 16]));
}

#[tokio::test]
async fn test_map_error_aborts_before_later_elements() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let observed = pulled.clone();

    let result = Pipeline::of(vec![1, 2, 3, 4, 5, 6])
        .peek(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        })
        .try_map(|x: i32| {
            if x == 3 {
                Err(StreamError::custom("cannot map 3"))
            } else {
                Ok(x * 2)
            }
        })
        .to_list()
        .await;

    assert_eq!(result, Err(StreamError::custom("cannot map 3")));
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_sequence_ends_after_error() {
    let mut seq = Pipeline::of(vec![1, 2, 3])
        .try_map(|x: i32| {
            if x == 2 {
                Err(StreamError::custom("bad element"))
            } else {
                Ok(x)
            }
        })
        .drive();

    assert_eq!(seq.next().await, Some(Ok(1)));
    assert_eq!(seq.next().await, Some(Err(StreamError::custom("bad element"))));
    assert_eq!(seq.next().await, None);
}

// ================================
// Distinct / Peek
// ================================

#[tokio::test]
async fn test_distinct_keeps_first_occurrence_order() {
    let result = Pipeline::of(vec![1, 2, 2, 3, 1]).distinct().to_list().await;
    assert_eq!(result, Ok(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_distinct_state_is_per_drive() {
    let pipeline = Pipeline::of(vec!["x", "y", "x"]).distinct();
    assert_eq!(pipeline.to_list().await, Ok(vec!["x", "y"]));
    assert_eq!(pipeline.to_list().await, Ok(vec!["x", "y"]));
}

#[tokio::test]
async fn test_peek_passes_elements_unchanged() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();

    let result = Pipeline::of(vec![1, 2, 3])
        .peek(move |x: &i32| sink.lock().unwrap().push(*x))
        .map(|x: i32| x * 100)
        .to_list()
        .await;

    assert_eq!(result, Ok(vec![100, 200, 300]));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_peek_failure_aborts() {
    let result = Pipeline::of(vec![1, 2, 3])
        .peek_with(Consumer::try_suspending(|x: &i32| {
            let x = *x;
            async move {
                if x == 2 {
                    Err(StreamError::custom("observer failed"))
                } else {
                    Ok(())
                }
            }
        }))
        .to_list()
        .await;
    assert_eq!(result, Err(StreamError::custom("observer failed")));
}

// ================================
// Custom stages
// ================================

#[tokio::test]
async fn test_custom_stage() {
    let windowed: Stage<i32, i32> = Stage::custom(|upstream| upstream.take(2).boxed());
    assert_eq!(windowed.kind(), StageKind::Custom);

    let result = Pipeline::of(vec![5, 6, 7]).then(windowed).to_list().await;
    assert_eq!(result, Ok(vec![5, 6]));
}

#[tokio::test]
async fn test_prebuilt_stages_report_kind() {
    assert_eq!(stage::distinct::<i32>().kind(), StageKind::Distinct);
    assert_eq!(
        stage::filter(Predicate::plain(|x: &i32| *x > 0)).kind(),
        StageKind::Filter
    );
    assert_eq!(
        stage::map(Mapper::plain(|x: i32| x.to_string())).kind(),
        StageKind::Map
    );
}

// ================================
// Properties
// ================================

#[test]
fn prop_sequential_preserves_order() {
    fn prop(xs: Vec<i16>) -> bool {
        let expected: Vec<i32> = xs
            .iter()
            .map(|&x| x as i32 * 2)
            .filter(|x| x % 3 != 0)
            .collect();
        let result = tokio_test::block_on(
            Pipeline::of(xs)
                .map(|x: i16| x as i32 * 2)
                .filter(|x: &i32| x % 3 != 0)
                .to_list(),
        );
        result == Ok(expected)
    }
    quickcheck(prop as fn(Vec<i16>) -> bool);
}

#[test]
fn prop_distinct_matches_first_occurrences() {
    fn prop(xs: Vec<u8>) -> bool {
        let mut seen = std::collections::HashSet::new();
        let expected: Vec<u8> = xs.iter().copied().filter(|x| seen.insert(*x)).collect();
        let result = tokio_test::block_on(Pipeline::of(xs).distinct().to_list());
        result == Ok(expected)
    }
    quickcheck(prop as fn(Vec<u8>) -> bool);
}
