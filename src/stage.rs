use async_stream::stream;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::StreamResult;
use crate::functions::{Comparator, Consumer, Mapper, Predicate};
use crate::pipeline::Pipeline;
use crate::sort::sort_buffer;
use crate::source::PullSequence;

/// A runtime transformation from one pull sequence to another.
pub type Applier<I, O> = Arc<dyn Fn(PullSequence<I>) -> PullSequence<O> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Filter,
    Map,
    FlatMap,
    Distinct,
    Peek,
    Sorted,
    Custom,
}

/// A Stage represents one step of a pipeline, a function from Stream[I] to
/// Stream[O].
///
/// A stage is immutable once built. Each drive calls [`Stage::instantiate`]
/// once to get an [`Applier`] holding whatever state the stage needs for
/// that drive, then applies it to every lane.
pub struct Stage<I, O> {
    kind: StageKind,
    instantiate: Arc<dyn Fn() -> Applier<I, O> + Send + Sync>,
}

impl<I, O> Clone for Stage<I, O> {
    fn clone(&self) -> Self {
        Stage {
            kind: self.kind,
            instantiate: Arc::clone(&self.instantiate),
        }
    }
}

impl<I: 'static, O: 'static> Stage<I, O> {
    /// Create a stage whose per-drive state is built by `instantiate`
    pub fn new<F>(kind: StageKind, instantiate: F) -> Self
    where
        F: Fn() -> Applier<I, O> + Send + Sync + 'static,
    {
        Stage {
            kind,
            instantiate: Arc::new(instantiate),
        }
    }

    /// Create a stage with no per-drive state
    pub fn stateless<F>(kind: StageKind, apply: F) -> Self
    where
        F: Fn(PullSequence<I>) -> PullSequence<O> + Send + Sync + 'static,
    {
        let apply: Applier<I, O> = Arc::new(apply);
        Stage::new(kind, move || Arc::clone(&apply))
    }

    /// Create a stage from an arbitrary sequence transformation
    pub fn custom<F>(apply: F) -> Self
    where
        F: Fn(PullSequence<I>) -> PullSequence<O> + Send + Sync + 'static,
    {
        Stage::stateless(StageKind::Custom, apply)
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn instantiate(&self) -> Applier<I, O> {
        (self.instantiate)()
    }
}

/// Keep the elements the predicate accepts.
///
/// Rejected elements are pulled past without emitting, so a long run of
/// rejections keeps this stage pulling upstream until something passes.
pub fn filter<T>(predicate: Predicate<T>) -> Stage<T, T>
where
    T: Send + 'static,
{
    Stage::stateless(StageKind::Filter, move |upstream: PullSequence<T>| {
        let predicate = predicate.clone();
        stream! {
            let mut upstream = upstream;
            while let Some(next) = upstream.next().await {
                let item = match next {
                    Ok(item) => item,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                let check = predicate.test(&item);
                match check.await {
                    Ok(true) => yield Ok(item),
                    Ok(false) => {}
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        .boxed()
    })
}

/// Transform every element, one output per input.
pub fn map<T, U>(mapper: Mapper<T, U>) -> Stage<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    Stage::stateless(StageKind::Map, move |upstream: PullSequence<T>| {
        let mapper = mapper.clone();
        stream! {
            let mut upstream = upstream;
            while let Some(next) = upstream.next().await {
                let item = match next {
                    Ok(item) => item,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                let mapped = mapper.apply(item);
                match mapped.await {
                    Ok(value) => yield Ok(value),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        .boxed()
    })
}

/// Replace each element with the full contents of the pipeline built for it.
///
/// Outer elements are expanded one at a time: the nested pipeline is drained
/// completely before the next outer element is pulled.
pub fn flat_map<T, U>(
    expand: Arc<dyn Fn(T) -> StreamResult<Pipeline<U>> + Send + Sync>,
) -> Stage<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    Stage::stateless(StageKind::FlatMap, move |upstream: PullSequence<T>| {
        let expand = Arc::clone(&expand);
        stream! {
            let mut upstream = upstream;
            'outer: while let Some(next) = upstream.next().await {
                let item = match next {
                    Ok(item) => item,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                let nested = match expand(item) {
                    Ok(nested) => nested,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                let mut inner = nested.drive();
                while let Some(value) = inner.next().await {
                    let failed = value.is_err();
                    yield value;
                    if failed {
                        break 'outer;
                    }
                }
            }
        }
        .boxed()
    })
}

/// Drop every element equal to one already emitted during this drive.
///
/// The seen-set lives for one drive and is shared by all of its lanes. It
/// only grows.
pub fn distinct<T>() -> Stage<T, T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    Stage::new(StageKind::Distinct, || {
        let seen: Arc<Mutex<HashSet<T>>> = Arc::new(Mutex::new(HashSet::new()));
        let apply: Applier<T, T> = Arc::new(move |upstream: PullSequence<T>| {
            let seen = Arc::clone(&seen);
            stream! {
                let mut upstream = upstream;
                while let Some(next) = upstream.next().await {
                    let item = match next {
                        Ok(item) => item,
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    };
                    let first_sighting = seen.lock().await.insert(item.clone());
                    if first_sighting {
                        yield Ok(item);
                    }
                }
            }
            .boxed()
        });
        apply
    })
}

/// Hand each element to the consumer, then pass it on unchanged.
pub fn peek<T>(consumer: Consumer<T>) -> Stage<T, T>
where
    T: Send + 'static,
{
    Stage::stateless(StageKind::Peek, move |upstream: PullSequence<T>| {
        let consumer = consumer.clone();
        stream! {
            let mut upstream = upstream;
            while let Some(next) = upstream.next().await {
                let item = match next {
                    Ok(item) => item,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                let observed = consumer.accept(&item);
                match observed.await {
                    Ok(()) => yield Ok(item),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        .boxed()
    })
}

/// Buffer the whole upstream, sort it, then emit it in order.
///
/// Nothing is emitted until upstream is exhausted. An upstream error is
/// forwarded without sorting what was buffered.
pub fn sorted<T>(comparator: Comparator<T>, reverse: bool) -> Stage<T, T>
where
    T: Send + 'static,
{
    Stage::stateless(StageKind::Sorted, move |upstream: PullSequence<T>| {
        let comparator = comparator.clone();
        stream! {
            let mut upstream = upstream;
            let mut buffer = Vec::new();
            let mut failure = None;
            while let Some(next) = upstream.next().await {
                match next {
                    Ok(item) => buffer.push(item),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            match failure {
                Some(e) => {
                    yield Err(e);
                }
                None => match sort_buffer(buffer, &comparator).await {
                    Ok(ordered) => {
                        if reverse {
                            for item in ordered.into_iter().rev() {
                                yield Ok(item);
                            }
                        } else {
                            for item in ordered {
                                yield Ok(item);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                    }
                },
            }
        }
        .boxed()
    })
}
