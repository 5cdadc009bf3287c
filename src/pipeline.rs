//! The pipeline definition and its builder-style API
//!
//! A [`Pipeline`] is an immutable description: a source, an ordered chain of
//! stages and an execution configuration. Adding a stage returns a new
//! definition sharing the old chain. Nothing runs until a terminal operation
//! (or [`Pipeline::drive`]) pulls, and every drive composes its own runtime
//! state, so a definition over a replayable source can be driven any number
//! of times.
//!
//! # Examples
//! ```
//! use fanout_stream::Pipeline;
//!
//! # async fn example() {
//! let total = Pipeline::of(vec![1, 2, 3, 4, 5, 6])
//!     .filter(|x: &i32| *x > 3)
//!     .map(|x: i32| x * 10)
//!     .reduce(0, |acc, x| acc + x)
//!     .await;
//! assert_eq!(total, Ok(150));
//! # }
//! ```

use futures_core::Stream;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::builder::StreamBuilder;
use crate::composition::{Composition, Root, Staged};
use crate::error::{StreamError, StreamResult};
use crate::functions::{Comparator, Consumer, FlatMapper, Mapper, Predicate};
use crate::parallel::run_parallel;
use crate::sequential::run_sequential;
use crate::source::{self, PullSequence, SourceFactory};
use crate::stage::{self, Stage};
use crate::stream_configuration::{ExecutionConfig, ExecutionMode, ParallelConfig};

pub struct Pipeline<T> {
    composition: Arc<dyn Composition<T>>,
    config: ExecutionConfig,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Pipeline {
            composition: Arc::clone(&self.composition),
            config: self.config.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("depth", &self.composition.depth())
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    // ================================
    // Sources
    // ================================

    /// Pipeline over a source factory.
    pub fn from_source(open: SourceFactory<T>) -> Self {
        Pipeline {
            composition: Arc::new(Root::new(open)),
            config: ExecutionConfig::default(),
        }
    }

    /// Pipeline over an in-memory collection. Replayable.
    pub fn of<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::from_source(source::from_iter(iter))
    }

    pub fn empty() -> Self {
        Self::of(std::iter::empty())
    }

    /// Pipeline over an already-lazy stream. Can be driven once.
    pub fn from_stream<S>(s: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::from_source(source::from_stream(s))
    }

    /// Pipeline over a fallible stream. Can be driven once.
    pub fn from_try_stream<S, E>(s: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Self::from_source(source::from_try_stream(s))
    }

    /// Pipeline over values pushed into a channel. Can be driven once.
    pub fn from_receiver(rx: mpsc::Receiver<T>) -> Self {
        Self::from_source(source::from_receiver(rx))
    }

    /// Every element of `first`, then every element of `second`.
    ///
    /// Each side is driven with its own configuration; the result starts out
    /// sequential.
    pub fn concat(first: Pipeline<T>, second: Pipeline<T>) -> Self {
        let first: SourceFactory<T> = Arc::new(move || first.drive());
        let second: SourceFactory<T> = Arc::new(move || second.drive());
        Self::from_source(source::concat(first, second))
    }

    pub fn builder() -> StreamBuilder<T> {
        StreamBuilder::new()
    }

    // ================================
    // Intermediaries
    // ================================

    /// Append a prebuilt stage.
    pub fn then<U>(self, stage: Stage<T, U>) -> Pipeline<U>
    where
        U: Send + 'static,
    {
        Pipeline {
            composition: Arc::new(Staged::new(self.composition, stage)),
            config: self.config,
        }
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter_with(Predicate::plain(predicate))
    }

    pub fn filter_async<F, Fut>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.filter_with(Predicate::suspending(predicate))
    }

    pub fn filter_with(self, predicate: Predicate<T>) -> Self {
        self.then(stage::filter(predicate))
    }

    pub fn map<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_with(Mapper::plain(f))
    }

    pub fn map_async<U, F, Fut>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        self.map_with(Mapper::suspending(f))
    }

    /// Map with a function that may fail; the first failure ends the drive.
    pub fn try_map<U, E, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        E: Into<StreamError>,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        self.map_with(Mapper::try_plain(f))
    }

    pub fn map_with<U>(self, mapper: Mapper<T, U>) -> Pipeline<U>
    where
        U: Send + 'static,
    {
        self.then(stage::map(mapper))
    }

    /// Replace each element with the elements of the pipeline `f` builds for
    /// it, draining each nested pipeline before pulling the next element.
    pub fn flat_map<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Pipeline<U> + Send + Sync + 'static,
    {
        self.then(stage::flat_map(Arc::new(
            move |item: T| -> StreamResult<Pipeline<U>> { Ok(f(item)) },
        )))
    }

    /// Like [`Pipeline::flat_map`], for elements that may not be expandable.
    pub fn try_flat_map<U, E, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        E: Into<StreamError>,
        F: Fn(T) -> Result<Pipeline<U>, E> + Send + Sync + 'static,
    {
        self.then(stage::flat_map(Arc::new(
            move |item: T| -> StreamResult<Pipeline<U>> { f(item).map_err(Into::into) },
        )))
    }

    /// Fails with [`StreamError::Build`] if the flat mapper is suspending.
    pub fn flat_map_with<U>(self, flat_mapper: FlatMapper<T, U>) -> StreamResult<Pipeline<U>>
    where
        U: Send + 'static,
    {
        let expand = flat_mapper.into_plain()?;
        Ok(self.then(stage::flat_map(expand)))
    }

    /// Drop repeats of elements already emitted during the drive.
    ///
    /// Remembers every distinct element for the rest of the drive.
    pub fn distinct(self) -> Self
    where
        T: Eq + Hash + Clone + Sync,
    {
        self.then(stage::distinct())
    }

    pub fn peek<F>(self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.peek_with(Consumer::plain(f))
    }

    pub fn peek_with(self, consumer: Consumer<T>) -> Self {
        self.then(stage::peek(consumer))
    }

    /// Sort by natural order. Buffers the whole upstream first.
    pub fn sorted(self) -> Self
    where
        T: Ord,
    {
        self.sorted_with(Comparator::plain(|a: &T, b: &T| a < b), false)
    }

    /// Sort by a partial order; a pair with no defined order fails the drive
    /// with [`StreamError::Usage`] when the sort runs.
    pub fn sorted_partial(self) -> Self
    where
        T: PartialOrd,
    {
        self.sorted_with(
            Comparator::try_plain(|a: &T, b: &T| -> StreamResult<bool> {
                a.partial_cmp(b)
                    .map(|order| order == std::cmp::Ordering::Less)
                    .ok_or_else(|| {
                        StreamError::Usage("elements are not mutually comparable".to_string())
                    })
            }),
            false,
        )
    }

    /// Sort with `before(a, b)` meaning `a` goes ahead of `b`.
    pub fn sorted_by<F>(self, before: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.sorted_with(Comparator::plain(before), false)
    }

    pub fn sorted_with(self, comparator: Comparator<T>, reverse: bool) -> Self {
        self.then(stage::sorted(comparator, reverse))
    }

    // ================================
    // Execution mode
    // ================================

    pub fn sequential(mut self) -> Self {
        self.config.mode = ExecutionMode::Sequential;
        self
    }

    /// Fan the whole stage chain out over the configured number of lanes.
    ///
    /// Elements are emitted in completion order, not source order.
    pub fn parallel(mut self) -> Self {
        self.config.mode = ExecutionMode::Parallel;
        self
    }

    pub fn parallel_with(self, lanes: usize) -> StreamResult<Self> {
        self.parallel_with_config(ParallelConfig { lanes })
    }

    pub fn parallel_with_config(mut self, config: ParallelConfig) -> StreamResult<Self> {
        config.validate()?;
        self.config.parallel = config;
        Ok(self.parallel())
    }

    pub fn is_parallel(&self) -> bool {
        self.config.mode == ExecutionMode::Parallel
    }

    /// Lanes a drive of this pipeline builds.
    pub fn lanes(&self) -> usize {
        self.config.lane_count()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Number of stages in the chain.
    pub fn depth(&self) -> usize {
        self.composition.depth()
    }

    /// Compose the chain for a new drive and return its output sequence.
    ///
    /// Nothing is pulled from the source until the returned sequence is.
    pub fn drive(&self) -> PullSequence<T> {
        match self.config.mode {
            ExecutionMode::Sequential => run_sequential(Arc::clone(&self.composition)),
            ExecutionMode::Parallel => {
                run_parallel(Arc::clone(&self.composition), self.config.lane_count())
            }
        }
    }
}
