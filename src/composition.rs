//! Composition of a stage chain onto its source
//!
//! A pipeline definition is a chain of [`Staged`] links ending in a
//! [`Root`]. Nothing in the chain is mutated by a drive: composing walks the
//! links read-only, asks every stage for fresh per-drive state and applies
//! the stages left to right. The sequences it returns have not pulled
//! anything yet.

use futures_util::StreamExt;
use std::sync::Arc;

use crate::source::{PullSequence, SharedSource, SourceFactory};
use crate::stage::Stage;

/// A composable stage chain over a source, erased to its output type.
pub trait Composition<T>: Send + Sync {
    /// Open the source once and build `lanes` runtime compositions over it.
    ///
    /// With one lane the source is used directly. With more, every lane
    /// pulls from the same [`SharedSource`].
    fn compose(&self, lanes: usize) -> Vec<PullSequence<T>>;

    /// Number of stages between the source and this point.
    fn depth(&self) -> usize;
}

pub struct Root<T> {
    open: SourceFactory<T>,
}

impl<T> Root<T> {
    pub fn new(open: SourceFactory<T>) -> Self {
        Root { open }
    }
}

impl<T> Composition<T> for Root<T>
where
    T: Send + 'static,
{
    fn compose(&self, lanes: usize) -> Vec<PullSequence<T>> {
        let source = (self.open)();
        if lanes <= 1 {
            return vec![source.fuse().boxed()];
        }
        let shared = SharedSource::new(source);
        (0..lanes).map(|_| shared.pull_sequence()).collect()
    }

    fn depth(&self) -> usize {
        0
    }
}

pub struct Staged<I, O> {
    upstream: Arc<dyn Composition<I>>,
    stage: Stage<I, O>,
}

impl<I, O> Staged<I, O> {
    pub fn new(upstream: Arc<dyn Composition<I>>, stage: Stage<I, O>) -> Self {
        Staged { upstream, stage }
    }
}

impl<I, O> Composition<O> for Staged<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn compose(&self, lanes: usize) -> Vec<PullSequence<O>> {
        let apply = self.stage.instantiate();
        log::trace!(
            "composing {:?} stage at depth {} over {} lane(s)",
            self.stage.kind(),
            self.depth(),
            lanes
        );
        self.upstream
            .compose(lanes)
            .into_iter()
            .map(|lane| apply(lane))
            .collect()
    }

    fn depth(&self) -> usize {
        self.upstream.depth() + 1
    }
}
