//! Terminal operations
//!
//! Each terminal drives a fresh composition of the pipeline. Folds run to
//! exhaustion; matching and `find_any` stop pulling as soon as the answer is
//! known, which drops the drive and, in parallel mode, its outstanding
//! lanes. The first element error fails the terminal unchanged.

use futures_util::StreamExt;
use std::future::Future;

use crate::collectors;
use crate::error::StreamResult;
use crate::functions::{Accumulator, Comparator, Consumer, Predicate};
use crate::pipeline::Pipeline;

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// Collect every element in delivery order.
    pub async fn to_list(&self) -> StreamResult<Vec<T>> {
        collectors::to_list(self.drive()).await
    }

    pub async fn collect<C>(&self) -> StreamResult<C>
    where
        C: Default + Extend<T>,
    {
        collectors::to_collection(self.drive()).await
    }

    /// Left fold in delivery order.
    pub async fn reduce<A, F>(&self, identity: A, f: F) -> StreamResult<A>
    where
        A: Send + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        self.reduce_with(identity, Accumulator::plain(f)).await
    }

    pub async fn reduce_async<A, F, Fut>(&self, identity: A, f: F) -> StreamResult<A>
    where
        A: Send + 'static,
        F: Fn(A, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        self.reduce_with(identity, Accumulator::suspending(f)).await
    }

    pub async fn reduce_with<A>(&self, identity: A, accumulator: Accumulator<A, T>) -> StreamResult<A>
    where
        A: Send + 'static,
    {
        let mut seq = self.drive();
        let mut acc = identity;
        while let Some(next) = seq.next().await {
            let step = accumulator.combine(acc, next?);
            acc = step.await?;
        }
        Ok(acc)
    }

    pub async fn for_each<F>(&self, f: F) -> StreamResult<()>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.for_each_with(Consumer::plain(f)).await
    }

    pub async fn for_each_with(&self, consumer: Consumer<T>) -> StreamResult<()> {
        let mut seq = self.drive();
        while let Some(next) = seq.next().await {
            let item = next?;
            let observed = consumer.accept(&item);
            observed.await?;
        }
        Ok(())
    }

    pub async fn count(&self) -> StreamResult<usize> {
        let mut seq = self.drive();
        let mut count = 0;
        while let Some(next) = seq.next().await {
            next?;
            count += 1;
        }
        Ok(count)
    }

    /// The first delivered element.
    ///
    /// Under parallel execution this is the first element any lane finished,
    /// not the first in source order.
    pub async fn find_any(&self) -> StreamResult<Option<T>> {
        let mut seq = self.drive();
        match seq.next().await {
            Some(next) => next.map(Some),
            None => Ok(None),
        }
    }

    // ================================
    // Extrema
    // ================================

    pub async fn max_by<F>(&self, before: F) -> StreamResult<Option<T>>
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.max_with(Comparator::plain(before)).await
    }

    pub async fn min_by<F>(&self, before: F) -> StreamResult<Option<T>>
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.min_with(Comparator::plain(before)).await
    }

    /// Scan for the extremum under `comparator`.
    ///
    /// The first element is the provisional answer; a later element takes
    /// its place when `comparator.before(later, current)` holds.
    pub async fn max_with(&self, comparator: Comparator<T>) -> StreamResult<Option<T>> {
        let mut seq = self.drive();
        let mut found: Option<T> = None;
        while let Some(next) = seq.next().await {
            let item = next?;
            let check = found
                .as_ref()
                .map(|current| comparator.before(&item, current));
            let replace = match check {
                Some(pending) => pending.await?,
                None => true,
            };
            if replace {
                found = Some(item);
            }
        }
        Ok(found)
    }

    /// [`Pipeline::max_with`] under the inverted comparator.
    pub async fn min_with(&self, comparator: Comparator<T>) -> StreamResult<Option<T>> {
        self.max_with(comparator.inverted()).await
    }

    // ================================
    // Matching
    // ================================

    pub async fn any_match<F>(&self, predicate: F) -> StreamResult<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.any_match_with(Predicate::plain(predicate)).await
    }

    pub async fn all_match<F>(&self, predicate: F) -> StreamResult<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.all_match_with(Predicate::plain(predicate)).await
    }

    pub async fn none_match<F>(&self, predicate: F) -> StreamResult<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.none_match_with(Predicate::plain(predicate)).await
    }

    /// True at the first matching element; false for an empty pipeline.
    pub async fn any_match_with(&self, predicate: Predicate<T>) -> StreamResult<bool> {
        let mut seq = self.drive();
        while let Some(next) = seq.next().await {
            let item = next?;
            let check = predicate.test(&item);
            if check.await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// False at the first element that does not match; true when empty.
    pub async fn all_match_with(&self, predicate: Predicate<T>) -> StreamResult<bool> {
        self.none_match_with(predicate.negate()).await
    }

    /// False at the first matching element; true when empty.
    pub async fn none_match_with(&self, predicate: Predicate<T>) -> StreamResult<bool> {
        self.any_match_with(predicate).await.map(|any| !any)
    }
}
