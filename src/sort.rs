//! Stable sorting with plain or suspending comparators
//!
//! Both strategies are top-down merge sorts that stop at the first
//! comparator failure. Plain comparators are called inline by
//! [`plain_merge_sort`]; suspending ones go through [`merge_sort`], which
//! awaits every comparison. Both produce the same order for the same strict
//! weak ordering.

use futures_util::future::{BoxFuture, FutureExt};
use std::collections::VecDeque;

use crate::error::StreamResult;
use crate::functions::Comparator;

type PlainBefore<T> = dyn Fn(&T, &T) -> StreamResult<bool> + Send + Sync;

/// Sort `items` with whichever strategy fits the comparator.
pub async fn sort_buffer<T>(items: Vec<T>, comparator: &Comparator<T>) -> StreamResult<Vec<T>>
where
    T: Send + 'static,
{
    match comparator {
        Comparator::Plain(before) => plain_merge_sort(items, before.as_ref()),
        Comparator::Suspending(_) => merge_sort(items, comparator).await,
    }
}

/// Stable merge sort over a synchronous comparator.
///
/// The first comparator error is returned as is and the buffer is dropped.
pub fn plain_merge_sort<T>(items: Vec<T>, before: &PlainBefore<T>) -> StreamResult<Vec<T>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = plain_merge_sort(left, before)?;
    let right = plain_merge_sort(right, before)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = VecDeque::from(left);
    let mut right = VecDeque::from(right);
    loop {
        let take_right = match (left.front(), right.front()) {
            (Some(l), Some(r)) => before(r, l)?,
            _ => break,
        };
        let next = if take_right {
            right.pop_front()
        } else {
            left.pop_front()
        };
        merged.extend(next);
    }

    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Top-down merge sort that awaits each comparison.
///
/// Works for plain comparators too, but [`sort_buffer`] sends those to
/// [`plain_merge_sort`].
pub fn merge_sort<'a, T>(
    items: Vec<T>,
    comparator: &'a Comparator<T>,
) -> BoxFuture<'a, StreamResult<Vec<T>>>
where
    T: Send + 'static,
{
    async move {
        if items.len() <= 1 {
            return Ok(items);
        }
        let mut left = items;
        let right = left.split_off(left.len() / 2);
        let left = merge_sort(left, comparator).await?;
        let right = merge_sort(right, comparator).await?;
        merge(left, right, comparator).await
    }
    .boxed()
}

// The right head is taken only when it sorts strictly before the left head,
// so equal elements keep their input order.
async fn merge<T>(left: Vec<T>, right: Vec<T>, comparator: &Comparator<T>) -> StreamResult<Vec<T>>
where
    T: Send + 'static,
{
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = VecDeque::from(left);
    let mut right = VecDeque::from(right);

    loop {
        let pending = match (left.front(), right.front()) {
            (Some(l), Some(r)) => comparator.before(r, l),
            _ => break,
        };
        let next = if pending.await? {
            right.pop_front()
        } else {
            left.pop_front()
        };
        merged.extend(next);
    }

    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}
