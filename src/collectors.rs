//! Collectors that exhaust a driven sequence in delivery order

use futures_util::StreamExt;

use crate::error::StreamResult;
use crate::source::PullSequence;

pub async fn to_list<T>(seq: PullSequence<T>) -> StreamResult<Vec<T>>
where
    T: Send + 'static,
{
    to_collection(seq).await
}

/// Pull one element at a time into any extendable container.
pub async fn to_collection<T, C>(mut seq: PullSequence<T>) -> StreamResult<C>
where
    T: Send + 'static,
    C: Default + Extend<T>,
{
    let mut collected = C::default();
    while let Some(next) = seq.next().await {
        collected.extend(Some(next?));
    }
    Ok(collected)
}
