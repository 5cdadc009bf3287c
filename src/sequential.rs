use async_stream::stream;
use futures_util::StreamExt;
use std::sync::Arc;

use crate::composition::Composition;
use crate::source::PullSequence;

/// Drive a composition with a single, strictly ordered consumer.
///
/// The chain is composed on the first pull. Output order is the order the
/// stage chain produces from the source in arrival order. The sequence ends
/// after forwarding the first error.
pub fn run_sequential<T>(composition: Arc<dyn Composition<T>>) -> PullSequence<T>
where
    T: Send + 'static,
{
    stream! {
        let mut lanes = composition.compose(1);
        if let Some(mut lane) = lanes.pop() {
            while let Some(next) = lane.next().await {
                let failed = next.is_err();
                yield next;
                if failed {
                    break;
                }
            }
        }
    }
    .boxed()
}
