//! Fan-out execution over lanes
//!
//! A parallel drive composes the full stage chain once per lane, every lane
//! pulling from one shared source, and emits whichever lane produces an
//! element first. All lane futures live in one `FuturesUnordered` owned by
//! the output sequence, so lanes only make progress while the consumer is
//! pulling and are dropped together with the sequence.
//!
//! Output order is completion order, not source order: a cheap element on
//! one lane overtakes an expensive element that started earlier on another.

use async_stream::stream;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

use crate::composition::Composition;
use crate::error::StreamResult;
use crate::source::PullSequence;

struct LanePull<T> {
    lane: usize,
    next: Option<StreamResult<T>>,
    seq: PullSequence<T>,
}

async fn pull<T>(lane: usize, mut seq: PullSequence<T>) -> LanePull<T>
where
    T: Send + 'static,
{
    let next = seq.next().await;
    LanePull { lane, next, seq }
}

/// Drive `lanes` copies of the composition concurrently.
///
/// On the first lane error every other outstanding lane pull is dropped
/// before the error is emitted, and the sequence ends.
pub fn run_parallel<T>(composition: Arc<dyn Composition<T>>, lanes: usize) -> PullSequence<T>
where
    T: Send + 'static,
{
    stream! {
        let sequences = composition.compose(lanes);
        let total = sequences.len();
        log::debug!(
            "fanning out {} stage(s) over {} lanes",
            composition.depth(),
            total
        );

        let mut pending = FuturesUnordered::new();
        for (lane, seq) in sequences.into_iter().enumerate() {
            pending.push(pull(lane, seq));
        }

        let mut retired = 0;
        while let Some(LanePull { lane, next, seq }) = pending.next().await {
            match next {
                Some(Ok(item)) => {
                    yield Ok(item);
                    pending.push(pull(lane, seq));
                }
                Some(Err(e)) => {
                    log::warn!(
                        "lane {} failed, cancelling {} outstanding lane(s): {}",
                        lane,
                        pending.len(),
                        e
                    );
                    pending.clear();
                    yield Err(e);
                    break;
                }
                None => {
                    retired += 1;
                    log::debug!("lane {} retired ({}/{})", lane, retired, total);
                }
            }
        }
    }
    .boxed()
}
