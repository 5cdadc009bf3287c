//! Source normalization and the shared lane source
//!
//! Every input a pipeline accepts is turned into a [`SourceFactory`]: a
//! function that opens a fresh [`PullSequence`] for one drive. In-memory
//! collections are replayable; already-lazy streams and channel receivers
//! are one-shot and report a usage error if a second drive asks for them.

use async_stream::stream;
use futures_core::Stream;
use futures_util::future;
use futures_util::stream::{self, BoxStream, Fuse, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{StreamError, StreamResult};

/// A lazily pulled sequence: one item per pull, `None` once exhausted.
///
/// Stages forward the first `Err` they see and then end, so a failed
/// sequence never produces further items.
pub type PullSequence<T> = BoxStream<'static, StreamResult<T>>;

/// Opens the source of a pipeline for one drive.
pub type SourceFactory<T> = Arc<dyn Fn() -> PullSequence<T> + Send + Sync>;

fn items<I, T>(iter: I) -> PullSequence<T>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
{
    stream::iter(iter).map(Ok).boxed()
}

fn failed<T>(err: StreamError) -> PullSequence<T>
where
    T: Send + 'static,
{
    stream::once(future::ready(Err(err))).boxed()
}

/// Replayable source over an in-memory collection.
pub fn from_iter<I, T>(iter: I) -> SourceFactory<T>
where
    I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
{
    Arc::new(move || items(iter.clone()))
}

/// Source that can be opened exactly once.
pub fn one_shot<S, T>(s: S) -> SourceFactory<T>
where
    S: Stream<Item = StreamResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let slot = Arc::new(std::sync::Mutex::new(Some(s.boxed())));
    Arc::new(move || {
        let taken = slot.lock().ok().and_then(|mut guard| guard.take());
        match taken {
            Some(s) => s,
            None => failed(StreamError::Usage(
                "one-shot source has already been drained".to_string(),
            )),
        }
    })
}

/// One-shot source over an already-lazy stream of plain values.
pub fn from_stream<S, T>(s: S) -> SourceFactory<T>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    one_shot(s.map(Ok))
}

/// One-shot source over a fallible stream; the first `Err` ends the drive.
pub fn from_try_stream<S, T, E>(s: S) -> SourceFactory<T>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<StreamError>,
{
    one_shot(s.map(|item| item.map_err(Into::into)))
}

/// One-shot source fed by an external producer pushing into a channel.
pub fn from_receiver<T>(rx: mpsc::Receiver<T>) -> SourceFactory<T>
where
    T: Send + 'static,
{
    from_stream(ReceiverStream::new(rx))
}

/// All of `first`, then all of `second`.
pub fn concat<T>(first: SourceFactory<T>, second: SourceFactory<T>) -> SourceFactory<T>
where
    T: Send + 'static,
{
    Arc::new(move || first().chain(second()).boxed())
}

/// One upstream sequence shared by every lane of a parallel drive.
///
/// Each pull takes the lock for exactly one step of the underlying sequence,
/// so at most one lane is advancing the source at any instant. Lanes waiting
/// for the lock are served in arrival order.
pub struct SharedSource<T> {
    inner: Arc<Mutex<Fuse<PullSequence<T>>>>,
}

impl<T> Clone for SharedSource<T> {
    fn clone(&self) -> Self {
        SharedSource {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedSource<T>
where
    T: Send + 'static,
{
    pub fn new(seq: PullSequence<T>) -> Self {
        SharedSource {
            inner: Arc::new(Mutex::new(seq.fuse())),
        }
    }

    /// A lane's view of the source. Items are split between views, never
    /// duplicated.
    pub fn pull_sequence(&self) -> PullSequence<T> {
        let inner = Arc::clone(&self.inner);
        stream! {
            loop {
                let next = {
                    let mut source = inner.lock().await;
                    source.next().await
                };
                match next {
                    Some(item) => yield item,
                    None => break,
                }
            }
        }
        .boxed()
    }
}
