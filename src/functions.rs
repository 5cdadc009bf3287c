//! User function wrappers
//!
//! Every function handed to a pipeline is wrapped in one of these tagged
//! types when the pipeline is built. The tag says whether the function is
//! plain (called synchronously where it is invoked) or suspending (its future
//! is awaited there). Stages dispatch on the tag, never on the value.
//!
//! Each wrapper has four constructors: `plain`, `try_plain`, `suspending`
//! and `try_suspending`. The `try_` forms let a function fail with anything
//! convertible into [`StreamError`]; the failure aborts the sequence.

use futures_util::future::{self, BoxFuture, Either, FutureExt, Ready};
use std::future::Future;
use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::pipeline::Pipeline;

/// The pending result of one user function invocation.
///
/// Plain functions have already run by the time this is returned; suspending
/// functions run when it is awaited. The future never borrows its arguments.
pub type Invocation<R> = Either<Ready<StreamResult<R>>, BoxFuture<'static, StreamResult<R>>>;

// ================================
// Predicate
// ================================

/// Element test used by `filter` and the matching terminals.
pub enum Predicate<T> {
    Plain(Arc<dyn Fn(&T) -> StreamResult<bool> + Send + Sync>),
    Suspending(Arc<dyn Fn(&T) -> BoxFuture<'static, StreamResult<bool>> + Send + Sync>),
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Plain(f) => Predicate::Plain(Arc::clone(f)),
            Predicate::Suspending(f) => Predicate::Suspending(Arc::clone(f)),
        }
    }
}

impl<T: 'static> Predicate<T> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Predicate::Plain(Arc::new(move |item: &T| -> StreamResult<bool> { Ok(f(item)) }))
    }

    pub fn try_plain<F, E>(f: F) -> Self
    where
        F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<StreamError>,
    {
        Predicate::Plain(Arc::new(move |item: &T| -> StreamResult<bool> {
            f(item).map_err(Into::into)
        }))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Predicate::Suspending(Arc::new(
            move |item: &T| -> BoxFuture<'static, StreamResult<bool>> {
                let fut = f(item);
                async move { Ok(fut.await) }.boxed()
            },
        ))
    }

    pub fn try_suspending<F, Fut, E>(f: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Predicate::Suspending(Arc::new(
            move |item: &T| -> BoxFuture<'static, StreamResult<bool>> {
                let fut = f(item);
                async move { fut.await.map_err(Into::into) }.boxed()
            },
        ))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Predicate::Suspending(_))
    }

    pub fn test(&self, item: &T) -> Invocation<bool> {
        match self {
            Predicate::Plain(f) => Either::Left(future::ready(f(item))),
            Predicate::Suspending(f) => Either::Right(f(item)),
        }
    }

    /// The same test with its answer inverted.
    pub fn negate(&self) -> Self {
        match self {
            Predicate::Plain(f) => {
                let f = Arc::clone(f);
                Predicate::Plain(Arc::new(move |item: &T| -> StreamResult<bool> {
                    f(item).map(|keep| !keep)
                }))
            }
            Predicate::Suspending(f) => {
                let f = Arc::clone(f);
                Predicate::Suspending(Arc::new(
                    move |item: &T| -> BoxFuture<'static, StreamResult<bool>> {
                        f(item).map(|keep| keep.map(|k| !k)).boxed()
                    },
                ))
            }
        }
    }
}

// ================================
// Mapper
// ================================

/// One-to-one element transformation used by `map`.
pub enum Mapper<T, U> {
    Plain(Arc<dyn Fn(T) -> StreamResult<U> + Send + Sync>),
    Suspending(Arc<dyn Fn(T) -> BoxFuture<'static, StreamResult<U>> + Send + Sync>),
}

impl<T, U> Clone for Mapper<T, U> {
    fn clone(&self) -> Self {
        match self {
            Mapper::Plain(f) => Mapper::Plain(Arc::clone(f)),
            Mapper::Suspending(f) => Mapper::Suspending(Arc::clone(f)),
        }
    }
}

impl<T: 'static, U: Send + 'static> Mapper<T, U> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Mapper::Plain(Arc::new(move |item: T| -> StreamResult<U> { Ok(f(item)) }))
    }

    pub fn try_plain<F, E>(f: F) -> Self
    where
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
        E: Into<StreamError>,
    {
        Mapper::Plain(Arc::new(move |item: T| -> StreamResult<U> {
            f(item).map_err(Into::into)
        }))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        Mapper::Suspending(Arc::new(
            move |item: T| -> BoxFuture<'static, StreamResult<U>> {
                let fut = f(item);
                async move { Ok(fut.await) }.boxed()
            },
        ))
    }

    pub fn try_suspending<F, Fut, E>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Mapper::Suspending(Arc::new(
            move |item: T| -> BoxFuture<'static, StreamResult<U>> {
                let fut = f(item);
                async move { fut.await.map_err(Into::into) }.boxed()
            },
        ))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Mapper::Suspending(_))
    }

    pub fn apply(&self, item: T) -> Invocation<U> {
        match self {
            Mapper::Plain(f) => Either::Left(future::ready(f(item))),
            Mapper::Suspending(f) => Either::Right(f(item)),
        }
    }
}

// ================================
// Consumer
// ================================

/// Side-effecting observer used by `peek` and `for_each`.
pub enum Consumer<T> {
    Plain(Arc<dyn Fn(&T) -> StreamResult<()> + Send + Sync>),
    Suspending(Arc<dyn Fn(&T) -> BoxFuture<'static, StreamResult<()>> + Send + Sync>),
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        match self {
            Consumer::Plain(f) => Consumer::Plain(Arc::clone(f)),
            Consumer::Suspending(f) => Consumer::Suspending(Arc::clone(f)),
        }
    }
}

impl<T: 'static> Consumer<T> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Consumer::Plain(Arc::new(move |item: &T| -> StreamResult<()> {
            f(item);
            Ok(())
        }))
    }

    pub fn try_plain<F, E>(f: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<StreamError>,
    {
        Consumer::Plain(Arc::new(move |item: &T| -> StreamResult<()> {
            f(item).map_err(Into::into)
        }))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Consumer::Suspending(Arc::new(
            move |item: &T| -> BoxFuture<'static, StreamResult<()>> {
                let fut = f(item);
                async move {
                    fut.await;
                    Ok(())
                }
                .boxed()
            },
        ))
    }

    pub fn try_suspending<F, Fut, E>(f: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Consumer::Suspending(Arc::new(
            move |item: &T| -> BoxFuture<'static, StreamResult<()>> {
                let fut = f(item);
                async move { fut.await.map_err(Into::into) }.boxed()
            },
        ))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Consumer::Suspending(_))
    }

    pub fn accept(&self, item: &T) -> Invocation<()> {
        match self {
            Consumer::Plain(f) => Either::Left(future::ready(f(item))),
            Consumer::Suspending(f) => Either::Right(f(item)),
        }
    }
}

// ================================
// Comparator
// ================================

/// Ordering relation: `before(a, b)` is true when `a` sorts strictly ahead
/// of `b`. Must be a strict weak ordering.
pub enum Comparator<T> {
    Plain(Arc<dyn Fn(&T, &T) -> StreamResult<bool> + Send + Sync>),
    Suspending(Arc<dyn Fn(&T, &T) -> BoxFuture<'static, StreamResult<bool>> + Send + Sync>),
}

impl<T> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        match self {
            Comparator::Plain(f) => Comparator::Plain(Arc::clone(f)),
            Comparator::Suspending(f) => Comparator::Suspending(Arc::clone(f)),
        }
    }
}

impl<T: 'static> Comparator<T> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Comparator::Plain(Arc::new(move |a: &T, b: &T| -> StreamResult<bool> {
            Ok(f(a, b))
        }))
    }

    pub fn try_plain<F, E>(f: F) -> Self
    where
        F: Fn(&T, &T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<StreamError>,
    {
        Comparator::Plain(Arc::new(move |a: &T, b: &T| -> StreamResult<bool> {
            f(a, b).map_err(Into::into)
        }))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(&T, &T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Comparator::Suspending(Arc::new(
            move |a: &T, b: &T| -> BoxFuture<'static, StreamResult<bool>> {
                let fut = f(a, b);
                async move { Ok(fut.await) }.boxed()
            },
        ))
    }

    pub fn try_suspending<F, Fut, E>(f: F) -> Self
    where
        F: Fn(&T, &T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Comparator::Suspending(Arc::new(
            move |a: &T, b: &T| -> BoxFuture<'static, StreamResult<bool>> {
                let fut = f(a, b);
                async move { fut.await.map_err(Into::into) }.boxed()
            },
        ))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Comparator::Suspending(_))
    }

    pub fn before(&self, a: &T, b: &T) -> Invocation<bool> {
        match self {
            Comparator::Plain(f) => Either::Left(future::ready(f(a, b))),
            Comparator::Suspending(f) => Either::Right(f(a, b)),
        }
    }

    /// The logical inverse: `before(a, b)` becomes `!before(a, b)`.
    ///
    /// `min` scans with this under the `max` rule.
    pub fn inverted(&self) -> Self {
        match self {
            Comparator::Plain(f) => {
                let f = Arc::clone(f);
                Comparator::Plain(Arc::new(move |a: &T, b: &T| -> StreamResult<bool> {
                    f(a, b).map(|before| !before)
                }))
            }
            Comparator::Suspending(f) => {
                let f = Arc::clone(f);
                Comparator::Suspending(Arc::new(
                    move |a: &T, b: &T| -> BoxFuture<'static, StreamResult<bool>> {
                        f(a, b).map(|before| before.map(|b| !b)).boxed()
                    },
                ))
            }
        }
    }
}

// ================================
// Accumulator
// ================================

/// Left-fold step used by `reduce`.
pub enum Accumulator<A, T> {
    Plain(Arc<dyn Fn(A, T) -> StreamResult<A> + Send + Sync>),
    Suspending(Arc<dyn Fn(A, T) -> BoxFuture<'static, StreamResult<A>> + Send + Sync>),
}

impl<A, T> Clone for Accumulator<A, T> {
    fn clone(&self) -> Self {
        match self {
            Accumulator::Plain(f) => Accumulator::Plain(Arc::clone(f)),
            Accumulator::Suspending(f) => Accumulator::Suspending(Arc::clone(f)),
        }
    }
}

impl<A: Send + 'static, T: 'static> Accumulator<A, T> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        Accumulator::Plain(Arc::new(move |acc: A, item: T| -> StreamResult<A> {
            Ok(f(acc, item))
        }))
    }

    pub fn try_plain<F, E>(f: F) -> Self
    where
        F: Fn(A, T) -> Result<A, E> + Send + Sync + 'static,
        E: Into<StreamError>,
    {
        Accumulator::Plain(Arc::new(move |acc: A, item: T| -> StreamResult<A> {
            f(acc, item).map_err(Into::into)
        }))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(A, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        Accumulator::Suspending(Arc::new(
            move |acc: A, item: T| -> BoxFuture<'static, StreamResult<A>> {
                let fut = f(acc, item);
                async move { Ok(fut.await) }.boxed()
            },
        ))
    }

    pub fn try_suspending<F, Fut, E>(f: F) -> Self
    where
        F: Fn(A, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Accumulator::Suspending(Arc::new(
            move |acc: A, item: T| -> BoxFuture<'static, StreamResult<A>> {
                let fut = f(acc, item);
                async move { fut.await.map_err(Into::into) }.boxed()
            },
        ))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Accumulator::Suspending(_))
    }

    pub fn combine(&self, acc: A, item: T) -> Invocation<A> {
        match self {
            Accumulator::Plain(f) => Either::Left(future::ready(f(acc, item))),
            Accumulator::Suspending(f) => Either::Right(f(acc, item)),
        }
    }
}

// ================================
// FlatMapper
// ================================

/// Builds the nested pipeline that `flat_map` drains for one outer element.
///
/// Only the plain form can be attached to a pipeline; `flat_map_with`
/// rejects the suspending form with a build error.
pub enum FlatMapper<T, U> {
    Plain(Arc<dyn Fn(T) -> StreamResult<Pipeline<U>> + Send + Sync>),
    Suspending(Arc<dyn Fn(T) -> BoxFuture<'static, StreamResult<Pipeline<U>>> + Send + Sync>),
}

impl<T, U> Clone for FlatMapper<T, U> {
    fn clone(&self) -> Self {
        match self {
            FlatMapper::Plain(f) => FlatMapper::Plain(Arc::clone(f)),
            FlatMapper::Suspending(f) => FlatMapper::Suspending(Arc::clone(f)),
        }
    }
}

impl<T: 'static, U: Send + 'static> FlatMapper<T, U> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(T) -> Pipeline<U> + Send + Sync + 'static,
    {
        FlatMapper::Plain(Arc::new(move |item: T| -> StreamResult<Pipeline<U>> {
            Ok(f(item))
        }))
    }

    pub fn try_plain<F, E>(f: F) -> Self
    where
        F: Fn(T) -> Result<Pipeline<U>, E> + Send + Sync + 'static,
        E: Into<StreamError>,
    {
        FlatMapper::Plain(Arc::new(move |item: T| -> StreamResult<Pipeline<U>> {
            f(item).map_err(Into::into)
        }))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Pipeline<U>> + Send + 'static,
    {
        FlatMapper::Suspending(Arc::new(
            move |item: T| -> BoxFuture<'static, StreamResult<Pipeline<U>>> {
                let fut = f(item);
                async move { Ok(fut.await) }.boxed()
            },
        ))
    }

    pub fn try_suspending<F, Fut, E>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Pipeline<U>, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        FlatMapper::Suspending(Arc::new(
            move |item: T| -> BoxFuture<'static, StreamResult<Pipeline<U>>> {
                let fut = f(item);
                async move { fut.await.map_err(Into::into) }.boxed()
            },
        ))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, FlatMapper::Suspending(_))
    }

    /// The synchronous constructor, or a build error for the suspending form.
    pub(crate) fn into_plain(
        self,
    ) -> StreamResult<Arc<dyn Fn(T) -> StreamResult<Pipeline<U>> + Send + Sync>> {
        match self {
            FlatMapper::Plain(f) => Ok(f),
            FlatMapper::Suspending(_) => Err(StreamError::Build(
                "flat_map does not support suspending functions".to_string(),
            )),
        }
    }
}
