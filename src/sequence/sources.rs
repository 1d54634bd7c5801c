//! Basic producers
//!
//! Adapters over in-memory iterators and element mapping. Operator-specific
//! producers live next to their operators in `plan`.

use futures_util::future::BoxFuture;

use crate::errors::EvalResult;

use super::{LazySequence, Producer, Step};

/// Producer over any `Send` iterator
pub struct IterProducer<I> {
    iter: I,
}

impl<I> IterProducer<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I> Producer<I::Item> for IterProducer<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<I::Item>>> {
        Box::pin(async move {
            match self.iter.next() {
                Some(value) => Ok(Step::Item(value)),
                None => Ok(Step::Done),
            }
        })
    }
}

/// Producer forwarding a nested sequence through a mapping function
pub(super) struct MapProducer<T, U, F> {
    inner: LazySequence<T>,
    f: F,
    _marker: std::marker::PhantomData<fn(T) -> U>,
}

impl<T, U, F> MapProducer<T, U, F> {
    pub(super) fn new(inner: LazySequence<T>, f: F) -> Self {
        Self {
            inner,
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, U, F> Producer<U> for MapProducer<T, U, F>
where
    T: Send + 'static,
    U: Send,
    F: FnMut(T) -> U + Send,
{
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<U>>> {
        Box::pin(async move {
            match self.inner.try_advance().await? {
                Some(value) => Ok(Step::Item((self.f)(value))),
                None => Ok(Step::Done),
            }
        })
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Producer forwarding a nested sequence through a filtering map
pub(super) struct FilterMapProducer<T, U, F> {
    inner: LazySequence<T>,
    f: F,
    _marker: std::marker::PhantomData<fn(T) -> U>,
}

impl<T, U, F> FilterMapProducer<T, U, F> {
    pub(super) fn new(inner: LazySequence<T>, f: F) -> Self {
        Self {
            inner,
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, U, F> Producer<U> for FilterMapProducer<T, U, F>
where
    T: Send + 'static,
    U: Send,
    F: FnMut(T) -> Option<U> + Send,
{
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<U>>> {
        Box::pin(async move {
            match self.inner.try_advance().await? {
                Some(value) => match (self.f)(value) {
                    Some(mapped) => Ok(Step::Item(mapped)),
                    None => Ok(Step::Continue),
                },
                None => Ok(Step::Done),
            }
        })
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
