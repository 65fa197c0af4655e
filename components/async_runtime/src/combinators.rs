//! Promise combinators.
//!
//! Combinators observe their inputs without owning them: an input that loses
//! a race or is ignored after an early rejection still runs to completion,
//! its outcome is simply discarded.

use crate::promise::{Promise, Settlement};
use core_types::AggregateError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Creates a promise already fulfilled with `value`.
pub fn resolve<T, E>(value: T) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    Promise::resolved(value)
}

/// Creates a promise already rejected with `reason`.
pub fn reject<T, E>(reason: E) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    Promise::rejected(reason)
}

// Ordered result slots filled in completion order.
struct Gather<V> {
    slots: Vec<Option<V>>,
    remaining: usize,
}

impl<V> Gather<V> {
    fn new(len: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            slots: (0..len).map(|_| None).collect(),
            remaining: len,
        }))
    }

    // Returns every value, in input order, once the last slot is filled.
    fn fill(&mut self, index: usize, value: V) -> Option<Vec<V>> {
        if self.slots[index].replace(value).is_none() {
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            Some(self.slots.drain(..).flatten().collect())
        } else {
            None
        }
    }
}

/// Fulfills with every value, in input order, once all inputs fulfill.
///
/// Rejects with the first rejection observed. An empty input fulfills with
/// an empty vector.
///
/// # Examples
///
/// ```
/// use async_runtime::{all, microtask, resolve, Promise};
///
/// let joined: Promise<Vec<i32>, String> = all(vec![resolve(1), resolve(2)]);
/// microtask::perform_checkpoint(None).unwrap();
/// assert_eq!(joined.value(), Some(vec![1, 2]));
/// ```
pub fn all<T, E, I>(promises: I) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::resolved(Vec::new());
    }

    let (output, resolver) = Promise::pending();
    tracing::trace!(promise_id = output.id(), inputs = promises.len(), "all");
    let gather = Gather::new(promises.len());

    for (index, promise) in promises.iter().enumerate() {
        let gather = Rc::clone(&gather);
        let resolver = resolver.clone();
        promise.subscribe(Box::new(move |settlement| match settlement {
            Settlement::Fulfilled { value } => {
                let values = gather.borrow_mut().fill(index, value);
                if let Some(values) = values {
                    resolver.resolve(values);
                }
            }
            Settlement::Rejected { reason } => resolver.reject(reason),
        }));
    }
    output
}

/// Fulfills with every outcome, in input order, once all inputs settle.
///
/// Never rejects.
pub fn all_settled<T, E, I>(promises: I) -> Promise<Vec<Settlement<T, E>>, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::resolved(Vec::new());
    }

    let (output, resolver) = Promise::pending();
    tracing::trace!(promise_id = output.id(), inputs = promises.len(), "all_settled");
    let gather = Gather::new(promises.len());

    for (index, promise) in promises.iter().enumerate() {
        let gather = Rc::clone(&gather);
        let resolver = resolver.clone();
        promise.subscribe(Box::new(move |settlement| {
            let outcomes = gather.borrow_mut().fill(index, settlement);
            if let Some(outcomes) = outcomes {
                resolver.resolve(outcomes);
            }
        }));
    }
    output
}

/// Settles like whichever input settles first.
///
/// An empty input never settles.
pub fn race<T, E, I>(promises: I) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let (output, resolver) = Promise::pending();
    let mut inputs = 0usize;

    for promise in promises {
        inputs += 1;
        let resolver = resolver.clone();
        promise.subscribe(Box::new(move |settlement| match settlement {
            Settlement::Fulfilled { value } => resolver.resolve(value),
            Settlement::Rejected { reason } => resolver.reject(reason),
        }));
    }

    tracing::trace!(promise_id = output.id(), inputs, "race");
    output
}

/// Fulfills like the first input to fulfill.
///
/// Rejects with every reason, in input order, once all inputs reject. An
/// empty input rejects immediately with an empty [`AggregateError`].
pub fn any<T, E, I>(promises: I) -> Promise<T, AggregateError<E>>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::rejected(AggregateError::new(Vec::new()));
    }

    let (output, resolver) = Promise::pending();
    tracing::trace!(promise_id = output.id(), inputs = promises.len(), "any");
    let gather = Gather::new(promises.len());

    for (index, promise) in promises.iter().enumerate() {
        let gather = Rc::clone(&gather);
        let resolver = resolver.clone();
        promise.subscribe(Box::new(move |settlement| match settlement {
            Settlement::Fulfilled { value } => resolver.resolve(value),
            Settlement::Rejected { reason } => {
                let reasons = gather.borrow_mut().fill(index, reason);
                if let Some(reasons) = reasons {
                    resolver.reject(AggregateError::new(reasons));
                }
            }
        }));
    }
    output
}
