//! Promise implementation following the Promise/A+ model.
//!
//! A [`Promise`] is a single-assignment cell that starts out pending and is
//! settled at most once, either fulfilled with a value or rejected with a
//! reason. Observers registered on it never run synchronously: settlement (or
//! registration on an already settled promise) enqueues one microtask per
//! observer on this thread's queue, see [`crate::microtask`].
//!
//! Chaining methods return a new promise whose outcome is driven by the
//! handler. A handler may hand back another promise through
//! [`Resolution::Promise`]; the downstream promise then follows it and
//! settles only when it does.

use crate::microtask::queue_microtask;
use crate::rejection::{self, HandledFlag};
use core_types::RuntimeError;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

thread_local! {
    static NEXT_PROMISE_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_promise_id() -> u64 {
    NEXT_PROMISE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been resolved with a value.
    Fulfilled,
    /// The promise has been rejected with a reason.
    Rejected,
}

/// The outcome of a settled promise.
///
/// Serializes the way `allSettled` results are usually presented:
///
/// ```
/// use async_runtime::Settlement;
///
/// let ok: Settlement<i32, String> = Settlement::Fulfilled { value: 1 };
/// assert_eq!(
///     serde_json::to_string(&ok).unwrap(),
///     r#"{"status":"fulfilled","value":1}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Settlement<T, E> {
    /// Fulfilled with a value
    Fulfilled {
        /// The fulfillment value
        value: T,
    },
    /// Rejected with a reason
    Rejected {
        /// The rejection reason
        reason: E,
    },
}

impl<T, E> Settlement<T, E> {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> PromiseState {
        match self {
            Settlement::Fulfilled { .. } => PromiseState::Fulfilled,
            Settlement::Rejected { .. } => PromiseState::Rejected,
        }
    }

    /// True for [`Settlement::Fulfilled`].
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settlement::Fulfilled { .. })
    }

    /// True for [`Settlement::Rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, Settlement::Rejected { .. })
    }

    /// The fulfillment value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Settlement::Fulfilled { value } => Some(value),
            Settlement::Rejected { .. } => None,
        }
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<&E> {
        match self {
            Settlement::Fulfilled { .. } => None,
            Settlement::Rejected { reason } => Some(reason),
        }
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settlement::Fulfilled { value } => Ok(value),
            Settlement::Rejected { reason } => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settlement<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Settlement::Fulfilled { value },
            Err(reason) => Settlement::Rejected { reason },
        }
    }
}

/// What a promise is resolved with: a plain value, or another promise to follow.
#[derive(Debug)]
pub enum Resolution<T, E> {
    /// Fulfill with this value
    Value(T),
    /// Adopt the eventual outcome of this promise
    Promise(Promise<T, E>),
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Promise(promise)
    }
}

/// Boxed fulfillment handler for [`Promise::register`].
pub type OnFulfilled<T, U, E> = Box<dyn FnOnce(T) -> Result<Resolution<U, E>, E>>;

/// Boxed rejection handler for [`Promise::register`].
pub type OnRejected<U, E> = Box<dyn FnOnce(E) -> Result<Resolution<U, E>, E>>;

pub(crate) type Observer<T, E> = Box<dyn FnOnce(Settlement<T, E>)>;

enum Slot<T, E> {
    Pending(Vec<Observer<T, E>>),
    Settled(Settlement<T, E>),
}

struct Inner<T, E> {
    id: u64,
    slot: Slot<T, E>,
    // Set by the first resolver call, including resolving with a promise
    // that is still pending. Later resolver calls are ignored.
    resolved: bool,
    // Set by any registration. Shared with the rejection tracker so the
    // record stays accurate after the promise is dropped.
    handled: HandledFlag,
    // The promise this one adopts while both are pending.
    following: Option<Weak<RefCell<Inner<T, E>>>>,
}


/// A promise: the eventual result of an asynchronous operation.
///
/// `Promise` is a shared handle; cloning it yields another handle to the same
/// promise. The creator and every chained consumer keep it alive.
///
/// # Examples
///
/// ```
/// use async_runtime::{microtask, Promise, PromiseState};
///
/// let promise: Promise<i32, String> = Promise::new(|resolver| {
///     resolver.resolve(1);
///     Ok(())
/// });
/// let doubled = promise.then(|x| Ok(x * 2));
/// assert_eq!(doubled.state(), PromiseState::Pending);
///
/// microtask::perform_checkpoint(None).unwrap();
/// assert_eq!(doubled.value(), Some(2));
/// ```
pub struct Promise<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E> Promise<T, E> {
    /// Identifier used in log output and unhandled rejection reports.
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    /// The current state.
    pub fn state(&self) -> PromiseState {
        match &self.inner.borrow().slot {
            Slot::Pending(_) => PromiseState::Pending,
            Slot::Settled(settlement) => settlement.state(),
        }
    }

    /// True until the promise settles.
    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// True once anything has been registered on this promise.
    pub fn is_handled(&self) -> bool {
        self.inner.borrow().handled.get()
    }

    /// Number of observers waiting for settlement.
    pub fn observer_count(&self) -> usize {
        match &self.inner.borrow().slot {
            Slot::Pending(observers) => observers.len(),
            Slot::Settled(_) => 0,
        }
    }

    /// True when both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// True if `target` is this promise or one it is (transitively) following.
    fn adopts_from(&self, target: &Self) -> bool {
        let mut cursor = Some(Rc::clone(&self.inner));
        while let Some(node) = cursor {
            if Rc::ptr_eq(&node, &target.inner) {
                return true;
            }
            cursor = node.borrow().following.as_ref().and_then(Weak::upgrade);
        }
        false
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    fn blank() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                id: next_promise_id(),
                slot: Slot::Pending(Vec::new()),
                resolved: false,
                handled: HandledFlag::default(),
                following: None,
            })),
        }
    }

    /// Creates a promise and runs `executor` synchronously with its resolver.
    ///
    /// An `Err` returned by the executor rejects the promise, unless the
    /// executor already resolved it. The error never reaches the caller.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        let (promise, resolver) = Self::pending();
        tracing::trace!(promise_id = promise.id(), "running executor");
        if let Err(reason) = executor(resolver.clone()) {
            resolver.reject(reason);
        }
        promise
    }

    /// Creates a pending promise together with its resolver.
    pub fn pending() -> (Self, Resolver<T, E>) {
        let promise = Self::blank();
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    /// Creates a promise already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Self::blank();
        promise.inner.borrow_mut().resolved = true;
        promise.settle(Settlement::Fulfilled { value });
        promise
    }

    /// Creates a promise already rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        let promise = Self::blank();
        promise.inner.borrow_mut().resolved = true;
        promise.settle(Settlement::Rejected { reason });
        promise
    }

    /// The outcome, once settled.
    pub fn settlement(&self) -> Option<Settlement<T, E>> {
        match &self.inner.borrow().slot {
            Slot::Pending(_) => None,
            Slot::Settled(settlement) => Some(settlement.clone()),
        }
    }

    /// The fulfillment value, once fulfilled.
    pub fn value(&self) -> Option<T> {
        self.settlement().and_then(|s| s.value().cloned())
    }

    /// The rejection reason, once rejected.
    pub fn reason(&self) -> Option<E> {
        self.settlement().and_then(|s| s.reason().cloned())
    }

    fn settle(&self, settlement: Settlement<T, E>) {
        let (observers, handled) = {
            let mut inner = self.inner.borrow_mut();
            let observers = match &mut inner.slot {
                Slot::Settled(_) => return,
                Slot::Pending(observers) => std::mem::take(observers),
            };
            inner.slot = Slot::Settled(settlement.clone());
            inner.following = None;
            (observers, Rc::clone(&inner.handled))
        };

        tracing::trace!(
            promise_id = self.id(),
            state = ?settlement.state(),
            observers = observers.len(),
            "promise settled"
        );

        if let Settlement::Rejected { reason } = &settlement {
            if !handled.get() {
                rejection::track(self.id(), format!("{reason:?}"), handled);
            }
        }

        for observer in observers {
            let settlement = settlement.clone();
            queue_microtask(move || observer(settlement));
        }
    }

    /// Adds a raw observer. It runs as a microtask once the promise settles,
    /// or right away as a microtask if it already has.
    pub(crate) fn subscribe(&self, observer: Observer<T, E>) {
        let settlement = {
            let mut inner = self.inner.borrow_mut();
            inner.handled.set(true);
            match &mut inner.slot {
                Slot::Pending(observers) => {
                    observers.push(observer);
                    return;
                }
                Slot::Settled(settlement) => settlement.clone(),
            }
        };
        queue_microtask(move || observer(settlement));
    }

    /// Registers both handlers and returns the promise they drive.
    ///
    /// Whichever handler matches the outcome runs as a microtask. `Ok`
    /// resolves the returned promise (following it if it is a
    /// [`Resolution::Promise`]); `Err` rejects it.
    pub fn then_with<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        let (next, resolver) = Promise::<U, E>::pending();
        tracing::trace!(promise_id = self.id(), next_id = next.id(), "reaction registered");

        self.subscribe(Box::new(move |settlement| {
            let outcome = match settlement {
                Settlement::Fulfilled { value } => on_fulfilled(value),
                Settlement::Rejected { reason } => on_rejected(reason),
            };
            match outcome {
                Ok(resolution) => resolver.resolve_with(resolution),
                Err(reason) => resolver.reject(reason),
            }
        }));
        next
    }

    /// Registers optional handlers; a missing handler passes the outcome
    /// through to the returned promise unchanged.
    pub fn register(
        &self,
        on_fulfilled: Option<OnFulfilled<T, T, E>>,
        on_rejected: Option<OnRejected<T, E>>,
    ) -> Promise<T, E> {
        self.then_with(
            move |value| match on_fulfilled {
                Some(handler) => handler(value),
                None => Ok(Resolution::Value(value)),
            },
            move |reason| match on_rejected {
                Some(handler) => handler(reason),
                None => Err(reason),
            },
        )
    }

    /// Maps the fulfillment value. Rejections pass through.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        self.then_with(move |value| on_fulfilled(value).map(Resolution::Value), Err)
    }

    /// Continues with the promise returned by `on_fulfilled`.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Promise<U, E> + 'static,
    {
        self.then_with(move |value| Ok(Resolution::Promise(on_fulfilled(value))), Err)
    }

    /// Recovers from a rejection. Fulfillments pass through.
    pub fn catch<F>(&self, on_rejected: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> Result<T, E> + 'static,
    {
        self.register(
            None,
            Some(Box::new(move |reason| on_rejected(reason).map(Resolution::Value))),
        )
    }

    /// Recovers from a rejection with the promise returned by `on_rejected`.
    pub fn or_else<F>(&self, on_rejected: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> Promise<T, E> + 'static,
    {
        self.register(
            None,
            Some(Box::new(move |reason| Ok(Resolution::Promise(on_rejected(reason))))),
        )
    }

    /// Runs `on_settled` on either outcome and passes the outcome through.
    ///
    /// If `on_settled` fails, its error becomes the rejection reason instead.
    pub fn finally<F>(&self, on_settled: F) -> Promise<T, E>
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        let on_fulfilled_slot = Rc::new(Cell::new(Some(on_settled)));
        let on_rejected_slot = Rc::clone(&on_fulfilled_slot);

        self.then_with(
            move |value| {
                if let Some(on_settled) = on_fulfilled_slot.take() {
                    on_settled()?;
                }
                Ok(Resolution::Value(value))
            },
            move |reason| {
                if let Some(on_settled) = on_rejected_slot.take() {
                    on_settled()?;
                }
                Err(reason)
            },
        )
    }
}

/// The settlement functions of one promise.
///
/// The first call to any settling method wins; every later call is a no-op.
pub struct Resolver<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("promise", &self.promise)
            .finish()
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// The promise this resolver settles.
    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }

    /// True once any settling method has been called.
    pub fn is_resolved(&self) -> bool {
        self.promise.inner.borrow().resolved
    }

    fn claim(&self) -> bool {
        let mut inner = self.promise.inner.borrow_mut();
        if inner.resolved {
            tracing::trace!(promise_id = inner.id, "ignoring late settlement");
            return false;
        }
        inner.resolved = true;
        true
    }

    /// Fulfills the promise with `value`.
    pub fn resolve(&self, value: T) {
        if self.claim() {
            self.promise.settle(Settlement::Fulfilled { value });
        }
    }

    /// Rejects the promise with `reason`.
    pub fn reject(&self, reason: E) {
        if self.claim() {
            self.promise.settle(Settlement::Rejected { reason });
        }
    }

    /// Resolves with a plain value or follows a promise.
    pub fn resolve_with(&self, resolution: Resolution<T, E>) {
        match resolution {
            Resolution::Value(value) => self.resolve(value),
            Resolution::Promise(other) => self.follow(other),
        }
    }

    /// Adopts the eventual outcome of `other`.
    ///
    /// The resolver counts as used immediately, even though the promise
    /// stays pending until `other` settles.
    ///
    /// Following itself, directly or through a chain of promises that
    /// already follow it, can never settle. Such a promise stays pending and
    /// is reported to the host as an unhandled `TypeError`; no observer is
    /// registered, so the cycle holds no references.
    pub fn follow(&self, other: Promise<T, E>) {
        if !self.claim() {
            return;
        }
        if other.adopts_from(&self.promise) {
            let promise_id = self.promise.id();
            let error = RuntimeError::type_error(format!(
                "chaining cycle detected for promise #{promise_id}"
            ));
            tracing::warn!(promise_id, follows = other.id(), "promise can never settle");
            rejection::track_unsettleable(promise_id, error.to_string());
            return;
        }

        tracing::trace!(
            promise_id = self.promise.id(),
            follows = other.id(),
            "following promise"
        );
        self.promise.inner.borrow_mut().following = Some(Rc::downgrade(&other.inner));
        let target = self.promise.clone();
        other.subscribe(Box::new(move |settlement| target.settle(settlement)));
    }
}
