//! Observable state container.
//!
//! A [`State<T>`] holds the current value of a model and pushes every change
//! to its subscribers. New subscribers receive the current value right away,
//! so a component that binds late still starts from the latest state.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A subscriber cancelled during an emission receives nothing further,
//!    including the rest of that emission.
//! 3. After `finalize`, no value is delivered and no subscription is
//!    accepted.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::Finalizable;
use crate::error::{Error, Result};
use crate::subscription::{Subscription, ValueStream};

/// Shared interior for [`State<T>`].
struct StateInner<T> {
    label: &'static str,
    value: RefCell<T>,
    subscribers: RefCell<IndexMap<u64, Rc<dyn Fn(&T)>>>,
    next_subscriber: Cell<u64>,
    finalized: Cell<bool>,
}

/// A labelled, observable value.
///
/// Cloning a `State` creates a new handle to the **same** value.
pub struct State<T: 'static> {
    inner: Rc<StateInner<T>>,
}

impl<T: Clone + 'static> State<T> {
    /// Create a state holding `initial`.
    pub fn new(label: &'static str, initial: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                label,
                value: RefCell::new(initial),
                subscribers: RefCell::new(IndexMap::new()),
                next_subscriber: Cell::new(0),
                finalized: Cell::new(false),
            }),
        }
    }

    /// Get the state's label.
    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    /// Get a copy of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        if self.reject_write() {
            return;
        }
        *self.inner.value.borrow_mut() = value.clone();
        self.emit(&value);
    }

    /// Modify the value in place and notify subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        if self.reject_write() {
            return;
        }
        let next = {
            let mut value = self.inner.value.borrow_mut();
            f(&mut value);
            value.clone()
        };
        self.emit(&next);
    }

    /// Derive a stream that emits `map(state)` whenever it changes.
    pub fn select<U, M>(&self, map: M) -> Selector<T, U>
    where
        U: Clone + PartialEq + 'static,
        M: Fn(&T) -> U + 'static,
    {
        select(self.clone(), map)
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether the state has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.inner.finalized.get()
    }

    fn reject_write(&self) -> bool {
        if self.is_finalized() {
            warn!(state = self.inner.label, "write to finalized state ignored");
            return true;
        }
        false
    }

    fn emit(&self, value: &T) {
        let subscribers: Vec<(u64, Rc<dyn Fn(&T)>)> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(id, callback)| (*id, Rc::clone(callback)))
            .collect();
        trace!(state = self.inner.label, subscribers = subscribers.len(), "emitting");

        for (id, callback) in subscribers {
            // An earlier callback may have cancelled this one.
            if self.inner.subscribers.borrow().contains_key(&id) {
                callback(value);
            }
        }
    }
}

impl<T: Clone + 'static> ValueStream<T> for State<T> {
    fn subscribe(&self, on_value: Box<dyn Fn(&T)>) -> Result<Subscription> {
        if self.is_finalized() {
            return Err(Error::Finalized {
                state: self.inner.label,
            });
        }

        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);
        let callback: Rc<dyn Fn(&T)> = Rc::from(on_value);
        self.inner
            .subscribers
            .borrow_mut()
            .insert(id, Rc::clone(&callback));

        let current = self.get();
        callback(&current);

        let inner = Rc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.subscribers.borrow_mut().shift_remove(&id);
            }
        }))
    }
}

impl<T: 'static> Finalizable for State<T> {
    fn finalize(&self) {
        if self.inner.finalized.replace(true) {
            return;
        }
        let dropped = std::mem::take(&mut *self.inner.subscribers.borrow_mut());
        debug!(state = self.inner.label, subscribers = dropped.len(), "state finalized");
    }
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("label", &self.inner.label)
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .field("finalized", &self.inner.finalized.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Selectors
// ----------------------------------------------------------------------------

/// A projection of another stream that skips repeated values.
///
/// Each subscriber tracks the last value it was sent, so a change to the
/// source that leaves the projection equal is not delivered.
pub struct Selector<T: 'static, U: 'static> {
    source: Rc<dyn ValueStream<T>>,
    map: Rc<dyn Fn(&T) -> U>,
}

/// Project `source` through `map`, delivering only distinct values.
pub fn select<T, U, S, M>(source: S, map: M) -> Selector<T, U>
where
    T: 'static,
    U: Clone + PartialEq + 'static,
    S: ValueStream<T> + 'static,
    M: Fn(&T) -> U + 'static,
{
    Selector {
        source: Rc::new(source),
        map: Rc::new(map),
    }
}

impl<T: 'static, U: Clone + PartialEq + 'static> Selector<T, U> {
    /// Project this selector further.
    pub fn select<V, M>(&self, map: M) -> Selector<U, V>
    where
        V: Clone + PartialEq + 'static,
        M: Fn(&U) -> V + 'static,
    {
        select(self.clone(), map)
    }
}

impl<T: 'static, U: Clone + PartialEq + 'static> ValueStream<U> for Selector<T, U> {
    fn subscribe(&self, on_value: Box<dyn Fn(&U)>) -> Result<Subscription> {
        let map = Rc::clone(&self.map);
        let last: RefCell<Option<U>> = RefCell::new(None);
        self.source.subscribe(Box::new(move |value: &T| {
            let next = map(value);
            if last.borrow().as_ref() == Some(&next) {
                return;
            }
            *last.borrow_mut() = Some(next.clone());
            on_value(&next);
        }))
    }
}

impl<T: 'static, U: 'static> Clone for Selector<T, U> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            map: Rc::clone(&self.map),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record<T: Clone + 'static>(
        stream: &impl ValueStream<T>,
    ) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let subscription = stream
            .subscribe(Box::new(move |value: &T| seen_clone.borrow_mut().push(value.clone())))
            .unwrap();
        (seen, subscription)
    }

    #[test]
    fn state_get_set_update() {
        let state = State::new("count", 1);
        state.set(2);
        assert_eq!(state.get(), 2);
        state.update(|v| *v += 10);
        assert_eq!(state.get(), 12);
    }

    #[test]
    fn subscribe_replays_current_value() {
        let state = State::new("count", 7);
        let (seen, _subscription) = record(&state);

        state.set(8);
        assert_eq!(*seen.borrow(), vec![7, 8]);
    }

    #[test]
    fn cancelled_subscriber_stops_receiving() {
        let state = State::new("count", 0);
        let (seen, subscription) = record(&state);
        assert_eq!(state.subscriber_count(), 1);

        subscription.cancel();
        state.set(1);

        assert_eq!(*seen.borrow(), vec![0]);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn clone_shares_value_and_subscribers() {
        let state = State::new("count", 0);
        let other = state.clone();
        let (seen, _subscription) = record(&state);

        other.set(3);
        assert_eq!(state.get(), 3);
        assert_eq!(*seen.borrow(), vec![0, 3]);
    }

    #[test]
    fn cancellation_during_emission_is_honoured() {
        let state = State::new("count", 0);
        let later: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let later_clone = Rc::clone(&later);

        let _first = state
            .subscribe(Box::new(move |value: &i32| {
                if *value == 1 {
                    if let Some(subscription) = later_clone.borrow_mut().take() {
                        subscription.cancel();
                    }
                }
            }))
            .unwrap();
        let (seen, second) = record(&state);
        *later.borrow_mut() = Some(second);

        state.set(1);
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn selector_skips_unchanged_projections() {
        #[derive(Clone)]
        struct Prefs {
            theme: &'static str,
            font_size: u8,
        }

        let state = State::new(
            "prefs",
            Prefs {
                theme: "light",
                font_size: 12,
            },
        );
        let theme = state.select(|prefs| prefs.theme);
        let (seen, _subscription) = record(&theme);

        state.update(|prefs| prefs.font_size = 14);
        state.update(|prefs| prefs.theme = "dark");
        state.update(|prefs| prefs.font_size = 16);

        assert_eq!(*seen.borrow(), vec!["light", "dark"]);
    }

    #[test]
    fn selectors_chain() {
        let state = State::new("files", vec![1, 2, 3]);
        let count = state.select(|files| files.len());
        let is_empty = count.select(|len| *len == 0);
        let (seen, _subscription) = record(&is_empty);

        state.set(vec![]);
        state.set(vec![]);
        state.set(vec![4]);

        assert_eq!(*seen.borrow(), vec![false, true, false]);
    }

    #[test]
    fn finalize_drops_subscribers_and_rejects_new_ones() {
        let state = State::new("change", 0);
        let (seen, _subscription) = record(&state);

        state.finalize();
        state.set(5);

        assert!(state.is_finalized());
        assert_eq!(state.get(), 0);
        assert_eq!(*seen.borrow(), vec![0]);
        assert_eq!(state.subscriber_count(), 0);

        let err = state.subscribe(Box::new(|_: &i32| {})).unwrap_err();
        assert!(matches!(err, Error::Finalized { state: "change" }));
    }
}
