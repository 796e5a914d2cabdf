//! Value streams and cancellation handles.
//!
//! [`ValueStream`] is the only thing a binding needs from a state holder:
//! push each value to a callback until told to stop. It deliberately has no
//! operators; sources build whatever they need on top.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// A push-based source of values.
pub trait ValueStream<T> {
    /// Start delivering values to `on_value`.
    ///
    /// Delivery stops when the returned [`Subscription`] is cancelled or
    /// dropped. Independent subscriptions on the same stream coexist.
    fn subscribe(&self, on_value: Box<dyn Fn(&T)>) -> Result<Subscription>;
}

impl<T, S> ValueStream<T> for Rc<S>
where
    S: ValueStream<T> + ?Sized,
{
    fn subscribe(&self, on_value: Box<dyn Fn(&T)>) -> Result<Subscription> {
        (**self).subscribe(on_value)
    }
}

/// RAII cancellation handle for a stream subscription.
///
/// Cancelling runs the stream's teardown exactly once; dropping the handle
/// cancels too.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a handle that runs `cancel` when cancelled or dropped.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Stop delivery.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn cancel_runs_teardown_once() {
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let subscription = Subscription::new(move || count_clone.set(count_clone.get() + 1));

        subscription.cancel();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_cancels() {
        let cancelled = Rc::new(Cell::new(false));
        let cancelled_clone = Rc::clone(&cancelled);
        {
            let _subscription = Subscription::new(move || cancelled_clone.set(true));
            assert!(!cancelled.get());
        }
        assert!(cancelled.get());
    }

    #[test]
    fn empty_subscription_is_inert() {
        Subscription::empty().cancel();
    }
}
