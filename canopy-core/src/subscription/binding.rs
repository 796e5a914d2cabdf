//! Subscription bindings.
//!
//! A binding ties one value stream to a component's connected lifetime. The
//! source is acquired on every connect, through a factory, so the factory
//! may read dependencies that only resolve at connect time. On disconnect
//! the subscription is cancelled; a later reconnect starts from scratch.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, trace};

use super::stream::{Subscription, ValueStream};
use crate::component::{Component, ComponentLabel, Controller, ControllerId};
use crate::error::{Error, Result};

/// A component's live link to one value stream.
pub struct SubscriptionBinding<T, S, F> {
    id: ControllerId,
    host: ComponentLabel,
    source: F,
    on_value: Rc<dyn Fn(&T)>,
    /// At most one live subscription.
    active: RefCell<Option<Subscription>>,
    _stream: PhantomData<fn() -> S>,
}

impl<T, S, F> SubscriptionBinding<T, S, F> {
    fn cancel_active(&self) {
        let active = self.active.borrow_mut().take();
        if let Some(subscription) = active {
            subscription.cancel();
        }
    }
}

impl<T, S, F> Controller for SubscriptionBinding<T, S, F>
where
    T: 'static,
    S: ValueStream<T> + 'static,
    F: Fn() -> Result<S> + 'static,
{
    fn id(&self) -> ControllerId {
        self.id
    }

    fn host_connected(&self, _host: &Component) -> Result<()> {
        self.cancel_active();

        let stream = (self.source)()?;
        let on_value = Rc::clone(&self.on_value);
        let host = self.host.clone();
        let subscription = stream.subscribe(Box::new(move |value: &T| {
            trace!(component = %host, "binding received value");
            on_value(value);
        }))?;

        *self.active.borrow_mut() = Some(subscription);
        debug!(component = %self.host, "subscription bound");
        Ok(())
    }

    fn host_disconnected(&self, _host: &Component) {
        self.cancel_active();
        debug!(component = %self.host, "subscription released");
    }
}

/// Bind `component` to the stream produced by `source`.
///
/// Must be called before the component's first connect transition. On each
/// connect, `source` is called and every value the stream emits is passed
/// to `on_value`; on each disconnect, the subscription is cancelled. Errors
/// from `source` or from the stream's subscribe step fail the connect.
///
/// Returns [`Error::SubscribeAfterConnect`] without calling `source` if the
/// component is connected or has connected before.
pub fn subscribe<T, S, F, C>(component: &Component, source: F, on_value: C) -> Result<()>
where
    T: 'static,
    S: ValueStream<T> + 'static,
    F: Fn() -> Result<S> + 'static,
    C: Fn(&T) + 'static,
{
    if component.is_connected() || component.has_connected() {
        return Err(Error::SubscribeAfterConnect {
            component: component.label(),
        });
    }

    let binding = Rc::new(SubscriptionBinding {
        id: ControllerId::new(),
        host: component.label(),
        source,
        on_value: Rc::new(on_value),
        active: RefCell::new(None),
        _stream: PhantomData,
    });
    component.insert_controller(binding);
    Ok(())
}
