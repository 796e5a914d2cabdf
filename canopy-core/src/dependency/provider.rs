//! Provider registration.
//!
//! `provide` installs a value-producing function on a component under a
//! token. The registration answers matching requests only while it is
//! attached, which is exactly the component's connected lifetime.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::request::Request;
use super::token::{DependencyToken, TokenId};
use crate::component::{Component, Controller, ControllerId, ControllerStage};
use crate::error::Result;

/// A nullary function yielding the current value of a dependency.
///
/// The function is called on every [`Provider::get`]; nothing is cached, so
/// it may hand out fresh values each time.
pub struct Provider<T> {
    produce: Rc<dyn Fn() -> T>,
}

impl<T> Provider<T> {
    /// Wrap a value-producing function.
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            produce: Rc::new(produce),
        }
    }

    /// Produce the current value.
    pub fn get(&self) -> T {
        (self.produce)()
    }
}

impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            produce: Rc::clone(&self.produce),
        }
    }
}

impl<T> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider").finish_non_exhaustive()
    }
}

/// A component's answer for one token.
pub struct ProviderRegistration {
    id: ControllerId,
    token: TokenId,
    label: &'static str,
    /// The `Provider<T>` for `token`, type-erased.
    provider: Box<dyn Any>,
    attached: Cell<bool>,
}

impl ProviderRegistration {
    fn new<T: 'static>(token: DependencyToken<T>, provider: Provider<T>) -> Self {
        Self {
            id: ControllerId::new(),
            token: token.id(),
            label: token.label(),
            provider: Box::new(provider),
            attached: Cell::new(false),
        }
    }

    /// The token this registration answers.
    pub fn token(&self) -> TokenId {
        self.token
    }

    /// Whether the registration is currently listening for requests.
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Answer `request` if it is for this token and the registration is
    /// attached. Returns `true` when the request was claimed.
    pub(crate) fn claim(&self, request: &mut dyn Request) -> bool {
        if !self.is_attached() || request.token() != self.token {
            return false;
        }
        request.offer(self.provider.as_ref())
    }

    fn attach(&self) {
        self.attached.set(true);
    }

    fn detach(&self) {
        self.attached.set(false);
    }
}

impl Controller for ProviderRegistration {
    fn id(&self) -> ControllerId {
        self.id
    }

    fn stage(&self) -> ControllerStage {
        ControllerStage::Provide
    }

    fn host_connected(&self, host: &Component) -> Result<()> {
        debug!(component = %host.label(), token = self.label, "provider attached");
        self.attach();
        Ok(())
    }

    fn host_disconnected(&self, host: &Component) {
        debug!(component = %host.label(), token = self.label, "provider detached");
        self.detach();
    }
}

impl fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("token", &self.label)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Install (or replace) `component`'s provider for `token`.
///
/// An existing registration for the same token is detached and dropped
/// before the new one is installed, so at most one registration per
/// (component, token) ever answers. On a connected component the new
/// registration starts listening immediately; otherwise it starts on the
/// next connect.
pub fn provide<T, F>(component: &Component, token: &DependencyToken<T>, provider: F)
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    if let Some(previous) = component.take_provider_registration(token.id()) {
        debug!(component = %component.label(), token = token.label(), "replacing provider");
        component.remove_controller(previous.id());
        previous.detach();
    }

    let registration = Rc::new(ProviderRegistration::new(*token, Provider::new(provider)));
    component.insert_provider_registration(Rc::clone(&registration));
    component.insert_controller(Rc::clone(&registration) as Rc<dyn Controller>);
    if component.is_connected() {
        registration.attach();
    }
    debug!(component = %component.label(), token = token.label(), "provider installed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{define, resolve};
    use std::cell::Cell;

    #[test]
    fn provider_is_re_evaluated_on_every_call() {
        let counter = Rc::new(Cell::new(0));
        let counter_clone = Rc::clone(&counter);
        let provider = Provider::new(move || {
            counter_clone.set(counter_clone.get() + 1);
            counter_clone.get()
        });

        assert_eq!(provider.get(), 1);
        assert_eq!(provider.get(), 2);
        assert_eq!(provider.clone().get(), 3);
    }

    #[test]
    fn registration_follows_host_lifecycle() {
        let token = define::<i32>("number");
        let host = Component::new("host");
        provide(&host, &token, || 1);

        let registration = host.provider_registration(token.id()).unwrap();
        assert!(!registration.is_attached());

        host.connect().unwrap();
        assert!(registration.is_attached());

        host.disconnect();
        assert!(!registration.is_attached());

        // Reconnecting re-attaches the same registration.
        host.connect().unwrap();
        assert!(registration.is_attached());
    }

    #[test]
    fn provide_on_connected_host_attaches_immediately() {
        let token = define::<i32>("number");
        let host = Component::new("host");
        host.connect().unwrap();

        provide(&host, &token, || 1);
        assert!(host.provider_registration(token.id()).unwrap().is_attached());
    }

    #[test]
    fn replacement_detaches_previous_registration() {
        let token = define::<i32>("number");
        let host = Component::new("host");
        host.connect().unwrap();

        provide(&host, &token, || 1);
        let first = host.provider_registration(token.id()).unwrap();
        provide(&host, &token, || 2);
        let second = host.provider_registration(token.id()).unwrap();

        assert!(!first.is_attached());
        assert!(second.is_attached());
        assert!(!Rc::ptr_eq(&first, &second));
        // One provider controller, not two.
        assert_eq!(host.controller_count(), 1);

        let resolved = resolve(&host, &token).unwrap();
        assert_eq!(resolved.get(), 2);
    }

    #[test]
    fn replaced_registration_stays_detached_after_reconnect() {
        let token = define::<i32>("number");
        let host = Component::new("host");
        provide(&host, &token, || 1);
        let first = host.provider_registration(token.id()).unwrap();
        provide(&host, &token, || 2);

        host.connect().unwrap();
        assert!(!first.is_attached());
        assert!(host.provider_registration(token.id()).unwrap().is_attached());
    }

    #[test]
    fn own_provider_answers_resolver_registered_first() {
        let token = define::<i32>("d");
        let outer = Component::new("outer");
        let inner = Component::new("inner");
        outer.append_child(&inner).unwrap();
        provide(&outer, &token, || 1);

        let accessor = resolve(&inner, &token).unwrap();
        provide(&inner, &token, || 2);
        outer.connect().unwrap();

        assert_eq!(accessor.get(), 2);
    }

    #[test]
    fn own_provider_satisfies_resolver_without_ancestors() {
        let token = define::<i32>("d");
        let host = Component::new("host");
        let accessor = resolve(&host, &token).unwrap();
        provide(&host, &token, || 2);

        host.connect().unwrap();
        assert_eq!(accessor.get(), 2);
    }
}
