//! Resolver registration.
//!
//! `resolve` gives a component a lazy accessor for a dependency provided
//! somewhere above it. The request is dispatched on the component's connect
//! transition, not when `resolve` is called, because ancestors may not have
//! installed their providers yet while the component is being built.
//!
//! The accessor caches the provider *function*, not a value: every `get()`
//! calls back into the ancestor's provider.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::provider::Provider;
use super::request::{dispatch, DependencyRequest};
use super::token::DependencyToken;
use crate::component::{Component, ComponentLabel, Controller, ControllerId, ControllerStage};
use crate::error::{Error, Result};

/// A component's resolution state for one token.
pub struct ResolverRegistration<T: 'static> {
    id: ControllerId,
    token: DependencyToken<T>,
    host: ComponentLabel,
    /// Drop the provider on disconnect.
    strict: bool,
    provider: RefCell<Option<Provider<T>>>,
}

impl<T: 'static> ResolverRegistration<T> {
    fn new(host: &Component, token: DependencyToken<T>) -> Self {
        Self {
            id: ControllerId::new(),
            token,
            host: host.label(),
            strict: host.config().strict_accessors,
            provider: RefCell::new(None),
        }
    }

    /// Dispatch a request from `host` and cache whatever claims it.
    fn request(&self, host: &Component) -> Result<()> {
        let mut claimed = None;
        {
            let mut request =
                DependencyRequest::new(self.token, |provider| claimed = Some(provider));
            dispatch(host, &mut request);
        }

        match claimed {
            Some(provider) => {
                *self.provider.borrow_mut() = Some(provider);
                debug!(component = %self.host, token = self.token.label(), "dependency resolved");
                Ok(())
            }
            None => Err(Error::Unresolved {
                token: self.token.label(),
                component: self.host.clone(),
            }),
        }
    }
}

impl<T: 'static> Controller for ResolverRegistration<T> {
    fn id(&self) -> ControllerId {
        self.id
    }

    fn stage(&self) -> ControllerStage {
        ControllerStage::Resolve
    }

    fn host_connected(&self, host: &Component) -> Result<()> {
        self.request(host)
    }

    fn host_disconnected(&self, _host: &Component) {
        if self.strict {
            self.provider.borrow_mut().take();
        }
    }
}

/// Accessor for a resolved dependency.
///
/// Valid during the owning component's connected lifetime. Cloning creates
/// a new handle to the same registration.
pub struct Resolved<T: 'static> {
    registration: Rc<ResolverRegistration<T>>,
}

impl<T: 'static> Resolved<T> {
    /// Get the current value from the ancestor's provider.
    ///
    /// # Panics
    ///
    /// Panics if the owning component is not connected (or its connect
    /// transition has not resolved this token yet). Use [`Resolved::try_get`]
    /// to handle that case.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Get the current value, or [`Error::NotConnected`] outside the owning
    /// component's connected lifetime.
    pub fn try_get(&self) -> Result<T> {
        self.provider().map(|provider| provider.get())
    }

    /// Get the cached provider function.
    pub fn provider(&self) -> Result<Provider<T>> {
        self.registration
            .provider
            .borrow()
            .clone()
            .ok_or_else(|| Error::NotConnected {
                token: self.registration.token.label(),
                component: self.registration.host.clone(),
            })
    }

    /// Whether a provider is currently cached.
    pub fn is_resolved(&self) -> bool {
        self.registration.provider.borrow().is_some()
    }

    /// The token this accessor resolves.
    pub fn token(&self) -> DependencyToken<T> {
        self.registration.token
    }

    /// Check whether two accessors share one registration.
    pub fn same_registration(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.registration, &other.registration)
    }
}

impl<T: 'static> Clone for Resolved<T> {
    fn clone(&self) -> Self {
        Self {
            registration: Rc::clone(&self.registration),
        }
    }
}

impl<T: 'static> fmt::Debug for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("token", &self.registration.token.label())
            .field("host", &self.registration.host.to_string())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Get `component`'s accessor for `token`, creating the registration on
/// first use.
///
/// Before the component connects this only records the registration. On an
/// already-connected component the request is dispatched right away and an
/// unclaimed request is returned as [`Error::Unresolved`].
pub fn resolve<T: 'static>(
    component: &Component,
    token: &DependencyToken<T>,
) -> Result<Resolved<T>> {
    if let Some(cached) = component.resolver_registration(token.id()) {
        if let Ok(registration) = cached.downcast::<ResolverRegistration<T>>() {
            return Ok(Resolved { registration });
        }
    }

    let registration = Rc::new(ResolverRegistration::new(component, *token));
    component.add_controller(Rc::clone(&registration) as Rc<dyn Controller>)?;
    let erased: Rc<dyn Any> = registration.clone();
    component.insert_resolver_registration(token.id(), erased);
    Ok(Resolved { registration })
}
