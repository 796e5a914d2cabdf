//! Dependency requests and their propagation.
//!
//! A request travels from the component that issued it toward the root,
//! nearest first. The first component with an attached provider for the
//! request's token claims it: the provider is handed to the request's
//! callback and propagation stops. Everything happens on the caller's
//! stack; [`dispatch`] returns only once the walk is over.

use std::any::Any;

use tracing::{debug, trace};

use super::provider::Provider;
use super::token::{DependencyToken, TokenId};
use crate::component::Component;

/// Object-safe view of a [`DependencyRequest`], used during propagation.
pub trait Request {
    /// The token being asked for.
    fn token(&self) -> TokenId;

    /// Diagnostic label of the token being asked for.
    fn label(&self) -> &'static str;

    /// Offer a provider to the request.
    ///
    /// `provider` must be the `Provider<T>` registered for [`Request::token`].
    /// Returns `true` if the request accepted it, which marks the request
    /// handled.
    fn offer(&mut self, provider: &dyn Any) -> bool;

    /// Whether a provider has already claimed the request.
    fn is_handled(&self) -> bool;
}

/// A one-shot message asking the tree for a provider of `T`.
pub struct DependencyRequest<'a, T: 'static> {
    dependency: DependencyToken<T>,
    callback: Option<Box<dyn FnOnce(Provider<T>) + 'a>>,
}

impl<'a, T: 'static> DependencyRequest<'a, T> {
    /// Create a request whose callback receives the claiming provider.
    pub fn new<F>(dependency: DependencyToken<T>, callback: F) -> Self
    where
        F: FnOnce(Provider<T>) + 'a,
    {
        Self {
            dependency,
            callback: Some(Box::new(callback)),
        }
    }

    /// The token being asked for.
    pub fn dependency(&self) -> DependencyToken<T> {
        self.dependency
    }
}

impl<T: 'static> Request for DependencyRequest<'_, T> {
    fn token(&self) -> TokenId {
        self.dependency.id()
    }

    fn label(&self) -> &'static str {
        self.dependency.label()
    }

    fn offer(&mut self, provider: &dyn Any) -> bool {
        let Some(provider) = provider.downcast_ref::<Provider<T>>() else {
            return false;
        };
        match self.callback.take() {
            Some(callback) => {
                callback(provider.clone());
                true
            }
            None => false,
        }
    }

    fn is_handled(&self) -> bool {
        self.callback.is_none()
    }
}

/// Propagate `request` from `origin` toward the root.
///
/// Returns the component that claimed the request, or `None` if the walk
/// reached the root unclaimed. Propagation starts at `origin` itself unless
/// its configuration disables `self_provides`.
pub fn dispatch(origin: &Component, request: &mut dyn Request) -> Option<Component> {
    let skip = usize::from(!origin.config().self_provides);

    for component in origin.path_to_root().into_iter().skip(skip) {
        trace!(
            origin = %origin.label(),
            component = %component.label(),
            token = request.label(),
            "dependency request hop"
        );
        let Some(registration) = component.provider_registration(request.token()) else {
            continue;
        };
        if registration.claim(request) {
            debug!(
                origin = %origin.label(),
                provider = %component.label(),
                token = request.label(),
                "dependency request claimed"
            );
            return Some(component);
        }
    }

    debug!(origin = %origin.label(), token = request.label(), "dependency request unclaimed");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::dependency::{define, provide};

    fn request_value<T: 'static>(origin: &Component, token: DependencyToken<T>) -> Option<T> {
        let mut value = None;
        let mut request = DependencyRequest::new(token, |provider: Provider<T>| {
            value = Some(provider.get())
        });
        dispatch(origin, &mut request);
        drop(request);
        value
    }

    #[test]
    fn nearest_provider_claims_request() {
        let token = define::<i32>("number");
        let outer = Component::new("outer");
        let inner = Component::new("inner");
        let leaf = Component::new("leaf");
        outer.append_child(&inner).unwrap();
        inner.append_child(&leaf).unwrap();

        provide(&outer, &token, || 1);
        provide(&inner, &token, || 2);
        outer.connect().unwrap();

        assert_eq!(request_value(&leaf, token), Some(2));
    }

    #[test]
    fn dispatch_reports_claiming_component() {
        let token = define::<&'static str>("name");
        let root = Component::new("root");
        let leaf = Component::new("leaf");
        root.append_child(&leaf).unwrap();
        provide(&root, &token, || "root");
        root.connect().unwrap();

        let mut request = DependencyRequest::new(token, |_| {});
        let claimed = dispatch(&leaf, &mut request);

        assert_eq!(claimed, Some(root));
        assert!(request.is_handled());
    }

    #[test]
    fn unclaimed_request_reaches_root() {
        let token = define::<i32>("missing");
        let other = define::<i32>("other");
        let root = Component::new("root");
        let leaf = Component::new("leaf");
        root.append_child(&leaf).unwrap();
        provide(&root, &other, || 7);
        root.connect().unwrap();

        let mut request = DependencyRequest::new(token, |_| {});
        assert!(dispatch(&leaf, &mut request).is_none());
        assert!(!request.is_handled());
    }

    #[test]
    fn detached_providers_are_skipped() {
        let token = define::<i32>("number");
        let root = Component::new("root");
        let leaf = Component::new("leaf");
        root.append_child(&leaf).unwrap();
        provide(&root, &token, || 1);

        // Never connected, so the registration is not listening.
        assert_eq!(request_value(&leaf, token), None);

        root.connect().unwrap();
        assert_eq!(request_value(&leaf, token), Some(1));

        root.disconnect();
        assert_eq!(request_value(&leaf, token), None);
    }

    #[test]
    fn origin_answers_its_own_request() {
        let token = define::<i32>("number");
        let root = Component::new("root");
        let leaf = Component::new("leaf");
        root.append_child(&leaf).unwrap();
        provide(&root, &token, || 1);
        provide(&leaf, &token, || 2);
        root.connect().unwrap();

        assert_eq!(request_value(&leaf, token), Some(2));
    }

    #[test]
    fn self_lookup_can_be_disabled() {
        let token = define::<i32>("number");
        let config = RuntimeConfig {
            self_provides: false,
            ..RuntimeConfig::default()
        };
        let root = Component::new("root");
        let leaf = Component::with_config("leaf", config);
        root.append_child(&leaf).unwrap();
        provide(&root, &token, || 1);
        provide(&leaf, &token, || 2);
        root.connect().unwrap();

        assert_eq!(request_value(&leaf, token), Some(1));
    }

    #[test]
    fn handled_request_rejects_second_offer() {
        let token = define::<i32>("number");
        let provider = Provider::new(|| 5);
        let mut calls = 0;
        let mut request = DependencyRequest::new(token, |_| calls += 1);

        assert!(request.offer(&provider));
        assert!(!request.offer(&provider));
        drop(request);
        assert_eq!(calls, 1);
    }
}
