//! Component Tree
//!
//! This module implements the host side of the runtime: a tree of
//! components, each with a connect/disconnect lifecycle and a list of
//! controllers that follow it.
//!
//! # Ownership
//!
//! A [`Component`] is a cheap handle (`Rc`) to shared node state. Parents
//! hold strong references to their children and children hold weak
//! references to their parent, so dropping the last handle to a detached
//! subtree frees it.
//!
//! Each component owns its own provider and resolver maps. There is no
//! global registry: two trees never see each other's dependencies, and a
//! component's maps are only ever touched through that component.
//!
//! # Lifecycle
//!
//! `connect()` marks the component connected and runs `host_connected` on
//! every controller, stage by stage: providers attach, then resolvers
//! dispatch, then bindings acquire their sources. Within a stage controllers
//! run in registration order. If a controller fails, the controllers that
//! already ran are disconnected in reverse order and the component is left
//! disconnected. Children are connected afterwards; a failing child does not
//! stop its later siblings from connecting, and the first error is returned.
//!
//! `disconnect()` runs `host_disconnected` on every controller and then
//! disconnects the children. Both transitions are idempotent.

mod controller;

pub use controller::{Controller, ControllerId, ControllerStage};

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::dependency::{ProviderRegistration, TokenId};
use crate::error::{Error, Result};

/// Unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Generate a new unique component ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Diagnostic identity of a component, rendered as `name#id`.
///
/// Errors carry a label rather than a handle so they never keep a
/// component alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLabel {
    id: ComponentId,
    name: Arc<str>,
}

impl ComponentLabel {
    /// The component's unique ID.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The component's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The components between a node and the root, nearest first.
pub type ComponentPath = SmallVec<[Component; 8]>;

/// A node in the component tree.
///
/// Cloning a `Component` creates a new handle to the **same** node.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

struct ComponentInner {
    id: ComponentId,
    name: Arc<str>,
    config: RuntimeConfig,
    parent: RefCell<Weak<ComponentInner>>,
    children: RefCell<Vec<Component>>,
    connected: Cell<bool>,
    /// Set once the first connect transition completes.
    has_connected: Cell<bool>,
    controllers: RefCell<IndexMap<ControllerId, Rc<dyn Controller>>>,
    providers: RefCell<IndexMap<TokenId, Rc<ProviderRegistration>>>,
    /// Resolver registrations, type-erased. Each entry is an
    /// `Rc<ResolverRegistration<T>>` for the token it is keyed by.
    resolvers: RefCell<IndexMap<TokenId, Rc<dyn Any>>>,
}

impl Component {
    /// Create a detached, disconnected component with default settings.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_config(name, RuntimeConfig::default())
    }

    /// Create a detached, disconnected component with the given settings.
    pub fn with_config(name: impl Into<Arc<str>>, config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(ComponentInner {
                id: ComponentId::new(),
                name: name.into(),
                config,
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                connected: Cell::new(false),
                has_connected: Cell::new(false),
                controllers: RefCell::new(IndexMap::new()),
                providers: RefCell::new(IndexMap::new()),
                resolvers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the component's unique ID.
    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    /// Get the component's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the component's diagnostic label.
    pub fn label(&self) -> ComponentLabel {
        ComponentLabel {
            id: self.inner.id,
            name: Arc::clone(&self.inner.name),
        }
    }

    /// Get the component's runtime settings.
    pub fn config(&self) -> RuntimeConfig {
        self.inner.config
    }

    /// Check whether two handles refer to the same node.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------------
    // Tree adjacency
    // ------------------------------------------------------------------------

    /// Get the parent component, if attached.
    pub fn parent(&self) -> Option<Component> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Component { inner })
    }

    /// Get the children, in insertion order.
    pub fn children(&self) -> Vec<Component> {
        self.inner.children.borrow().clone()
    }

    /// Get this component followed by each of its ancestors, nearest first.
    pub fn path_to_root(&self) -> ComponentPath {
        let mut path = ComponentPath::new();
        let mut current = Some(self.clone());
        while let Some(component) = current {
            current = component.parent();
            path.push(component);
        }
        path
    }

    /// Attach `child` as the last child of this component.
    ///
    /// A child that already has a parent is moved. If this component is
    /// connected the child is connected, and any error from that transition
    /// is returned (the child stays attached but disconnected).
    pub fn append_child(&self, child: &Component) -> Result<()> {
        if self.path_to_root().iter().any(|c| c.ptr_eq(child)) {
            return Err(Error::HierarchyCycle {
                parent: self.label(),
                child: child.label(),
            });
        }

        if let Some(previous) = child.parent() {
            previous.remove_child(child);
        }

        self.inner.children.borrow_mut().push(child.clone());
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);

        if self.is_connected() {
            child.connect()?;
        } else if child.is_connected() {
            child.disconnect();
        }
        Ok(())
    }

    /// Detach `child` from this component, disconnecting it if needed.
    ///
    /// Returns `false` if `child` was not a child of this component.
    pub fn remove_child(&self, child: &Component) -> bool {
        let removed = {
            let mut children = self.inner.children.borrow_mut();
            match children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            *child.inner.parent.borrow_mut() = Weak::new();
            child.disconnect();
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Check whether the component is inside its connected lifetime.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    /// Check whether the component has ever completed a connect transition.
    pub fn has_connected(&self) -> bool {
        self.inner.has_connected.get()
    }

    /// Run the connect transition on this component and its subtree.
    pub fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        debug!(component = %self.label(), "connecting");
        self.inner.connected.set(true);

        let controllers = self.controllers();
        for (index, controller) in controllers.iter().enumerate() {
            // Skip controllers removed by an earlier hook in this transition.
            if !self.has_controller(controller.id()) {
                continue;
            }
            if let Err(err) = controller.host_connected(self) {
                debug!(component = %self.label(), error = %err, "connect failed, rolling back");
                let pending: HashSet<ControllerId> =
                    controllers[index..].iter().map(|c| c.id()).collect();
                for connected in self.controllers().iter().rev() {
                    if !pending.contains(&connected.id()) {
                        connected.host_disconnected(self);
                    }
                }
                self.inner.connected.set(false);
                return Err(err);
            }
        }
        self.inner.has_connected.set(true);

        let mut first_error = None;
        for child in self.children() {
            if let Err(err) = child.connect() {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run the disconnect transition on this component and its subtree.
    pub fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        debug!(component = %self.label(), "disconnecting");
        self.inner.connected.set(false);

        for controller in self.controllers() {
            if self.has_controller(controller.id()) {
                controller.host_disconnected(self);
            }
        }

        for child in self.children() {
            child.disconnect();
        }
    }

    // ------------------------------------------------------------------------
    // Controllers
    // ------------------------------------------------------------------------

    /// Attach a controller.
    ///
    /// If the component is already connected, the controller's
    /// `host_connected` hook runs immediately; if it fails, the controller is
    /// removed again and the error is returned.
    pub fn add_controller(&self, controller: Rc<dyn Controller>) -> Result<()> {
        self.insert_controller(Rc::clone(&controller));
        if self.is_connected() {
            if let Err(err) = controller.host_connected(self) {
                self.inner.controllers.borrow_mut().shift_remove(&controller.id());
                return Err(err);
            }
        }
        Ok(())
    }

    /// Detach a controller, running its `host_disconnected` hook if the
    /// component is connected.
    pub fn remove_controller(&self, id: ControllerId) -> Option<Rc<dyn Controller>> {
        let removed = self.inner.controllers.borrow_mut().shift_remove(&id);
        if let Some(controller) = &removed {
            if self.is_connected() {
                controller.host_disconnected(self);
            }
        }
        removed
    }

    /// Get the number of attached controllers.
    pub fn controller_count(&self) -> usize {
        self.inner.controllers.borrow().len()
    }

    /// Attach a controller without running any hook.
    pub(crate) fn insert_controller(&self, controller: Rc<dyn Controller>) {
        self.inner
            .controllers
            .borrow_mut()
            .insert(controller.id(), controller);
    }

    fn has_controller(&self, id: ControllerId) -> bool {
        self.inner.controllers.borrow().contains_key(&id)
    }

    /// Snapshot of the controllers in run order, so hooks may add or remove
    /// controllers while the snapshot is walked.
    fn controllers(&self) -> Vec<Rc<dyn Controller>> {
        let mut controllers: Vec<_> = self.inner.controllers.borrow().values().cloned().collect();
        controllers.sort_by_key(|c| c.stage());
        controllers
    }

    // ------------------------------------------------------------------------
    // Dependency bookkeeping
    // ------------------------------------------------------------------------

    pub(crate) fn provider_registration(&self, token: TokenId) -> Option<Rc<ProviderRegistration>> {
        self.inner.providers.borrow().get(&token).cloned()
    }

    pub(crate) fn take_provider_registration(
        &self,
        token: TokenId,
    ) -> Option<Rc<ProviderRegistration>> {
        self.inner.providers.borrow_mut().shift_remove(&token)
    }

    pub(crate) fn insert_provider_registration(&self, registration: Rc<ProviderRegistration>) {
        self.inner
            .providers
            .borrow_mut()
            .insert(registration.token(), registration);
    }

    pub(crate) fn resolver_registration(&self, token: TokenId) -> Option<Rc<dyn Any>> {
        self.inner.resolvers.borrow().get(&token).cloned()
    }

    pub(crate) fn insert_resolver_registration(&self, token: TokenId, registration: Rc<dyn Any>) {
        self.inner.resolvers.borrow_mut().insert(token, registration);
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("connected", &self.is_connected())
            .field("children", &self.inner.children.borrow().len())
            .field("controllers", &self.controller_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
