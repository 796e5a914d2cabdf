//! Lifecycle controllers.
//!
//! A controller is anything that wants to hear about its host component's
//! connect and disconnect transitions. Provider registrations, resolver
//! registrations and subscription bindings are all controllers.

use std::sync::atomic::{AtomicU64, Ordering};

use super::Component;
use crate::error::Result;

/// Unique identifier for a controller attached to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Generate a new unique controller ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

/// When a controller runs within its host's connect transition.
///
/// Stages run in declaration order: every provider on a component is
/// attached before any resolver dispatches, and every resolver has a
/// provider before any binding acquires its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ControllerStage {
    /// Provider registrations.
    Provide,
    /// Resolver registrations.
    Resolve,
    /// Everything else, including subscription bindings.
    #[default]
    Bind,
}

/// A participant in a component's connected lifetime.
///
/// Hooks run synchronously, grouped by [`ControllerStage`] and in the order
/// controllers were added to the host within a stage.
pub trait Controller {
    /// The controller's identity on its host.
    fn id(&self) -> ControllerId;

    /// The stage this controller runs in.
    fn stage(&self) -> ControllerStage {
        ControllerStage::Bind
    }

    /// Called when the host connects, or immediately when the controller is
    /// added to an already-connected host.
    ///
    /// Returning an error fails the host's connect transition.
    fn host_connected(&self, host: &Component) -> Result<()>;

    /// Called when the host disconnects, or when the controller is removed
    /// from a connected host.
    fn host_disconnected(&self, host: &Component);
}
