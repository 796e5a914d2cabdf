//! Error Types
//!
//! Every fallible operation in the crate returns [`Error`]. The two fatal
//! wiring conditions (an unresolved dependency and a misordered subscribe)
//! are raised at the point of use, during the component's connect
//! transition, so that composition bugs surface at startup instead of
//! deep inside unrelated logic.

use thiserror::Error;

use crate::component::ComponentLabel;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the dependency and subscription runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A dependency request reached the root of the tree without being
    /// claimed by any provider.
    #[error("no provider for dependency `{token}` found above {component}")]
    Unresolved {
        /// Diagnostic label of the unresolved token.
        token: &'static str,
        /// The component that issued the request.
        component: ComponentLabel,
    },

    /// `subscribe` was called on a component that had already connected.
    #[error("subscribe called on {component} after it connected; bindings must be installed before the first connect")]
    SubscribeAfterConnect {
        /// The offending component.
        component: ComponentLabel,
    },

    /// A resolved accessor was used outside its component's connected
    /// lifetime.
    #[error("dependency `{token}` accessed while {component} is not connected")]
    NotConnected {
        /// Diagnostic label of the token behind the accessor.
        token: &'static str,
        /// The component that owns the accessor.
        component: ComponentLabel,
    },

    /// Subscribing to a state container that has been finalized.
    #[error("state `{state}` has been finalized")]
    Finalized {
        /// Label of the finalized state.
        state: &'static str,
    },

    /// Attaching a component under itself or one of its descendants.
    #[error("cannot append {child} under {parent}: it is an ancestor of its new parent")]
    HierarchyCycle {
        /// The component that would become the parent.
        parent: ComponentLabel,
        /// The component being attached.
        child: ComponentLabel,
    },

    /// A value source factory or a stream's subscribe step failed.
    #[error("value stream failed: {0}")]
    Stream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an arbitrary error raised by a value source.
    pub fn stream<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Stream(err.into())
    }
}
