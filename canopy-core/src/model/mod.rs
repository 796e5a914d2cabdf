//! Model State
//!
//! Shared services in a component tree are usually models: objects that own
//! some state and expose it as streams for views to bind to. This module
//! provides the building blocks for them.
//!
//! - [`State<T>`]: the current value plus change notification. Subscribing
//!   replays the current value first.
//! - [`Selector<T, U>`]: a projection of a stream that only emits when the
//!   projected value changes.
//! - [`Finalizable`]: teardown for models whose owner goes away.
//!
//! # Example
//!
//! ```rust,ignore
//! struct ChangeModel {
//!     state: State<ChangeState>,
//! }
//!
//! impl ChangeModel {
//!     fn loading(&self) -> Selector<ChangeState, bool> {
//!         self.state.select(|s| s.loading_status == LoadingStatus::Loading)
//!     }
//! }
//! ```

mod state;

pub use state::{select, Selector, State};

/// Something that holds resources until it is explicitly torn down.
///
/// Finalizing is idempotent. After it, the object must stop delivering
/// values and refuse new subscribers.
pub trait Finalizable {
    /// Release everything held by the object.
    fn finalize(&self);
}
