//! Lifecycle-Bound Subscriptions
//!
//! Components stay in sync with shared state by binding a callback to a
//! push-based [`ValueStream`]. The binding follows the component: it
//! subscribes on connect and cancels on disconnect, so a component never
//! hears about changes while it is inactive and never leaks a subscription
//! once it is torn down.
//!
//! # Example
//!
//! ```rust,ignore
//! let view = Component::new("gr-preferences");
//! let user = resolve(&view, &user_model)?;
//!
//! subscribe(
//!     &view,
//!     move || Ok(user.try_get()?.preferences()),
//!     |prefs: &Preferences| println!("theme is now {}", prefs.theme),
//! )?;
//! ```

mod stream;
mod binding;

pub use stream::{Subscription, ValueStream};
pub use binding::{subscribe, SubscriptionBinding};
