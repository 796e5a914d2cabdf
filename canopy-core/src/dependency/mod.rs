//! Tree-Scoped Dependencies
//!
//! This module lets any component obtain a shared service from the nearest
//! ancestor that provides it, without a global registry.
//!
//! # Concepts
//!
//! ## Tokens
//!
//! A [`DependencyToken<T>`] names a dependency of type `T`. Tokens are unique
//! by construction: two `define` calls never produce equal tokens, even with
//! the same label.
//!
//! ## Providers
//!
//! [`provide`] installs a function on a component that produces the value
//! for a token. The registration listens for requests while the component
//! is connected.
//!
//! ## Resolvers
//!
//! [`resolve`] hands back a [`Resolved<T>`] accessor. On the component's
//! connect transition the accessor dispatches one [`DependencyRequest`]
//! toward the root; the nearest attached provider claims it. Afterwards,
//! `get()` calls the claimed provider directly.
//!
//! # Example
//!
//! ```rust,ignore
//! let change_model = define::<Rc<ChangeModel>>("change-model");
//!
//! let app = Component::new("gr-app");
//! let model = Rc::new(ChangeModel::default());
//! provide(&app, &change_model, move || Rc::clone(&model));
//!
//! let view = Component::new("gr-change-view");
//! let model = resolve(&view, &change_model)?;
//! app.append_child(&view)?;
//!
//! app.connect()?; // `view` resolves here
//! model.get().reload();
//! ```

mod token;
mod request;
mod provider;
mod resolver;

pub use token::{define, DependencyToken, TokenId};
pub use request::{dispatch, DependencyRequest, Request};
pub use provider::{provide, Provider, ProviderRegistration};
pub use resolver::{resolve, Resolved, ResolverRegistration};
