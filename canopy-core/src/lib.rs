//! Canopy Core
//!
//! This crate provides the runtime that components of a UI tree use to find
//! shared services and to stay in sync with their state. It implements:
//!
//! - Typed dependency tokens and tree-scoped provide/resolve
//! - Synchronous, nearest-first request propagation through the tree
//! - Subscription bindings tied to a component's connected lifetime
//! - Observable model state with distinct projections
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `component`: The component tree and its connect/disconnect lifecycle
//! - `dependency`: Tokens, requests, provider and resolver registrations
//! - `subscription`: Value streams and lifecycle-bound bindings
//! - `model`: State containers for building shared models
//!
//! Everything runs on one thread. Nothing in the runtime suspends: provide,
//! resolve, dispatch, subscribe and cancel all complete on the calling turn.
//!
//! # Example
//!
//! ```rust,ignore
//! use canopy_core::{define, provide, resolve, subscribe, Component, State};
//!
//! let counter_token = define::<State<i32>>("counter");
//!
//! let app = Component::new("app");
//! let counter = State::new("counter", 0);
//! let provided = counter.clone();
//! provide(&app, &counter_token, move || provided.clone());
//!
//! let view = Component::new("view");
//! let model = resolve(&view, &counter_token)?;
//! subscribe(&view, move || model.try_get(), |n: &i32| println!("count: {n}"))?;
//! app.append_child(&view)?;
//!
//! app.connect()?;   // prints "count: 0"
//! counter.set(1);   // prints "count: 1"
//! app.disconnect(); // the view stops listening
//! ```

pub mod component;
pub mod config;
pub mod dependency;
pub mod error;
pub mod model;
pub mod subscription;

pub use component::{
    Component, ComponentId, ComponentLabel, Controller, ControllerId, ControllerStage,
};
pub use config::RuntimeConfig;
pub use dependency::{define, provide, resolve, DependencyToken, Provider, Resolved};
pub use error::{Error, Result};
pub use model::{Finalizable, Selector, State};
pub use subscription::{subscribe, Subscription, ValueStream};
