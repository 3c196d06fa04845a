#![forbid(unsafe_code)]

//! Reactive cells for vizkit.
//!
//! This crate provides the change-notification primitives the event bus and
//! the scene graph are built on:
//!
//! - [`Observable`]: a shared value slot whose listeners run synchronously,
//!   in priority order, every time the value is set.
//! - [`ListenerHandle`]: opaque, type-erased handle returned by registration
//!   and used solely to remove the listener again.
//! - [`Subscription`]: RAII guard that removes its listener on drop.
//! - [`Dispatch`]: what a listener returns; [`Dispatch::Consume`] stops the
//!   remaining listeners of the current `set` call.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. No borrow of the cell is held while a listener runs, so a
//! listener may read the cell, set it again, register new listeners or remove
//! any listener (itself included).
//!
//! # Invariants
//!
//! 1. Listeners run in [`Tier`] order, then priority descending, then
//!    registration order.
//! 2. A removed listener is never invoked after `unregister` returns, even
//!    within the dispatch that is currently running.
//! 3. A listener registered during a dispatch runs in that dispatch only if
//!    its priority slot has not been reached yet.
//! 4. The value is stored before any listener runs; consumption and listener
//!    errors affect notification only.
//! 5. Removing an unknown or already removed handle is a no-op.

pub mod error;
pub mod observable;
mod registry;

pub use error::{Dispatch, ListenerError, ListenerResult};
pub use observable::{ListenerHandle, Observable, Subscription};
pub use registry::Tier;
