#![forbid(unsafe_code)]

//! Core: input vocabulary, the event bus, and logging setup.
//!
//! # Role in vizkit
//! `vizkit-core` is the input layer. The windowing backend writes raw input
//! into the cells of [`Events`]; interactive features, camera steering
//! included, subscribe to those cells with priorities.
//!
//! # Primary responsibilities
//! - **Input vocabulary**: buttons, keys, actions, window rectangles, ticks.
//! - **Events**: the cell record plus derived pressed-button/pressed-key
//!   state kept by system-tier listeners.
//! - **Hotkeys**: boolean expressions over the pressed state.
//! - **Input channel**: the single-writer boundary for producers running on
//!   other threads.
//! - **Logging**: subscriber setup driven by `VIZKIT_LOG`.

pub mod channel;
pub mod error;
pub mod events;
pub mod hotkey;
pub mod input;
pub mod logging;

pub use error::EventError;
pub use events::{Events, InputEvent, PressedState};
