#![forbid(unsafe_code)]

//! vizkit public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! # Migrating from the plural event names
//!
//! The pressed-state accessors used to be called `mousebuttons` and
//! `keyboardbuttons`. They are gone: read the pressed sets with
//! [`Events::is_mouse_button_pressed`](vizkit_core::Events::is_mouse_button_pressed),
//! [`Events::is_key_pressed`](vizkit_core::Events::is_key_pressed) or a
//! [`Hotkey`](vizkit_core::hotkey::Hotkey), and subscribe to the
//! `mouse_button` / `keyboard_button` cells for transitions.

pub mod prelude {
    pub use vizkit_core as core;
    pub use vizkit_reactive as reactive;
    pub use vizkit_scene as scene;

    pub use vizkit_core::hotkey::Hotkey;
    pub use vizkit_core::input::{Action, Key, KeyEvent, MouseButton, MouseButtonEvent};
    pub use vizkit_core::{Events, InputEvent};
    pub use vizkit_reactive::{Dispatch, ListenerError, ListenerHandle, Observable};
    pub use vizkit_scene::{Camera, Orbit, PanZoom, SteeringSet, Transformation};
}
