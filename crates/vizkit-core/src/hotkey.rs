#![forbid(unsafe_code)]

//! Boolean expressions over the pressed mouse buttons and keys.
//!
//! ```
//! use vizkit_core::hotkey::Hotkey;
//! use vizkit_core::input::{Key, MouseButton};
//!
//! // Left drag with control held, but not with shift.
//! let drag = Hotkey::from(MouseButton::Left) & Key::LeftControl & !Hotkey::from(Key::LeftShift);
//! assert!(matches!(drag, Hotkey::And(..)));
//! ```
//!
//! [`Hotkey::Exclusively`] matches only when exactly the listed buttons are
//! pressed, nothing more and nothing less.

use std::ops::{BitAnd, BitOr, Not};

use ahash::AHashSet;

use crate::input::{Key, MouseButton};

/// A single pressable thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Mouse(MouseButton),
    Key(Key),
}

impl From<MouseButton> for Button {
    fn from(button: MouseButton) -> Self {
        Self::Mouse(button)
    }
}

impl From<Key> for Button {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

/// A pressed-state predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hotkey {
    Always,
    Never,
    Mouse(MouseButton),
    Key(Key),
    And(Box<Hotkey>, Box<Hotkey>),
    Or(Box<Hotkey>, Box<Hotkey>),
    Not(Box<Hotkey>),
    /// Exactly this set of buttons is pressed.
    Exclusively(Vec<Button>),
}

impl Hotkey {
    #[must_use]
    pub fn exclusively(buttons: impl IntoIterator<Item = impl Into<Button>>) -> Self {
        Self::Exclusively(buttons.into_iter().map(Into::into).collect())
    }

    /// Evaluate against explicit pressed sets.
    #[must_use]
    pub fn is_pressed_in(&self, mouse: &AHashSet<MouseButton>, keys: &AHashSet<Key>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Mouse(button) => mouse.contains(button),
            Self::Key(key) => keys.contains(key),
            Self::And(a, b) => a.is_pressed_in(mouse, keys) && b.is_pressed_in(mouse, keys),
            Self::Or(a, b) => a.is_pressed_in(mouse, keys) || b.is_pressed_in(mouse, keys),
            Self::Not(inner) => !inner.is_pressed_in(mouse, keys),
            Self::Exclusively(buttons) => {
                let wanted: AHashSet<Button> = buttons.iter().copied().collect();
                wanted.len() == mouse.len() + keys.len()
                    && wanted.iter().all(|button| match button {
                        Button::Mouse(b) => mouse.contains(b),
                        Button::Key(k) => keys.contains(k),
                    })
            }
        }
    }
}

impl From<bool> for Hotkey {
    fn from(value: bool) -> Self {
        if value { Self::Always } else { Self::Never }
    }
}

impl From<MouseButton> for Hotkey {
    fn from(button: MouseButton) -> Self {
        Self::Mouse(button)
    }
}

impl From<Key> for Hotkey {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

impl From<Button> for Hotkey {
    fn from(button: Button) -> Self {
        match button {
            Button::Mouse(b) => Self::Mouse(b),
            Button::Key(k) => Self::Key(k),
        }
    }
}

impl<R: Into<Hotkey>> BitAnd<R> for Hotkey {
    type Output = Hotkey;

    fn bitand(self, rhs: R) -> Hotkey {
        Hotkey::And(Box::new(self), Box::new(rhs.into()))
    }
}

impl<R: Into<Hotkey>> BitOr<R> for Hotkey {
    type Output = Hotkey;

    fn bitor(self, rhs: R) -> Hotkey {
        Hotkey::Or(Box::new(self), Box::new(rhs.into()))
    }
}

impl Not for Hotkey {
    type Output = Hotkey;

    fn not(self) -> Hotkey {
        Hotkey::Not(Box::new(self))
    }
}
