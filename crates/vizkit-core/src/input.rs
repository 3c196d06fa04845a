#![forbid(unsafe_code)]

//! Canonical input vocabulary.
//!
//! These are the values the windowing backend writes into the [`Events`]
//! cells. Backends that speak in raw integer codes convert through
//! [`Action::from_code`] and [`MouseButton::from_code`], which is where an
//! out-of-contract value is reported.
//!
//! [`Events`]: crate::events::Events

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// What happened to a button or key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    Release,
    Press,
    /// Key held down long enough to auto-repeat. Keyboard only.
    Repeat,
}

impl Action {
    /// Decode a backend action code (`0` release, `1` press, `2` repeat).
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownActionCode`] for any other code.
    pub fn from_code(code: i32) -> Result<Self, EventError> {
        match code {
            0 => Ok(Self::Release),
            1 => Ok(Self::Press),
            2 => Ok(Self::Repeat),
            other => Err(EventError::UnknownActionCode(other)),
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Release => 0,
            Self::Press => 1,
            Self::Repeat => 2,
        }
    }
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseButton {
    /// No button; the initial value of the mouse button cell.
    None,
    Left,
    Right,
    Middle,
    /// Extra buttons, numbered from 4.
    Extra(u8),
}

impl MouseButton {
    /// Highest extra button number a backend may report.
    pub const MAX_EXTRA: u8 = 8;

    /// Decode a backend button code (`-1` none, `0` left, `1` right,
    /// `2` middle, `3..=7` extra buttons 4 to 8).
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownMouseButtonCode`] for any other code.
    pub fn from_code(code: i32) -> Result<Self, EventError> {
        match code {
            -1 => Ok(Self::None),
            0 => Ok(Self::Left),
            1 => Ok(Self::Right),
            2 => Ok(Self::Middle),
            3..=7 => Ok(Self::Extra(code as u8 + 1)),
            other => Err(EventError::UnknownMouseButtonCode(other)),
        }
    }
}

/// Keyboard keys, by physical meaning rather than produced text.
///
/// Printable keys are reported as [`Key::Char`] with the unshifted,
/// lowercase character. Text input arrives separately through the unicode
/// cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Key {
    Unknown,
    Char(char),
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Insert,
    Delete,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    /// Function key `F1`..`F25`.
    F(u8),
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    LeftSuper,
    RightSuper,
    Menu,
}

impl Key {
    #[must_use]
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::LeftShift
                | Self::RightShift
                | Self::LeftControl
                | Self::RightControl
                | Self::LeftAlt
                | Self::RightAlt
                | Self::LeftSuper
                | Self::RightSuper
        )
    }
}

/// A mouse button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub action: Action,
}

impl MouseButtonEvent {
    #[must_use]
    pub const fn new(button: MouseButton, action: Action) -> Self {
        Self { button, action }
    }

    #[must_use]
    pub const fn press(button: MouseButton) -> Self {
        Self::new(button, Action::Press)
    }

    #[must_use]
    pub const fn release(button: MouseButton) -> Self {
        Self::new(button, Action::Release)
    }
}

impl Default for MouseButtonEvent {
    fn default() -> Self {
        Self::release(MouseButton::None)
    }
}

/// A key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyEvent {
    pub key: Key,
    pub action: Action,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(key: Key, action: Action) -> Self {
        Self { key, action }
    }

    #[must_use]
    pub const fn press(key: Key) -> Self {
        Self::new(key, Action::Press)
    }

    #[must_use]
    pub const fn release(key: Key) -> Self {
        Self::new(key, Action::Release)
    }
}

impl Default for KeyEvent {
    fn default() -> Self {
        Self::release(Key::Unknown)
    }
}

/// Integer window rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `(px, py)` lies inside the rectangle (right/top edges excluded).
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let (x, y) = (f64::from(self.x), f64::from(self.y));
        px >= x && py >= y && px < x + f64::from(self.width) && py < y + f64::from(self.height)
    }
}

/// Why a render tick happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TickState {
    #[default]
    Unknown,
    /// The render loop is paused; ticks still arrive.
    Paused,
    /// The frame was skipped because nothing changed.
    Skipped,
    RegularRender,
    /// A frame rendered outside the regular loop (export, forced redraw).
    OneTimeRender,
}

/// A render-loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tick {
    pub state: TickState,
    pub count: u64,
    /// Seconds since the render loop started.
    pub time: f64,
    /// Seconds since the previous tick.
    pub delta_time: f64,
}

/// Which derived-state listener reported a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InputSource {
    Mouse,
    Keyboard,
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mouse => f.write_str("mouse"),
            Self::Keyboard => f.write_str("keyboard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_round_trip() {
        for action in [Action::Release, Action::Press, Action::Repeat] {
            assert_eq!(Action::from_code(action.code()).unwrap(), action);
        }
    }

    #[test]
    fn unknown_action_code_is_reported() {
        assert!(matches!(
            Action::from_code(7),
            Err(EventError::UnknownActionCode(7))
        ));
    }

    #[test]
    fn mouse_codes() {
        assert_eq!(MouseButton::from_code(-1).unwrap(), MouseButton::None);
        assert_eq!(MouseButton::from_code(0).unwrap(), MouseButton::Left);
        assert_eq!(MouseButton::from_code(2).unwrap(), MouseButton::Middle);
        assert_eq!(MouseButton::from_code(3).unwrap(), MouseButton::Extra(4));
        assert_eq!(
            MouseButton::from_code(7).unwrap(),
            MouseButton::Extra(MouseButton::MAX_EXTRA)
        );
        assert!(MouseButton::from_code(8).is_err());
    }

    #[test]
    fn defaults_are_releases_of_nothing() {
        assert_eq!(
            MouseButtonEvent::default(),
            MouseButtonEvent::release(MouseButton::None)
        );
        assert_eq!(KeyEvent::default().key, Key::Unknown);
    }

    #[test]
    fn rect_contains_excludes_far_edges() {
        let r = Rect::new(10, 10, 20, 5);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(29.9, 14.9));
        assert!(!r.contains(30.0, 12.0));
        assert!(!r.contains(9.9, 12.0));
        assert!(Rect::default().is_empty());
    }

    #[test]
    fn modifiers() {
        assert!(Key::LeftControl.is_modifier());
        assert!(!Key::Char('a').is_modifier());
    }
}
