#![forbid(unsafe_code)]

//! The event bus: one observable cell per kind of window/input state.
//!
//! # Design
//!
//! [`Events`] is a record of [`Observable`] cells. The backend writes raw
//! input into them (directly, through [`Events::apply`], or through an
//! [input channel](crate::channel)); features subscribe with priorities and
//! may consume events to hide them from lower-priority listeners.
//!
//! Two pieces of derived state, the sets of currently pressed mouse buttons
//! and keys, are maintained by system-tier listeners registered at
//! construction. They run before every user listener, never consume, and
//! survive [`Events::reset_user_listeners`]. The sets themselves are plain
//! sets, not cells.
//!
//! # Invariants
//!
//! 1. A press inserts into the pressed set, a release removes from it.
//! 2. Releasing something that is not pressed leaves the set unchanged and is
//!    not an error.
//! 3. A mouse [`Action::Repeat`] is a contract violation: the set is left
//!    unchanged and the error is returned from the `set` call.
//! 4. A key [`Action::Repeat`] leaves the key pressed.
//! 5. Cloning `Events` shares every cell and both pressed sets.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashSet;
use glam::DVec2;
use vizkit_reactive::{Dispatch, ListenerError, ListenerHandle, ListenerResult, Observable};

use crate::error::EventError;
use crate::hotkey::Hotkey;
use crate::input::{
    Action, InputSource, Key, KeyEvent, MouseButton, MouseButtonEvent, Rect, Tick,
};

/// Priority of the built-in pressed-state listeners within the system tier.
const PRESSED_STATE_PRIORITY: i32 = i32::MAX;

/// Window and input state shared by every feature of a scene.
#[derive(Clone)]
pub struct Events {
    /// Window position and size in screen pixels.
    pub window_area: Observable<Rect>,
    /// Pixels per inch of the monitor the window is on.
    pub window_dpi: Observable<f64>,
    pub window_open: Observable<bool>,
    /// Last mouse button transition.
    pub mouse_button: Observable<MouseButtonEvent>,
    /// Cursor position in window pixels, origin bottom left.
    pub mouse_position: Observable<DVec2>,
    /// Last scroll delta.
    pub scroll: Observable<DVec2>,
    /// Last key transition.
    pub keyboard_button: Observable<KeyEvent>,
    /// Last character of text input.
    pub unicode_input: Observable<char>,
    /// Paths of files dropped onto the window, in drop order.
    pub dropped_files: Observable<Vec<String>>,
    pub has_focus: Observable<bool>,
    /// Whether the cursor is inside the window.
    pub entered_window: Observable<bool>,
    pub tick: Observable<Tick>,

    mouse_buttons_pressed: Rc<RefCell<AHashSet<MouseButton>>>,
    keys_pressed: Rc<RefCell<AHashSet<Key>>>,
    system_handles: Rc<[ListenerHandle; 2]>,
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("window_area", &self.window_area.get())
            .field("mouse_position", &self.mouse_position.get())
            .field("mouse_buttons_pressed", &self.mouse_buttons_pressed.borrow().len())
            .field("keys_pressed", &self.keys_pressed.borrow().len())
            .field("user_listeners", &self.user_listener_count())
            .finish()
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl Events {
    /// Create the cells with their initial values and wire the pressed-state
    /// listeners.
    #[must_use]
    pub fn new() -> Self {
        let mouse_button = Observable::new(MouseButtonEvent::default());
        let keyboard_button = Observable::new(KeyEvent::default());
        let mouse_buttons_pressed = Rc::new(RefCell::new(AHashSet::new()));
        let keys_pressed = Rc::new(RefCell::new(AHashSet::new()));

        let mouse_handle = {
            let pressed = Rc::clone(&mouse_buttons_pressed);
            mouse_button.register_system(PRESSED_STATE_PRIORITY, move |event| {
                sync_mouse_buttons(&pressed, event)
            })
        };
        let key_handle = {
            let pressed = Rc::clone(&keys_pressed);
            keyboard_button.register_system(PRESSED_STATE_PRIORITY, move |event| {
                sync_keys(&pressed, event)
            })
        };

        Self {
            window_area: Observable::new(Rect::default()),
            window_dpi: Observable::new(100.0),
            window_open: Observable::new(false),
            mouse_button,
            mouse_position: Observable::new(DVec2::ZERO),
            scroll: Observable::new(DVec2::ZERO),
            keyboard_button,
            unicode_input: Observable::new('\0'),
            dropped_files: Observable::new(Vec::new()),
            has_focus: Observable::new(false),
            entered_window: Observable::new(false),
            tick: Observable::new(Tick::default()),
            mouse_buttons_pressed,
            keys_pressed,
            system_handles: Rc::new([mouse_handle, key_handle]),
        }
    }

    /// Whether `button` is currently held down.
    #[must_use]
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.borrow().contains(&button)
    }

    /// Whether `key` is currently held down.
    #[must_use]
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.borrow().contains(&key)
    }

    /// Snapshot of the currently pressed mouse buttons.
    #[must_use]
    pub fn mouse_buttons_pressed(&self) -> AHashSet<MouseButton> {
        self.mouse_buttons_pressed.borrow().clone()
    }

    /// Snapshot of the currently pressed keys.
    #[must_use]
    pub fn keys_pressed(&self) -> AHashSet<Key> {
        self.keys_pressed.borrow().clone()
    }

    /// Evaluate a hotkey expression against the current pressed state.
    #[must_use]
    pub fn is_pressed(&self, hotkey: &Hotkey) -> bool {
        hotkey.is_pressed_in(
            &self.mouse_buttons_pressed.borrow(),
            &self.keys_pressed.borrow(),
        )
    }

    /// A view of the pressed sets that holds no cell.
    ///
    /// Listeners registered on a cell of this bus should capture this
    /// instead of a clone of `Events`, which would keep the cell alive
    /// through its own listener.
    #[must_use]
    pub fn pressed_state(&self) -> PressedState {
        PressedState {
            mouse_buttons: Rc::clone(&self.mouse_buttons_pressed),
            keys: Rc::clone(&self.keys_pressed),
        }
    }

    /// Remove every user listener from every cell.
    ///
    /// The pressed-state listeners are system-tier and stay registered.
    /// Returns the number of listeners removed.
    pub fn reset_user_listeners(&self) -> usize {
        let removed = self.window_area.clear_listeners()
            + self.window_dpi.clear_listeners()
            + self.window_open.clear_listeners()
            + self.mouse_button.clear_listeners()
            + self.mouse_position.clear_listeners()
            + self.scroll.clear_listeners()
            + self.keyboard_button.clear_listeners()
            + self.unicode_input.clear_listeners()
            + self.dropped_files.clear_listeners()
            + self.has_focus.clear_listeners()
            + self.entered_window.clear_listeners()
            + self.tick.clear_listeners();
        tracing::debug!(message = "events.reset_user_listeners", removed);
        removed
    }

    /// Number of user listeners across every cell.
    #[must_use]
    pub fn user_listener_count(&self) -> usize {
        self.window_area.user_listener_count()
            + self.window_dpi.user_listener_count()
            + self.window_open.user_listener_count()
            + self.mouse_button.user_listener_count()
            + self.mouse_position.user_listener_count()
            + self.scroll.user_listener_count()
            + self.keyboard_button.user_listener_count()
            + self.unicode_input.user_listener_count()
            + self.dropped_files.user_listener_count()
            + self.has_focus.user_listener_count()
            + self.entered_window.user_listener_count()
            + self.tick.user_listener_count()
    }

    /// Whether both pressed-state listeners are still registered.
    #[must_use]
    pub fn pressed_state_wired(&self) -> bool {
        self.system_handles.iter().all(ListenerHandle::is_attached)
    }

    /// Write one backend event into its cell.
    ///
    /// # Errors
    ///
    /// Returns the first listener error raised while dispatching the event.
    pub fn apply(&self, event: InputEvent) -> Result<(), ListenerError> {
        match event {
            InputEvent::WindowArea(area) => self.window_area.set(area),
            InputEvent::WindowDpi(dpi) => self.window_dpi.set(dpi),
            InputEvent::WindowOpen(open) => self.window_open.set(open),
            InputEvent::MouseButton(ev) => self.mouse_button.set(ev),
            InputEvent::MousePosition(pos) => self.mouse_position.set(pos),
            InputEvent::Scroll(delta) => self.scroll.set(delta),
            InputEvent::Key(ev) => self.keyboard_button.set(ev),
            InputEvent::Unicode(ch) => self.unicode_input.set(ch),
            InputEvent::DroppedFiles(paths) => self.dropped_files.set(paths),
            InputEvent::Focus(focused) => self.has_focus.set(focused),
            InputEvent::MouseEntered(entered) => self.entered_window.set(entered),
            InputEvent::Tick(tick) => self.tick.set(tick),
        }
    }
}

/// One backend input, addressed to a single [`Events`] cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputEvent {
    WindowArea(Rect),
    WindowDpi(f64),
    WindowOpen(bool),
    MouseButton(MouseButtonEvent),
    MousePosition(DVec2),
    Scroll(DVec2),
    Key(KeyEvent),
    Unicode(char),
    DroppedFiles(Vec<String>),
    Focus(bool),
    MouseEntered(bool),
    Tick(Tick),
}

/// Shared read-only view of the pressed mouse buttons and keys of an
/// [`Events`] bus.
#[derive(Debug, Clone)]
pub struct PressedState {
    mouse_buttons: Rc<RefCell<AHashSet<MouseButton>>>,
    keys: Rc<RefCell<AHashSet<Key>>>,
}

impl PressedState {
    #[must_use]
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.borrow().contains(&button)
    }

    #[must_use]
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys.borrow().contains(&key)
    }

    #[must_use]
    pub fn is_pressed(&self, hotkey: &Hotkey) -> bool {
        hotkey.is_pressed_in(&self.mouse_buttons.borrow(), &self.keys.borrow())
    }
}

fn sync_mouse_buttons(
    pressed: &RefCell<AHashSet<MouseButton>>,
    event: &MouseButtonEvent,
) -> ListenerResult {
    match event.action {
        Action::Press => {
            pressed.borrow_mut().insert(event.button);
        }
        Action::Release => {
            pressed.borrow_mut().remove(&event.button);
        }
        Action::Repeat => {
            tracing::warn!(
                message = "events.contract_violation",
                origin = %InputSource::Mouse,
                button = ?event.button
            );
            return Err(EventError::UnexpectedAction {
                origin: InputSource::Mouse,
                action: event.action,
            }
            .into());
        }
    }
    Ok(Dispatch::Continue)
}

fn sync_keys(pressed: &RefCell<AHashSet<Key>>, event: &KeyEvent) -> ListenerResult {
    match event.action {
        Action::Press => {
            pressed.borrow_mut().insert(event.key);
        }
        Action::Release => {
            pressed.borrow_mut().remove(&event.key);
        }
        Action::Repeat => {}
    }
    Ok(Dispatch::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn press_then_release_clears_button() {
        let events = Events::new();
        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Left))
            .unwrap();
        assert!(events.is_mouse_button_pressed(MouseButton::Left));
        events
            .mouse_button
            .set(MouseButtonEvent::release(MouseButton::Left))
            .unwrap();
        assert!(!events.is_mouse_button_pressed(MouseButton::Left));
    }

    #[test]
    fn release_without_press_is_silent() {
        let events = Events::new();
        events
            .mouse_button
            .set(MouseButtonEvent::release(MouseButton::Right))
            .unwrap();
        events.keyboard_button.set(KeyEvent::release(Key::Tab)).unwrap();
        assert!(events.mouse_buttons_pressed().is_empty());
        assert!(events.keys_pressed().is_empty());
    }

    #[test]
    fn mouse_repeat_is_contract_violation() {
        let events = Events::new();
        let err = events
            .mouse_button
            .set(MouseButtonEvent::new(MouseButton::Left, Action::Repeat))
            .unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(
            err.downcast_ref::<EventError>(),
            Some(&EventError::UnexpectedAction {
                origin: InputSource::Mouse,
                action: Action::Repeat,
            })
        );
        assert!(events.mouse_buttons_pressed().is_empty());
    }

    #[test]
    fn key_repeat_keeps_key_pressed() {
        let events = Events::new();
        events.keyboard_button.set(KeyEvent::press(Key::Up)).unwrap();
        events
            .keyboard_button
            .set(KeyEvent::new(Key::Up, Action::Repeat))
            .unwrap();
        assert!(events.is_key_pressed(Key::Up));
    }

    #[test]
    fn pressed_state_updates_before_consuming_user_listener() {
        let events = Events::new();
        let saw_pressed = Rc::new(Cell::new(false));
        let probe = Rc::clone(&saw_pressed);
        let view = events.clone();
        events.mouse_button.register(i32::MAX, move |ev| {
            probe.set(view.is_mouse_button_pressed(ev.button));
            Ok(Dispatch::Consume)
        });

        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Middle))
            .unwrap();
        assert!(saw_pressed.get());
        assert!(events.is_mouse_button_pressed(MouseButton::Middle));
    }

    #[test]
    fn reset_keeps_pressed_state_wiring() {
        let events = Events::new();
        events.mouse_position.on(|_| {});
        events.scroll.on(|_| {});
        events.keyboard_button.on(|_| {});
        assert_eq!(events.user_listener_count(), 3);

        assert_eq!(events.reset_user_listeners(), 3);
        assert_eq!(events.user_listener_count(), 0);
        assert!(events.pressed_state_wired());

        events.keyboard_button.set(KeyEvent::press(Key::Char('a'))).unwrap();
        assert!(events.is_key_pressed(Key::Char('a')));
    }

    #[test]
    fn apply_routes_to_cells() {
        let events = Events::new();
        events.apply(InputEvent::WindowArea(Rect::new(0, 0, 640, 480))).unwrap();
        events.apply(InputEvent::MousePosition(DVec2::new(3.0, 4.0))).unwrap();
        events
            .apply(InputEvent::DroppedFiles(vec!["a.csv".into(), "b.csv".into()]))
            .unwrap();
        events.apply(InputEvent::Focus(true)).unwrap();

        assert_eq!(events.window_area.get().width, 640);
        assert_eq!(events.mouse_position.get(), DVec2::new(3.0, 4.0));
        assert_eq!(events.dropped_files.get(), vec!["a.csv", "b.csv"]);
        assert!(events.has_focus.get());
    }

    #[test]
    fn clones_share_pressed_state() {
        let events = Events::new();
        let other = events.clone();
        events.keyboard_button.set(KeyEvent::press(Key::Enter)).unwrap();
        assert!(other.is_key_pressed(Key::Enter));
    }

    #[test]
    fn pressed_state_view_follows_bus() {
        let events = Events::new();
        let view = events.pressed_state();
        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Middle))
            .unwrap();
        assert!(view.is_mouse_button_pressed(MouseButton::Middle));
        assert!(view.is_pressed(&Hotkey::from(MouseButton::Middle)));
        events
            .mouse_button
            .set(MouseButtonEvent::release(MouseButton::Middle))
            .unwrap();
        assert!(!view.is_mouse_button_pressed(MouseButton::Middle));
        assert!(!view.is_key_pressed(Key::Enter));
    }
}
