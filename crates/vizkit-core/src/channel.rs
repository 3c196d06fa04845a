#![forbid(unsafe_code)]

//! Single-writer boundary between input producers and the event bus.
//!
//! [`Events`] is single-threaded. A backend that polls input on another
//! thread sends [`InputEvent`]s through an [`InputSender`]; the thread that
//! owns the bus drains them with [`InputReceiver::drain_into`], which applies
//! them in send order.
//!
//! The channel is bounded: when the owning thread falls behind, senders block
//! instead of accumulating unbounded memory.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

use vizkit_reactive::ListenerError;

use crate::error::EventError;
use crate::events::{Events, InputEvent};

/// Channel capacity for queued input events.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Create a connected sender/receiver pair.
#[must_use]
pub fn input_channel() -> (InputSender, InputReceiver) {
    let (tx, rx) = mpsc::sync_channel(CHANNEL_CAPACITY);
    (InputSender { tx }, InputReceiver { rx })
}

/// Producer side. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: SyncSender<InputEvent>,
}

impl InputSender {
    /// Queue an event, blocking while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::ChannelClosed`] once the receiver is gone.
    pub fn send(&self, event: InputEvent) -> Result<(), EventError> {
        self.tx.send(event).map_err(|_| EventError::ChannelClosed)
    }
}

/// Consumer side, owned by the thread that owns the [`Events`].
#[derive(Debug)]
pub struct InputReceiver {
    rx: Receiver<InputEvent>,
}

impl InputReceiver {
    /// Apply every queued event to `events`, in order, without blocking.
    ///
    /// Returns how many events were applied. Stops at the first listener
    /// error; the failing event counts as applied (its value is stored) and
    /// the events queued after it stay in the channel.
    ///
    /// # Errors
    ///
    /// Returns the listener error of the failing event.
    pub fn drain_into(&self, events: &Events) -> Result<usize, ListenerError> {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    applied += 1;
                    events.apply(event)?;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if applied > 0 {
            tracing::trace!(message = "input.drain", applied);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Action, Key, KeyEvent, MouseButton, MouseButtonEvent};
    use glam::DVec2;

    #[test]
    fn drains_events_from_another_thread_in_order() {
        let (tx, rx) = input_channel();
        let producer = std::thread::spawn(move || {
            for i in 0..10 {
                tx.send(InputEvent::MousePosition(DVec2::new(f64::from(i), 0.0)))
                    .expect("receiver alive");
            }
            tx.send(InputEvent::Key(KeyEvent::press(Key::Escape)))
                .expect("receiver alive");
        });
        producer.join().expect("producer thread");

        let events = Events::new();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let log = std::rc::Rc::clone(&seen);
        events.mouse_position.on(move |p| log.borrow_mut().push(p.x));

        assert_eq!(rx.drain_into(&events).unwrap(), 11);
        assert_eq!(seen.borrow().len(), 10);
        assert_eq!(seen.borrow()[9], 9.0);
        assert!(events.is_key_pressed(Key::Escape));
        assert_eq!(rx.drain_into(&events).unwrap(), 0);
    }

    #[test]
    fn drain_stops_at_contract_violation() {
        let (tx, rx) = input_channel();
        tx.send(InputEvent::MouseButton(MouseButtonEvent::new(
            MouseButton::Left,
            Action::Repeat,
        )))
        .unwrap();
        tx.send(InputEvent::Focus(true)).unwrap();

        let events = Events::new();
        assert!(rx.drain_into(&events).is_err());
        assert!(!events.has_focus.get());
        assert_eq!(rx.drain_into(&events).unwrap(), 1);
        assert!(events.has_focus.get());
    }

    #[test]
    fn send_after_receiver_dropped_fails() {
        let (tx, rx) = input_channel();
        drop(rx);
        assert_eq!(
            tx.send(InputEvent::Focus(false)),
            Err(EventError::ChannelClosed)
        );
    }
}
