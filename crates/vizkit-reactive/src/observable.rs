#![forbid(unsafe_code)]

//! Observable value cell with priority-ordered, consumable listeners.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Every [`set`](Observable::set) stores the
//! value and then runs the registered listeners synchronously, in priority
//! order, until one of them returns [`Dispatch::Consume`] or fails.
//!
//! Unlike a change-detection cell, `set` always dispatches: input cells carry
//! events, and pressing the same button twice is two events.
//!
//! # Performance
//!
//! | Operation      | Complexity                          |
//! |----------------|-------------------------------------|
//! | `get()`        | O(1) + clone                        |
//! | `set()`        | O(L log L) where L = listeners      |
//! | `register()`   | O(L)                                |
//! | `unregister()` | O(L)                                |
//!
//! # Failure Modes
//!
//! - **Listener error**: the error is returned from `set`; listeners after
//!   the failing one do not run for that call. The value stays stored.
//! - **Re-entrant `set`**: a listener may `set` the cell that is
//!   dispatching. The nested dispatch runs to completion first; the outer
//!   dispatch then stops, so lower-priority listeners only see the newest
//!   value and never an older one after it.
//! - **Borrow inside `with`**: calling `set`, `register` or `unregister` on
//!   the same cell from inside a [`with`](Observable::with) closure panics
//!   (RefCell borrow rules). Listener callbacks do not have this restriction.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Dispatch, ListenerError, ListenerResult};
use crate::registry::{Registry, Tier};

/// Shared interior for [`Observable<T>`].
struct ObservableInner<T> {
    value: T,
    version: u64,
    /// Bumped at the start of every dispatch, nested ones included.
    generation: u64,
    listeners: Registry<T>,
}

/// Type-erased removal entry point, so a handle can detach itself without
/// knowing the value type of its cell.
trait Detach {
    fn detach(&self, seq: u64) -> bool;
    fn is_registered(&self, seq: u64) -> bool;
}

impl<T> Detach for RefCell<ObservableInner<T>> {
    fn detach(&self, seq: u64) -> bool {
        let removed = self.borrow_mut().listeners.remove(seq);
        if removed {
            tracing::trace!(message = "observable.unregister", seq);
        }
        removed
    }

    fn is_registered(&self, seq: u64) -> bool {
        self.borrow().listeners.contains(seq)
    }
}

/// A shared value cell with priority-ordered change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** cell: both
/// handles see the same value and share listeners.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("listener_count", &inner.listeners.len())
            .finish()
    }
}

impl<T: Default + Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Create a cell holding `value`, at version 0 with no listeners.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                generation: 0,
                listeners: Registry::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store `value` and dispatch it to the listeners.
    ///
    /// # Errors
    ///
    /// Returns the first listener error; the remaining listeners of this call
    /// are skipped but `value` is stored regardless.
    pub fn set(&self, value: T) -> Result<(), ListenerError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            inner.version += 1;
        }
        self.dispatch()
    }

    /// Modify the value in place and dispatch the result.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), ListenerError> {
        {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
            inner.version += 1;
        }
        self.dispatch()
    }

    /// Dispatch the current value again without changing it.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn notify(&self) -> Result<(), ListenerError> {
        self.dispatch()
    }

    /// Register a user-tier listener at `priority`.
    ///
    /// Higher priorities run first; equal priorities run in registration
    /// order.
    pub fn register(
        &self,
        priority: i32,
        callback: impl Fn(&T) -> ListenerResult + 'static,
    ) -> ListenerHandle {
        self.register_in(Tier::User, priority, callback)
    }

    /// Register a user-tier listener at priority 0 that never consumes.
    pub fn on(&self, callback: impl Fn(&T) + 'static) -> ListenerHandle {
        self.register(0, move |value| {
            callback(value);
            Ok(Dispatch::Continue)
        })
    }

    /// Register a system-tier listener.
    ///
    /// System listeners run before every user listener and survive
    /// [`clear_listeners`](Self::clear_listeners). They are meant for
    /// derived-state bookkeeping and should return [`Dispatch::Continue`].
    pub fn register_system(
        &self,
        priority: i32,
        callback: impl Fn(&T) -> ListenerResult + 'static,
    ) -> ListenerHandle {
        self.register_in(Tier::System, priority, callback)
    }

    fn register_in(
        &self,
        tier: Tier,
        priority: i32,
        callback: impl Fn(&T) -> ListenerResult + 'static,
    ) -> ListenerHandle {
        let seq = self
            .inner
            .borrow_mut()
            .listeners
            .insert(tier, priority, Rc::new(callback));
        tracing::trace!(message = "observable.register", seq, priority, ?tier);
        let weak: Weak<RefCell<ObservableInner<T>>> = Rc::downgrade(&self.inner);
        ListenerHandle { cell: weak, seq }
    }

    /// Remove the listener behind `handle`.
    ///
    /// Returns `true` if a listener was removed. Unknown handles, handles of
    /// other cells and handles already removed are ignored.
    pub fn unregister(&self, handle: &ListenerHandle) -> bool {
        if !self.owns(handle) {
            return false;
        }
        self.inner.detach(handle.seq)
    }

    /// Remove every user-tier listener. System listeners stay in place.
    ///
    /// Returns how many listeners were removed.
    pub fn clear_listeners(&self) -> usize {
        let removed = self.inner.borrow_mut().listeners.clear_tier(Tier::User);
        if removed > 0 {
            tracing::trace!(message = "observable.clear", removed);
        }
        removed
    }

    /// Total number of registered listeners (both tiers).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Number of registered user-tier listeners.
    #[must_use]
    pub fn user_listener_count(&self) -> usize {
        self.inner.borrow().listeners.len_tier(Tier::User)
    }

    /// Number of `set`/`update` calls so far. Useful for dirty-checking in
    /// render loops.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Whether both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Derive a cell whose value is `f` of this cell's value.
    ///
    /// The derived cell is updated eagerly from a user-tier listener, so it
    /// stays alive as long as this cell keeps the listener.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Observable<U> {
        let derived = Observable::new(self.with(&f));
        let target = derived.clone();
        self.register(0, move |value| {
            target.set(f(value))?;
            Ok(Dispatch::Continue)
        });
        derived
    }

    fn owns(&self, handle: &ListenerHandle) -> bool {
        std::ptr::addr_eq(handle.cell.as_ptr(), Rc::as_ptr(&self.inner))
    }

    fn dispatch(&self) -> Result<(), ListenerError> {
        let (value, watermark, generation) = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            (inner.value.clone(), inner.listeners.watermark(), inner.generation)
        };

        let mut cursor = None;
        loop {
            let next = self
                .inner
                .borrow()
                .listeners
                .next_after(cursor.as_ref(), watermark);
            let Some((key, callback)) = next else {
                return Ok(());
            };
            cursor = Some(key);
            let outcome = callback(&value);
            if outcome.is_ok() && self.inner.borrow().generation != generation {
                // A nested dispatch already delivered a newer value.
                tracing::trace!(message = "observable.superseded", priority = key.priority());
                return Ok(());
            }
            match outcome {
                Ok(Dispatch::Continue) => {}
                Ok(Dispatch::Consume) => {
                    tracing::trace!(
                        message = "observable.consume",
                        priority = key.priority(),
                        tier = ?key.tier()
                    );
                    return Ok(());
                }
                Err(err) => {
                    tracing::debug!(
                        message = "observable.listener_error",
                        priority = key.priority(),
                        error = %err
                    );
                    return Err(err);
                }
            }
        }
    }
}

/// Opaque handle to a registered listener.
///
/// The handle only identifies the listener; it does not keep the cell alive.
/// [`detach`](Self::detach) works without knowing the cell's value type,
/// which is what lets heterogeneous listener sets (camera steering, parent
/// links) be torn down as a unit.
#[derive(Clone)]
pub struct ListenerHandle {
    cell: Weak<dyn Detach>,
    seq: u64,
}

impl ListenerHandle {
    /// Remove the listener from its cell.
    ///
    /// Returns `true` if a listener was removed; `false` if it was already
    /// gone or the cell has been dropped.
    pub fn detach(&self) -> bool {
        self.cell.upgrade().is_some_and(|cell| cell.detach(self.seq))
    }

    /// Whether the listener is still registered on a live cell.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.cell
            .upgrade()
            .is_some_and(|cell| cell.is_registered(self.seq))
    }

    /// Turn the handle into a guard that detaches on drop.
    #[must_use]
    pub fn into_subscription(self) -> Subscription {
        Subscription {
            handle: self,
            armed: true,
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("seq", &self.seq)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// RAII guard for a listener.
///
/// Dropping the `Subscription` removes the listener from its cell.
pub struct Subscription {
    handle: ListenerHandle,
    armed: bool,
}

impl Subscription {
    /// Give up the guard and keep the listener registered.
    #[must_use]
    pub fn into_handle(mut self) -> ListenerHandle {
        self.armed = false;
        self.handle.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.armed {
            self.handle.detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
