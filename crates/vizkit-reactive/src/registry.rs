#![forbid(unsafe_code)]

//! Priority-ordered listener storage for a single cell.
//!
//! # Ordering
//!
//! Slots are kept sorted by [`SlotKey`]: [`Tier`] first, then priority
//! descending, then registration sequence ascending. Sequence numbers are
//! never reused, so every key is unique for the lifetime of the registry.
//!
//! # Dispatch cursor
//!
//! A dispatch never holds an index into the slot vector. After each
//! invocation it asks for the first slot whose key is greater than the last
//! visited key. Removals therefore take effect immediately without
//! tombstones, and insertions land where they belong.
//!
//! Slots registered after a dispatch started (sequence at or above the
//! dispatch watermark) are skipped while they share the priority slot that
//! is currently being visited; they are picked up once the cursor moves to a
//! strictly lower slot.

use std::cmp::Reverse;
use std::rc::Rc;

use crate::error::ListenerResult;

/// Dispatch tier of a listener.
///
/// Every [`Tier::System`] listener runs before any [`Tier::User`] listener,
/// whatever the numeric priorities are. The system tier is reserved for
/// bookkeeping that must observe every value (derived state, matrix
/// composition) and is left alone by user-level listener sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    System,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SlotKey {
    tier: Tier,
    priority: Reverse<i32>,
    seq: u64,
}

impl SlotKey {
    #[inline]
    fn same_slot(&self, other: &SlotKey) -> bool {
        self.tier == other.tier && self.priority == other.priority
    }

    #[inline]
    pub(crate) fn priority(&self) -> i32 {
        self.priority.0
    }

    #[inline]
    pub(crate) fn tier(&self) -> Tier {
        self.tier
    }
}

pub(crate) type Callback<T> = Rc<dyn Fn(&T) -> ListenerResult>;

struct Slot<T> {
    key: SlotKey,
    callback: Callback<T>,
}

pub(crate) struct Registry<T> {
    slots: Vec<Slot<T>>,
    next_seq: u64,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_seq: 0,
        }
    }

    /// Insert a callback at its priority slot and return its sequence id.
    pub(crate) fn insert(&mut self, tier: Tier, priority: i32, callback: Callback<T>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = SlotKey {
            tier,
            priority: Reverse(priority),
            seq,
        };
        let at = self.slots.partition_point(|slot| slot.key < key);
        self.slots.insert(at, Slot { key, callback });
        seq
    }

    /// Remove the slot with sequence `seq`. Returns `false` if it is gone.
    pub(crate) fn remove(&mut self, seq: u64) -> bool {
        match self.slots.iter().position(|slot| slot.key.seq == seq) {
            Some(at) => {
                self.slots.remove(at);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, seq: u64) -> bool {
        self.slots.iter().any(|slot| slot.key.seq == seq)
    }

    /// Drop every slot of `tier`. Returns how many were removed.
    pub(crate) fn clear_tier(&mut self, tier: Tier) -> usize {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.key.tier != tier);
        before - self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len_tier(&self, tier: Tier) -> usize {
        self.slots.iter().filter(|slot| slot.key.tier == tier).count()
    }

    /// Sequence number the next registration will receive.
    pub(crate) fn watermark(&self) -> u64 {
        self.next_seq
    }

    /// Next slot to invoke after `cursor` for a dispatch started at
    /// `watermark`.
    pub(crate) fn next_after(
        &self,
        cursor: Option<&SlotKey>,
        watermark: u64,
    ) -> Option<(SlotKey, Callback<T>)> {
        let start = match cursor {
            Some(visited) => self.slots.partition_point(|slot| slot.key <= *visited),
            None => 0,
        };
        self.slots[start..]
            .iter()
            .find(|slot| {
                slot.key.seq < watermark || cursor.is_none_or(|visited| !slot.key.same_slot(visited))
            })
            .map(|slot| (slot.key, Rc::clone(&slot.callback)))
    }
}
