//! # Session Arena
//!
//! Generational slot storage for codec sessions owned by the worker thread.
//!
//! Callers only ever see a [`SessionHandle`]. Every removal bumps the slot's
//! generation, so a handle that outlived its session can never reach the
//! session that later reuses the slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generation-checked reference to a session on the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena with a free list.
pub struct SessionArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for SessionArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SessionArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` and returns its handle.
    pub fn insert(&mut self, value: T) -> SessionHandle {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return SessionHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SessionHandle {
            index,
            generation: 0,
        }
    }

    fn slot(&self, handle: SessionHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Removes the session, invalidating every copy of `handle`.
    pub fn remove(&mut self, handle: SessionHandle) -> Option<T> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let value = slot.value.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every session, invalidating all outstanding handles.
    pub fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                drained.push(value);
            }
        }
        self.len = 0;
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena = SessionArena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");

        assert_ne!(a, b);
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_stale_handle_rejected_after_reuse() {
        let mut arena = SessionArena::new();
        let old = arena.insert(1);
        assert_eq!(arena.remove(old), Some(1));

        let new = arena.insert(2);
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);

        assert!(arena.get(old).is_none());
        assert!(arena.get_mut(old).is_none());
        assert!(arena.remove(old).is_none());
        assert_eq!(arena.get(new), Some(&2));
    }

    #[test]
    fn test_double_remove() {
        let mut arena = SessionArena::new();
        let handle = arena.insert(());
        assert!(arena.remove(handle).is_some());
        assert!(arena.remove(handle).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut arena: SessionArena<u8> = SessionArena::new();
        arena.insert(5);
        let foreign = SessionHandle {
            index: 40,
            generation: 0,
        };
        assert!(arena.get(foreign).is_none());
        assert!(arena.remove(foreign).is_none());
    }

    #[test]
    fn test_drain_empties_arena() {
        let mut arena = SessionArena::new();
        let first = arena.insert(1);
        arena.insert(2);
        arena.insert(3);
        arena.remove(first);

        let mut drained = arena.drain();
        drained.sort();
        assert_eq!(drained, vec![2, 3]);
        assert!(arena.is_empty());
        assert!(arena.get(first).is_none());
    }

    #[test]
    fn test_handle_display() {
        let handle = SessionHandle {
            index: 3,
            generation: 7,
        };
        assert_eq!(handle.to_string(), "3:7");
    }
}
