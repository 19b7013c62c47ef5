use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Slot index with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: u32,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Packs the id into a single integer, generation in the high half.
    pub fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self::new(bits as u32, (bits >> 32) as u32)
    }
}

/// Typed handle into an [`Arena<T>`].
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Handle<T> {
    id: GenerationalId,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn from_raw(id: GenerationalId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn raw(&self) -> GenerationalId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.id.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.id.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.id.index, self.id.generation)
    }
}

/// Generational arena that hands out stable handles while preventing use-after-free.
pub struct Arena<T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, item: T) -> Handle<T> {
        self.insert_with(|_| item)
    }

    /// Inserts a value built from its own handle, for records that store their id.
    pub fn insert_with(&mut self, build: impl FnOnce(Handle<T>) -> T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free_list.pop_front() {
            let handle = Handle::from_raw(GenerationalId::new(
                index,
                self.generations[index as usize],
            ));
            self.items[index as usize] = Some(build(handle));
            return handle;
        }

        let index = self.items.len() as u32;
        let handle = Handle::from_raw(GenerationalId::new(index, 0));
        self.items.push(Some(build(handle)));
        self.generations.push(0);
        handle
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if self.is_valid(handle) {
            self.items.get(handle.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if self.is_valid(handle) {
            self.items.get_mut(handle.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn get2_mut(&mut self, a: Handle<T>, b: Handle<T>) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() {
            return None;
        }

        if !self.is_valid(a) || !self.is_valid(b) {
            return None;
        }

        let (first, second, flipped) = if a.index() < b.index() {
            (a, b, false)
        } else {
            (b, a, true)
        };

        let second_index = second.index();
        if second_index >= self.items.len() {
            return None;
        }

        let (left, right) = self.items.split_at_mut(second_index);
        let first_slot = left
            .get_mut(first.index())
            .and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }
        let slot = self.items.get_mut(handle.index())?;
        let item = slot.take()?;
        let index = handle.index();
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_list.push_back(index as u32);
        self.len -= 1;
        Some(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (self.handle_at(index), item))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> + '_ {
        let generations = &self.generations;
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut().map(|item| {
                    (
                        Handle::from_raw(GenerationalId::new(index as u32, generations[index])),
                        item,
                    )
                })
            })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn handle_at(&self, index: usize) -> Handle<T> {
        Handle::from_raw(GenerationalId::new(index as u32, self.generations[index]))
    }

    fn is_valid(&self, handle: Handle<T>) -> bool {
        self.generations
            .get(handle.index())
            .copied()
            .map(|gen| gen == handle.generation())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_are_rejected_after_reuse() {
        let mut arena = Arena::new();
        let first = arena.insert("first");
        assert_eq!(arena.remove(first), Some("first"));

        let second = arena.insert("second");
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"second"));
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn get2_mut_returns_requested_order() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        let (rb, ra) = arena.get2_mut(b, a).expect("distinct live handles");
        assert_eq!((*ra, *rb), (1, 2));
        assert!(arena.get2_mut(a, a).is_none());
    }

    #[test]
    fn bits_round_trip() {
        let id = GenerationalId::new(7, 3);
        assert_eq!(GenerationalId::from_bits(id.to_bits()), id);
    }
}
