//! Пул управляющих блоков — "allocate fixed-size block"
//! Control block pool — "allocate fixed-size block"
//!
//! Вся память резервируется при создании, поэтому `allocate`/`release`
//! никогда не обращаются к аллокатору и не двигают уже выданные блоки.
//! All memory is reserved up front, so `allocate`/`release` never call the
//! allocator and never move blocks that are already handed out.
//!
//! Каждый слот несёт поколение: освобождение увеличивает его, и старые ключи
//! перестают совпадать (никакого use-after-free через висячий handle).
//! Every slot carries a generation: releasing bumps it, so stale keys stop
//! matching (no use-after-free through a dangling handle).

use alloc::vec::Vec;

use crate::{Error, Result};

/// Ключ блока: индекс слота + поколение / Block key: slot index + generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index:      u32,
    generation: u32,
}

impl SlotKey {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

struct Slot<T> {
    generation: u32,
    value:      Option<T>,
}

pub struct SlotPool<T> {
    slots:    Vec<Slot<T>>,
    free:     Vec<u32>,
    capacity: usize,
    live:     usize,
}

impl<T> SlotPool<T> {
    /// Зарезервировать место под `capacity` блоков.
    /// Reserve room for `capacity` blocks.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|_| Error::OutOfMemory)?;
        let mut free = Vec::new();
        free.try_reserve_exact(capacity).map_err(|_| Error::OutOfMemory)?;
        Ok(Self { slots, free, capacity, live: 0 })
    }

    /// Занять блок. `OutOfMemory`, когда все `capacity` слотов заняты.
    /// Take a block. `OutOfMemory` once all `capacity` slots are taken.
    pub fn allocate(&mut self, value: T) -> Result<SlotKey> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot { generation: 0, value: None });
                (self.slots.len() - 1) as u32
            }
            None => return Err(Error::OutOfMemory),
        };

        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        self.live += 1;
        Ok(SlotKey { index, generation: slot.generation })
    }

    /// Вернуть блок в пул. `None`, если ключ уже устарел.
    /// Hand a block back. `None` if the key is already stale.
    pub fn release(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index())?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;
        Some(value)
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots
            .get(key.index())
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.index())
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Выдавал ли этот пул когда-либо слот с таким индексом.
    /// Whether this pool ever handed out a slot with this index.
    pub fn issued(&self, key: SlotKey) -> bool {
        key.index() < self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let key = SlotKey { index: index as u32, generation: slot.generation };
            slot.value.as_ref().map(|value| (key, value))
        })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
