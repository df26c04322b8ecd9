pub const DEFAULT_CAPACITY: usize = 211;

const HASH_BASE: u32 = 131;
const HASH_MASK: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolTableError {
    #[error("Symbol table is full ({capacity} slots), cannot insert '{key}'")]
    Full { key: String, capacity: usize },
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Empty,
    Occupied { key: String, value: T },
    Tombstone,
}

/// Fixed-capacity open-addressing map keyed by strings.
///
/// Collisions are resolved by linear probing. The table never grows: once every
/// slot holds a live entry, `insert` of a new key fails with
/// [`SymbolTableError::Full`]. Removed entries leave a tombstone so that probe
/// sequences running through them stay intact.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Empty);
        SymbolTable { slots, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Home slot of `key`, `None` for a zero-capacity table.
    pub fn home_slot(&self, key: &str) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        Some(hash(key) as usize % self.slots.len())
    }

    /// Inserts `key` unless it is already present.
    ///
    /// Returns the slot holding `key`. An existing entry keeps its original
    /// value; the `value` passed in is dropped.
    pub fn insert(&mut self, key: &str, value: T) -> Result<usize, SymbolTableError> {
        let capacity = self.capacity();
        let Some(home) = self.home_slot(key) else {
            return Err(self.full(key));
        };

        let mut reusable = None;
        for step in 0..capacity {
            let index = (home + step) % capacity;
            match &self.slots[index] {
                Slot::Occupied { key: existing, .. } if existing == key => return Ok(index),
                Slot::Occupied { .. } => {}
                Slot::Tombstone => {
                    reusable.get_or_insert(index);
                }
                Slot::Empty => {
                    reusable.get_or_insert(index);
                    break;
                }
            }
        }

        let Some(index) = reusable else {
            return Err(self.full(key));
        };
        self.slots[index] = Slot::Occupied {
            key: key.to_string(),
            value,
        };
        self.len += 1;
        Ok(index)
    }

    pub fn find(&self, key: &str) -> Option<usize> {
        let capacity = self.capacity();
        let home = self.home_slot(key)?;

        for step in 0..capacity {
            let index = (home + step) % capacity;
            match &self.slots[index] {
                Slot::Occupied { key: existing, .. } if existing == key => return Some(index),
                Slot::Empty => return None,
                _ => {}
            }
        }
        None
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        match self.slots.get(slot)? {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        match self.slots.get_mut(slot)? {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&T> {
        self.find(key).and_then(|slot| self.get(slot))
    }

    /// Tombstones the slot holding `key` and hands back its value.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let slot = self.find(key)?;
        match std::mem::replace(&mut self.slots[slot], Slot::Tombstone) {
            Slot::Occupied { value, .. } => {
                self.len -= 1;
                Some(value)
            }
            other => {
                self.slots[slot] = other;
                None
            }
        }
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { key, value } => Some((index, key.as_str(), value)),
                _ => None,
            })
    }

    fn full(&self, key: &str) -> SymbolTableError {
        SymbolTableError::Full {
            key: key.to_string(),
            capacity: self.capacity(),
        }
    }
}

pub fn hash(key: &str) -> u32 {
    key.bytes()
        .fold(0u32, |h, byte| h.wrapping_mul(HASH_BASE).wrapping_add(byte as u32))
        & HASH_MASK
}
