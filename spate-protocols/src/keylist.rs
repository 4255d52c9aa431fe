//! Container used to assemble multi-get key batches
//!
//! Keys are copied into a shared byte arena and addressed by (offset, length)
//! so the arena can grow without invalidating earlier keys. The index table
//! capacity is fixed at construction; the arena doubles when a key would
//! overflow it.

/// Append-only list of borrowed-copy keys with a fixed entry capacity.
#[derive(Debug, Clone)]
pub struct Keylist {
    entries: Vec<(usize, usize)>,
    max_keys: usize,
    buffer: Vec<u8>,
}

/// Initial arena bytes reserved per key slot.
const BYTES_PER_KEY: usize = 256;

impl Keylist {
    pub fn new(max_keys: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_keys),
            max_keys,
            buffer: Vec::with_capacity(BYTES_PER_KEY * max_keys),
        }
    }

    /// Copy a key into the list. Returns `false` when the entry table is
    /// full; the caller decides whether to drop the key or flush the batch.
    pub fn add_key(&mut self, key: &[u8]) -> bool {
        if self.entries.len() >= self.max_keys {
            return false;
        }

        if self.buffer.len() + key.len() + 1 > self.buffer.capacity() {
            let mut target = self.buffer.capacity().max(1);
            while self.buffer.len() + key.len() + 1 > target {
                target *= 2;
            }
            self.buffer.reserve(target - self.buffer.len());
        }

        let offset = self.buffer.len();
        self.buffer.extend_from_slice(key);
        self.buffer.push(0);
        self.entries.push((offset, key.len()));
        true
    }

    /// The i-th key, or `None` when out of range.
    pub fn get_key(&self, index: usize) -> Option<&[u8]> {
        let (offset, len) = *self.entries.get(index)?;
        Some(&self.buffer[offset..offset + len])
    }

    pub fn keys_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|&(offset, len)| &self.buffer[offset..offset + len])
    }

    /// Reset counts and the write position without releasing storage.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.buffer.clear();
    }
}
