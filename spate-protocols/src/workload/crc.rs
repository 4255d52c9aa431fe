//! CRC-stamped values for verification workloads
//!
//! Each produced value reserves its first four bytes for a CRC32 computed
//! over the rest of the value and the key, stored big-endian. A verification
//! pass can later fetch the value and recompute the checksum against the key
//! it asked for.

use anyhow::Result;
use crc32fast::Hasher;

use crate::configs::GeneratorConfig;
use crate::workload::object_gen::{DataObject, ObjectGenerator};

/// Bytes reserved at the head of every stamped value.
pub const CRC_SIZE: usize = 4;

/// CRC32 over `buffer` followed by `key`.
pub fn checksum(buffer: &[u8], key: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(buffer);
    hasher.update(key);
    hasher.finalize()
}

/// Generator whose values carry an embedded checksum.
pub struct CrcObjectGenerator {
    inner: ObjectGenerator,
    actual_value_size: usize,
}

impl CrcObjectGenerator {
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> Result<Self> {
        if config.data_size.min_size() as usize <= CRC_SIZE {
            anyhow::bail!(
                "stamped values need more than {CRC_SIZE} bytes; smallest configured size is {}",
                config.data_size.min_size()
            );
        }
        Ok(Self { inner: ObjectGenerator::new(config, seed)?, actual_value_size: 0 })
    }

    /// Produce the next object with its checksum stamped in.
    pub fn get_object(&mut self, iter: i32) -> DataObject<'_> {
        let (value_len, expiry) = self.inner.produce(iter);
        self.actual_value_size = value_len - CRC_SIZE;

        {
            let (key, value) = self.inner.scratch_mut(value_len);
            let crc = checksum(&value[CRC_SIZE..], key);
            value[..CRC_SIZE].copy_from_slice(&crc.to_be_bytes());
        }

        DataObject {
            key: self.inner.key_bytes(),
            value: self.inner.value_bytes(value_len),
            expiry,
        }
    }

    pub fn get_key(&mut self, iter: i32) -> &[u8] {
        self.inner.get_key(iter)
    }

    /// Payload length of the last value, excluding the checksum.
    pub fn get_actual_value_size(&self) -> usize {
        self.actual_value_size
    }

    /// Rewind the monotonic iterator cursors so a verification pass replays
    /// the same key sequence.
    pub fn reset_next_key(&mut self) {
        self.inner.reset_cursors();
    }
}

impl Clone for CrcObjectGenerator {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), actual_value_size: self.actual_value_size }
    }
}
