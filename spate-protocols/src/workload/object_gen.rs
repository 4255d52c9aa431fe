//! Key and value generation
//!
//! One generator owns a key scratch and a single value buffer for its whole
//! lifetime. Keys are formatted as `{prefix}{index}` where the index comes
//! from a per-iterator monotonic cursor or from a distribution; values are a
//! slice of the shared buffer, made unique per request by refreshing one byte
//! of its random region. Nothing allocates on the per-request path.

use std::io::Write as _;

use anyhow::Result;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use spate_common::GaussianNoise;

use crate::configs::{DataSizeConfig, GeneratorConfig};

/// Iterator id for the read-side key cursor.
pub const KEY_GET_ITER: i32 = 0;
/// Iterator id for the write-side key cursor.
pub const KEY_SET_ITER: i32 = 1;
/// Pseudo-iterator: uniform random key selection.
pub const KEY_RANDOM: i32 = -1;
/// Pseudo-iterator: Gaussian key selection.
pub const KEY_GAUSSIAN: i32 = -2;

pub(crate) const KEY_ITERATORS: usize = 2;
pub(crate) const KEY_SCRATCH_SIZE: usize = 250;

/// Slack appended to the value buffer beyond the largest configured size.
const VALUE_BUFFER_TAIL: usize = 16;

/// Byte used for the compressible region of values.
const PATTERN_BYTE: u8 = b'x';

/// One generated (key, value, expiry) triple.
///
/// Both slices point into the generator's reuse buffers, so the object is
/// valid only until the next call on the same generator; the borrow checker
/// enforces exactly that.
#[derive(Debug, Clone, Copy)]
pub struct DataObject<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
    /// Expiry in seconds; 0 means no expiry.
    pub expiry: u32,
}

impl DataObject<'_> {
    pub fn key_len(&self) -> usize {
        self.key.len()
    }

    pub fn value_len(&self) -> usize {
        self.value.len()
    }
}

#[derive(Debug, Clone)]
enum SizeSelector {
    Fixed(u32),
    Range { min: u32, max: u32 },
    Weighted { sizes: Vec<u32>, index: WeightedIndex<u32> },
}

impl SizeSelector {
    fn from_config(config: &DataSizeConfig) -> Result<Self> {
        Ok(match config {
            DataSizeConfig::Fixed { size } => Self::Fixed(*size),
            DataSizeConfig::Range { min, max } => Self::Range { min: *min, max: *max },
            DataSizeConfig::Weighted { list } => {
                let sizes: Vec<u32> = list.iter().map(|w| w.size).collect();
                let index = WeightedIndex::new(list.iter().map(|w| w.weight))?;
                Self::Weighted { sizes, index }
            }
        })
    }
}

/// Keyed iterator and value buffer manager producing [`DataObject`]s.
pub struct ObjectGenerator {
    config: GeneratorConfig,
    size_selector: SizeSelector,
    next_key: [u64; KEY_ITERATORS],
    key_buf: [u8; KEY_SCRATCH_SIZE],
    key_len: usize,
    value_buffer: Vec<u8>,
    random_part_size: usize,
    mutation_pos: usize,
    random: GaussianNoise,
}

impl ObjectGenerator {
    /// Build a generator from a validated configuration.
    ///
    /// The value buffer is allocated and filled here, once: a random head
    /// region sized by the compression ratio, then the constant pattern.
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;

        let mut random = GaussianNoise::from_seed_opt(seed);
        let size_selector = SizeSelector::from_config(&config.data_size)?;

        let buffer_size = config.data_size.max_size() as usize + VALUE_BUFFER_TAIL;
        let random_part_size = if config.random_data {
            let uncompressible = 1.0 - f64::from(config.compression_ratio);
            ((buffer_size as f64) * uncompressible).ceil() as usize
        } else {
            0
        };
        let random_part_size = random_part_size.min(buffer_size);

        let mut value_buffer = vec![PATTERN_BYTE; buffer_size];
        random.source_mut().fill(&mut value_buffer[..random_part_size]);

        Ok(Self {
            config,
            size_selector,
            next_key: [0; KEY_ITERATORS],
            key_buf: [0; KEY_SCRATCH_SIZE],
            key_len: 0,
            value_buffer,
            random_part_size,
            mutation_pos: 0,
            random,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Bytes at the head of the value buffer holding random content.
    pub fn random_region_len(&self) -> usize {
        self.random_part_size
    }

    /// Uniform draw over the inclusive range `[min, max]`.
    pub fn random_range(&mut self, min: u64, max: u64) -> u64 {
        self.random.source_mut().random_range(min, max)
    }

    /// Gaussian draw truncated into `[min, max]`.
    pub fn normal_distribution(&mut self, min: u64, max: u64, stddev: f64, median: f64) -> u64 {
        self.random.gaussian_distribution_range(stddev, median, min, max)
    }

    /// Select the key index for an iterator and advance its cursor.
    fn key_index(&mut self, iter: i32) -> u64 {
        match iter {
            KEY_RANDOM => {
                self.random.source_mut().random_range(self.config.key_min, self.config.key_max)
            }
            KEY_GAUSSIAN => self.random.gaussian_distribution_range(
                self.config.key_stddev,
                self.config.key_median,
                self.config.key_min,
                self.config.key_max,
            ),
            _ => {
                let span = self.config.key_max - self.config.key_min + 1;
                let cursor = &mut self.next_key[iter as usize];
                let index = self.config.key_min + (*cursor % span);
                *cursor += 1;
                index
            }
        }
    }

    fn format_key(&mut self, index: u64) {
        let mut cursor = std::io::Cursor::new(&mut self.key_buf[..]);
        write!(cursor, "{}{}", self.config.key_prefix, index)
            .expect("key scratch sized for prefix + index at validation");
        self.key_len = cursor.position() as usize;
    }

    fn next_value_len(&mut self) -> usize {
        match &self.size_selector {
            SizeSelector::Fixed(size) => *size as usize,
            SizeSelector::Range { min, max } => {
                self.random.source_mut().random_range(u64::from(*min), u64::from(*max)) as usize
            }
            SizeSelector::Weighted { sizes, index } => {
                sizes[index.sample(self.random.source_mut())] as usize
            }
        }
    }

    /// Refresh one byte of the random region; the position cycles so repeated
    /// requests stay unique without touching the rest of the buffer.
    fn mutate_value(&mut self) {
        if self.random_part_size == 0 {
            return;
        }
        let byte = (self.random.source_mut().get_random() & 0xff) as u8;
        self.value_buffer[self.mutation_pos] = byte;
        self.mutation_pos = (self.mutation_pos + 1) % self.random_part_size;
    }

    fn next_expiry(&mut self) -> u32 {
        if self.config.expiry_min == 0 && self.config.expiry_max == 0 {
            return 0;
        }
        self.random
            .source_mut()
            .random_range(u64::from(self.config.expiry_min), u64::from(self.config.expiry_max))
            as u32
    }

    /// Produce the next key into the scratch and pick value length + expiry.
    pub(crate) fn produce(&mut self, iter: i32) -> (usize, u32) {
        let index = self.key_index(iter);
        self.format_key(index);
        let value_len = self.next_value_len();
        self.mutate_value();
        let expiry = self.next_expiry();
        (value_len, expiry)
    }

    pub(crate) fn key_bytes(&self) -> &[u8] {
        &self.key_buf[..self.key_len]
    }

    pub(crate) fn value_bytes(&self, len: usize) -> &[u8] {
        &self.value_buffer[..len]
    }

    pub(crate) fn scratch_mut(&mut self, value_len: usize) -> (&[u8], &mut [u8]) {
        (&self.key_buf[..self.key_len], &mut self.value_buffer[..value_len])
    }

    pub(crate) fn reset_cursors(&mut self) {
        self.next_key = [0; KEY_ITERATORS];
    }

    /// Produce only the next key for an iterator.
    pub fn get_key(&mut self, iter: i32) -> &[u8] {
        let index = self.key_index(iter);
        self.format_key(index);
        &self.key_buf[..self.key_len]
    }

    /// Produce the next object for an iterator.
    pub fn get_object(&mut self, iter: i32) -> DataObject<'_> {
        let (value_len, expiry) = self.produce(iter);
        DataObject {
            key: &self.key_buf[..self.key_len],
            value: &self.value_buffer[..value_len],
            expiry,
        }
    }
}

impl Clone for ObjectGenerator {
    /// Clones copy configuration, cursors and buffer contents but draw from
    /// an independent random stream and own their own value buffer.
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            size_selector: self.size_selector.clone(),
            next_key: self.next_key,
            key_buf: self.key_buf,
            key_len: self.key_len,
            value_buffer: self.value_buffer.clone(),
            random_part_size: self.random_part_size,
            mutation_pos: self.mutation_pos,
            random: GaussianNoise::from_entropy(),
        }
    }
}
