//! Workload generator configuration
//!
//! Deserializable configuration for the object generators. Hosts load these
//! from their config files, call `validate()` during their configuration
//! phase, and then build generators with an optional master seed.

use serde::{Deserialize, Serialize};

use crate::workload::crc::CrcObjectGenerator;
use crate::workload::object_gen::{ObjectGenerator, KEY_SCRATCH_SIZE};

/// Maximum decimal digits a u64 key index can add to the prefix.
const KEY_INDEX_DIGITS: usize = 20;

/// Value size selection policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum DataSizeConfig {
    /// Every value has the same size
    Fixed { size: u32 },
    /// Sizes drawn uniformly from an inclusive range
    Range { min: u32, max: u32 },
    /// Sizes drawn from a discrete weighted distribution
    Weighted { list: Vec<SizeWeight> },
}

/// One entry of a weighted size list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SizeWeight {
    pub size: u32,
    pub weight: u32,
}

impl DataSizeConfig {
    /// Largest size this policy can produce.
    pub fn max_size(&self) -> u32 {
        match self {
            Self::Fixed { size } => *size,
            Self::Range { max, .. } => *max,
            Self::Weighted { list } => list.iter().map(|w| w.size).max().unwrap_or(0),
        }
    }

    /// Smallest size this policy can produce.
    pub fn min_size(&self) -> u32 {
        match self {
            Self::Fixed { size } => *size,
            Self::Range { min, .. } => *min,
            Self::Weighted { list } => list.iter().map(|w| w.size).min().unwrap_or(0),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Fixed { size } => {
                if *size == 0 {
                    anyhow::bail!("fixed value size must be > 0");
                }
            }
            Self::Range { min, max } => {
                if *min == 0 {
                    anyhow::bail!("value size range min must be > 0");
                }
                if min > max {
                    anyhow::bail!("value size range min ({min}) must be <= max ({max})");
                }
            }
            Self::Weighted { list } => {
                if list.is_empty() {
                    anyhow::bail!("weighted size list must not be empty");
                }
                for entry in list {
                    if entry.size == 0 {
                        anyhow::bail!("weighted size list entries must have size > 0");
                    }
                    if entry.weight == 0 {
                        anyhow::bail!("weighted size list entries must have weight > 0");
                    }
                }
            }
        }
        Ok(())
    }
}

/// Full object generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Prefix prepended to every generated key index
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Inclusive key index range
    #[serde(default)]
    pub key_min: u64,
    pub key_max: u64,
    /// Standard deviation for Gaussian key selection (0 = one sixth of range)
    #[serde(default)]
    pub key_stddev: f64,
    /// Median for Gaussian key selection (0 = range midpoint)
    #[serde(default)]
    pub key_median: f64,
    pub data_size: DataSizeConfig,
    /// Fill values with random content instead of a constant pattern
    #[serde(default)]
    pub random_data: bool,
    /// Fraction of each value that stays compressible when `random_data` is on
    #[serde(default)]
    pub compression_ratio: f32,
    /// Inclusive expiry range in seconds; both 0 means no expiry
    #[serde(default)]
    pub expiry_min: u32,
    #[serde(default)]
    pub expiry_max: u32,
}

fn default_key_prefix() -> String {
    "key-".to_string()
}

impl GeneratorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.key_min > self.key_max {
            anyhow::bail!("key_min ({}) must be <= key_max ({})", self.key_min, self.key_max);
        }
        if self.key_prefix.len() + KEY_INDEX_DIGITS > KEY_SCRATCH_SIZE {
            anyhow::bail!(
                "key_prefix too long: {} bytes leaves no room for the index",
                self.key_prefix.len()
            );
        }
        if self.key_stddev < 0.0 {
            anyhow::bail!("key_stddev must be >= 0");
        }
        if !(0.0..1.0).contains(&self.compression_ratio) {
            anyhow::bail!(
                "compression_ratio ({}) must be in [0.0, 1.0)",
                self.compression_ratio
            );
        }
        if self.expiry_min > self.expiry_max {
            anyhow::bail!(
                "expiry_min ({}) must be <= expiry_max ({})",
                self.expiry_min,
                self.expiry_max
            );
        }
        self.data_size.validate()
    }

    /// Build an [`ObjectGenerator`] from this configuration.
    pub fn to_generator(&self, seed: Option<u64>) -> anyhow::Result<ObjectGenerator> {
        ObjectGenerator::new(self.clone(), seed)
    }

    /// Build a [`CrcObjectGenerator`] from this configuration.
    pub fn to_crc_generator(&self, seed: Option<u64>) -> anyhow::Result<CrcObjectGenerator> {
        CrcObjectGenerator::new(self.clone(), seed)
    }
}
