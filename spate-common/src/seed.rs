//! Seed derivation for reproducible randomness
//!
//! A single master seed (typically from a CLI `--seed` flag) is stretched into
//! independent per-component and per-thread seeds through SHA-256. Derived
//! seeds are deterministic, collision-resistant between components, and
//! uniformly distributed over the u64 range.

use sha2::{Digest, Sha256};

/// Derive a component-specific seed from a master seed.
///
/// The same `(master_seed, component)` pair always yields the same seed;
/// different components yield independent seeds.
pub fn derive_seed(master_seed: u64, component: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_be_bytes());
    hasher.update(component.as_bytes());
    let digest = hasher.finalize();

    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

/// Standard component names for seed derivation.
pub mod components {
    pub const OBJECT_GENERATOR: &str = "object_generator";
    pub const VALUE_BUFFER: &str = "value_buffer";
    pub const IMPORT_PICK: &str = "import_pick";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(derive_seed(42, "component"), derive_seed(42, "component"));
    }

    #[test]
    fn test_components_independent() {
        assert_ne!(derive_seed(42, "a"), derive_seed(42, "b"));
    }

    #[test]
    fn test_masters_independent() {
        assert_ne!(derive_seed(1, "c"), derive_seed(2, "c"));
    }

    #[test]
    fn test_distribution_uses_high_bits() {
        let seeds: Vec<u64> = (0..100).map(|i| derive_seed(7, &format!("c{i}"))).collect();
        let high = seeds.iter().filter(|&&s| s > u64::MAX / 2).count();
        assert!(high > 30, "derived seeds poorly distributed: {high} high-bit seeds");
    }
}
