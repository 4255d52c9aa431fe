//! Statistical properties of the workload generators
//!
//! Seeded draws keep these tests deterministic while still checking the
//! empirical shape of each distribution over large sample counts.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;
use spate_protocols::configs::{DataSizeConfig, GeneratorConfig, SizeWeight};
use spate_protocols::workload::{
    ObjectGenerator, KEY_GAUSSIAN, KEY_RANDOM, KEY_SET_ITER,
};

fn base_config(key_min: u64, key_max: u64) -> GeneratorConfig {
    GeneratorConfig {
        key_prefix: "key-".into(),
        key_min,
        key_max,
        key_stddev: 0.0,
        key_median: 0.0,
        data_size: DataSizeConfig::Fixed { size: 32 },
        random_data: false,
        compression_ratio: 0.0,
        expiry_min: 0,
        expiry_max: 0,
    }
}

fn key_index(generator: &mut ObjectGenerator, iter: i32) -> u64 {
    let key = generator.get_key(iter);
    let text = std::str::from_utf8(key).unwrap();
    text.strip_prefix("key-").unwrap().parse().unwrap()
}

#[test]
fn sequential_iterator_follows_modular_law() {
    let mut generator = base_config(100, 109).to_generator(Some(1)).unwrap();
    for k in 0..50u64 {
        let expected = 100 + k % 10;
        assert_eq!(key_index(&mut generator, KEY_SET_ITER), expected, "call {k}");
    }
}

#[test]
fn uniform_iterator_histogram_is_flat() {
    const DRAWS: usize = 2_000_000;
    const KEYS: u64 = 10_000;
    const BUCKETS: usize = 10;

    let mut generator = base_config(0, KEYS - 1).to_generator(Some(42)).unwrap();
    let mut histogram = [0usize; BUCKETS];
    for _ in 0..DRAWS {
        let index = key_index(&mut generator, KEY_RANDOM);
        assert!(index < KEYS);
        histogram[(index / (KEYS / BUCKETS as u64)) as usize] += 1;
    }

    let expected = DRAWS as f64 / BUCKETS as f64;
    for (bucket, &count) in histogram.iter().enumerate() {
        let relative_error = (count as f64 - expected).abs() / expected;
        assert!(
            relative_error < 0.01,
            "bucket {bucket}: count {count}, expected {expected}, error {relative_error:.4}"
        );
    }
}

#[test]
fn gaussian_iterator_clamps_and_centers() {
    const DRAWS: usize = 100_000;
    let stddev = 100.0;
    let median = 500.0;

    let mut config = base_config(0, 1000);
    config.key_stddev = stddev;
    config.key_median = median;
    let mut generator = config.to_generator(Some(42)).unwrap();

    let mut sum = 0.0;
    for _ in 0..DRAWS {
        let index = key_index(&mut generator, KEY_GAUSSIAN);
        assert!(index <= 1000, "sample {index} escaped the range");
        sum += index as f64;
    }

    let mean = sum / DRAWS as f64;
    assert!(
        (mean - median).abs() < 0.05 * stddev,
        "sample mean {mean} too far from median {median}"
    );
}

#[test]
fn weighted_sizes_match_configured_weights() {
    const DRAWS: usize = 2_000_000;
    let weights = [(64u32, 1u32), (256, 2), (1024, 7)];
    let total_weight: u32 = weights.iter().map(|&(_, w)| w).sum();

    let mut config = base_config(0, 10);
    config.data_size = DataSizeConfig::Weighted {
        list: weights.iter().map(|&(size, weight)| SizeWeight { size, weight }).collect(),
    };
    let mut generator = config.to_generator(Some(42)).unwrap();

    let mut counts = [0usize; 3];
    for _ in 0..DRAWS {
        let len = generator.get_object(KEY_SET_ITER).value_len();
        let slot = weights.iter().position(|&(size, _)| size as usize == len).unwrap();
        counts[slot] += 1;
    }

    for (slot, &(size, weight)) in weights.iter().enumerate() {
        let expected = DRAWS as f64 * f64::from(weight) / f64::from(total_weight);
        let relative_error = (counts[slot] as f64 - expected).abs() / expected;
        assert!(
            relative_error < 0.01,
            "size {size}: count {}, expected {expected}, error {relative_error:.4}",
            counts[slot]
        );
    }
}

#[test]
fn compression_ratio_shapes_deflate_size() {
    const VALUE_SIZE: usize = 1 << 20;
    let ratio = 0.5f64;

    let mut config = base_config(0, 10);
    config.data_size = DataSizeConfig::Fixed { size: VALUE_SIZE as u32 };
    config.random_data = true;
    config.compression_ratio = ratio as f32;
    let mut generator = config.to_generator(Some(42)).unwrap();

    let value = generator.get_object(KEY_SET_ITER).value.to_vec();
    assert_eq!(value.len(), VALUE_SIZE);

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&value).unwrap();
    let compressed = encoder.finish().unwrap();

    // the random region stays incompressible, the repeated-byte region
    // compresses to almost nothing
    let expected = (1.0 - ratio) * VALUE_SIZE as f64;
    let error = (compressed.len() as f64 - expected).abs() / VALUE_SIZE as f64;
    assert!(
        error < 0.05,
        "compressed to {} bytes, expected about {expected} (error {error:.4})",
        compressed.len()
    );
}

#[test]
fn expiry_samples_cover_the_range() {
    let mut config = base_config(0, 10);
    config.expiry_min = 10;
    config.expiry_max = 13;
    let mut generator = config.to_generator(Some(42)).unwrap();

    let mut seen = [false; 4];
    for _ in 0..10_000 {
        let expiry = generator.get_object(KEY_SET_ITER).expiry;
        assert!((10..=13).contains(&expiry));
        seen[(expiry - 10) as usize] = true;
    }
    assert!(seen.iter().all(|&s| s), "some expiry values never sampled: {seen:?}");
}
