//! Uniform and Gaussian random sources for workload generation
//!
//! `RandomSource` is a thin wrapper over `SmallRng` that standardizes how the
//! workload generators obtain and seed their randomness: explicitly from a
//! seed, from OS entropy, or from a (seed, thread) pair so that concurrent
//! generators draw from disjoint streams.
//!
//! `GaussianNoise` layers a Marsaglia-polar normal sampler on top. The polar
//! method produces values in pairs, so the second value of each pair is cached
//! and returned by the next call.

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::seed::derive_seed;

/// Uniform 64-bit random source.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: SmallRng,
}

impl RandomSource {
    /// Create a source seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self { rng: SmallRng::from_os_rng() }
    }

    /// Create a deterministic source from an explicit seed.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }

    /// Create a source for one worker thread.
    ///
    /// Streams for distinct `thread_index` values are disjoint even though
    /// they share the master seed.
    pub fn for_thread(seed: u64, thread_index: u64) -> Self {
        let component = format!("thread-{thread_index}");
        Self::seeded(derive_seed(seed, &component))
    }

    /// Create a source from an optional seed, falling back to OS entropy.
    pub fn from_seed_opt(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }

    /// Uniform draw over the full 64-bit range.
    pub fn get_random(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform draw over the inclusive range `[min, max]`.
    pub fn random_range(&mut self, min: u64, max: u64) -> u64 {
        self.rng.random_range(min..=max)
    }

    /// Fill a buffer with random bytes.
    pub fn fill(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }
}

// Lets the source plug into any rand API (weighted index sampling, ranges).
impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }
}

/// Gaussian sampler with spare-value caching over a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    source: RandomSource,
    has_spare: bool,
    spare: f64,
}

impl GaussianNoise {
    pub fn new(source: RandomSource) -> Self {
        Self { source, has_spare: false, spare: 0.0 }
    }

    pub fn from_entropy() -> Self {
        Self::new(RandomSource::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(RandomSource::seeded(seed))
    }

    pub fn from_seed_opt(seed: Option<u64>) -> Self {
        Self::new(RandomSource::from_seed_opt(seed))
    }

    /// The underlying uniform source.
    pub fn source_mut(&mut self) -> &mut RandomSource {
        &mut self.source
    }

    /// One zero-mean normal sample with the given standard deviation,
    /// using the Marsaglia polar method.
    fn gaussian(&mut self, stddev: f64) -> f64 {
        if self.has_spare {
            self.has_spare = false;
            return self.spare * stddev;
        }

        let (u, v, s) = loop {
            let u = self.source.rng.random::<f64>() * 2.0 - 1.0;
            let v = self.source.rng.random::<f64>() * 2.0 - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                break (u, v, s);
            }
        };

        let mul = (-2.0 * s.ln() / s).sqrt();
        self.spare = v * mul;
        self.has_spare = true;
        u * mul * stddev
    }

    /// Gaussian draw constrained to the inclusive range `[min, max]`.
    ///
    /// Out-of-range samples are redrawn and in-range samples are truncated to
    /// an integer, so no probability mass accumulates on the boundaries.
    /// A zero `stddev` defaults to one sixth of the range; a zero `median`
    /// defaults to the range midpoint.
    pub fn gaussian_distribution_range(
        &mut self,
        stddev: f64,
        median: f64,
        min: u64,
        max: u64,
    ) -> u64 {
        if min == max {
            return min;
        }
        let width = (max - min) as f64;
        let stddev = if stddev == 0.0 { width / 6.0 } else { stddev };
        let median = if median == 0.0 { min as f64 + width / 2.0 } else { median };

        loop {
            let sample = (median + self.gaussian(stddev)).trunc();
            if sample >= min as f64 && sample <= max as f64 {
                return sample as u64;
            }
        }
    }
}
