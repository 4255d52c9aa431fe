//! Common utilities for spate
//!
//! This crate provides shared utilities used by the protocol and workload
//! crates:
//! - `buffer`: streaming byte-queue contract between the engine and the transport
//! - `random`: uniform and Gaussian random sources
//! - `seed`: SHA-256 seed derivation for reproducible, disjoint random streams

pub mod buffer;
pub mod random;
pub mod seed;

pub use buffer::{ByteBuffer, MemBuffer};
pub use random::{GaussianNoise, RandomSource};
pub use seed::derive_seed;
