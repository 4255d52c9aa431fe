//! Accumulator for one logical server reply
//!
//! A reply may span several wire frames (memcached quiet multi-get, multiple
//! `VALUE` sections). The parser folds everything into one
//! `ProtocolResponse`; the caller reads it out after a complete parse and
//! clears it before the next one.

use std::collections::VecDeque;

/// One retained (key, value) payload.
///
/// The key is present only for protocols and opcodes that echo it back
/// (memcached GETK/GETKQ); value-only payloads carry `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

/// Status, hit counters, retained payloads and latencies for one reply.
#[derive(Debug, Default)]
pub struct ProtocolResponse {
    status: Option<String>,
    error: bool,
    hits: u32,
    total_len: usize,
    values: VecDeque<KeyValue>,
    latencies: VecDeque<u64>,
}

impl ProtocolResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release everything and reset all counters. Idempotent.
    pub fn clear(&mut self) {
        self.status = None;
        self.error = false;
        self.hits = 0;
        self.total_len = 0;
        self.values.clear();
        self.latencies.clear();
    }

    /// Replace the status line, dropping any previous one.
    pub fn set_status(&mut self, status: String) {
        self.status = Some(status);
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_error(&mut self, error: bool) {
        self.error = error;
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Enqueue an owned payload pair.
    pub fn set_value(&mut self, value: Vec<u8>, key: Option<Vec<u8>>) {
        self.values.push_back(KeyValue { key, value });
    }

    /// Dequeue the oldest payload pair; the caller takes ownership.
    pub fn get_value(&mut self) -> Option<KeyValue> {
        self.values.pop_front()
    }

    pub fn values_count(&self) -> usize {
        self.values.len()
    }

    pub fn set_latency(&mut self, latency: u64) {
        self.latencies.push_back(latency);
    }

    pub fn get_latency(&mut self) -> Option<u64> {
        self.latencies.pop_front()
    }

    pub fn latencies_count(&self) -> usize {
        self.latencies.len()
    }

    pub fn incr_hits(&mut self) {
        self.hits += 1;
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn set_total_len(&mut self, total_len: usize) {
        self.total_len = total_len;
    }

    /// Exact number of bytes this reply consumed from the read buffer.
    pub fn total_len(&self) -> usize {
        self.total_len
    }
}
