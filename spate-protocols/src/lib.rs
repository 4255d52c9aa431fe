//! Spate protocol implementations
//!
//! This crate provides the protocol engine and workload generator of a
//! load-generation client for key-value stores. The engine frames requests
//! into a caller-supplied write buffer and parses streamed replies out of a
//! caller-supplied read buffer; the workload module produces the keys and
//! values those requests carry.
//!
//! The engine never performs I/O and never suspends: parsing a reply that has
//! not fully arrived reports [`ParseEvent::Incomplete`] and resumes from the
//! same state when more bytes are buffered.

pub mod configs;
pub mod error;
pub mod factory;
pub mod keylist;
mod memcached;
mod redis;
pub mod response;
pub mod workload;

pub use error::{ProtocolError, Result};
pub use factory::protocol_factory;
pub use keylist::Keylist;
pub use response::{KeyValue, ProtocolResponse};

use memcached::binary::BinaryCodec;
use memcached::text::TextCodec;
use redis::RespCodec;
use spate_common::ByteBuffer;

/// Outcome of one [`KvProtocol::parse_response`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent {
    /// More bytes are needed; call again once the read buffer has grown.
    Incomplete,
    /// One logical reply is complete; consume [`KvProtocol::last_response`]
    /// and clear it before the next call.
    Complete,
}

enum Wire {
    Resp(RespCodec),
    Text(TextCodec),
    Binary(BinaryCodec),
}

/// Handle over one protocol instance.
///
/// The retention flag and the accumulating response are shared across all
/// three wire formats; the variant only owns its parser state machine.
/// Instances are single-threaded; clone to share a configuration across
/// worker threads.
pub struct KvProtocol {
    wire: Wire,
    keep_value: bool,
    last_response: ProtocolResponse,
}

impl KvProtocol {
    fn with_wire(wire: Wire) -> Self {
        Self { wire, keep_value: false, last_response: ProtocolResponse::new() }
    }

    pub fn redis() -> Self {
        Self::with_wire(Wire::Resp(RespCodec::new()))
    }

    pub fn memcache_text() -> Self {
        Self::with_wire(Wire::Text(TextCodec::new()))
    }

    pub fn memcache_binary() -> Self {
        Self::with_wire(Wire::Binary(BinaryCodec::new()))
    }

    pub fn name(&self) -> &'static str {
        match &self.wire {
            Wire::Resp(_) => redis::PROTOCOL_NAME,
            Wire::Text(_) => memcached::text::PROTOCOL_NAME,
            Wire::Binary(_) => memcached::binary::PROTOCOL_NAME,
        }
    }

    /// When set, decoded values (and keys, where the wire echoes them) are
    /// transferred into the response instead of being discarded.
    pub fn set_keep_value(&mut self, flag: bool) {
        self.keep_value = flag;
    }

    pub fn keep_value(&self) -> bool {
        self.keep_value
    }

    /// The reply accumulated by the last completed parse.
    pub fn last_response(&mut self) -> &mut ProtocolResponse {
        &mut self.last_response
    }

    /// Take ownership of the accumulated reply, leaving a cleared one behind.
    pub fn take_response(&mut self) -> ProtocolResponse {
        std::mem::take(&mut self.last_response)
    }

    pub fn select_db(&mut self, out: &mut dyn ByteBuffer, db: u32) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.select_db(out, db),
            Wire::Text(c) => c.select_db(out, db),
            Wire::Binary(c) => c.select_db(out, db),
        }
    }

    pub fn authenticate(&mut self, out: &mut dyn ByteBuffer, credentials: &str) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.authenticate(out, credentials),
            Wire::Text(c) => c.authenticate(out, credentials),
            Wire::Binary(c) => c.authenticate(out, credentials),
        }
    }

    /// Frame a store. `expiry` of 0 means no expiry; a nonzero `offset`
    /// requests a partial overwrite where the protocol supports one.
    pub fn write_set(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        value: &[u8],
        expiry: u32,
        offset: u32,
    ) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.write_set(out, key, value, expiry, offset),
            Wire::Text(c) => c.write_set(out, key, value, expiry, offset),
            Wire::Binary(c) => c.write_set(out, key, value, expiry, offset),
        }
    }

    pub fn write_get(&mut self, out: &mut dyn ByteBuffer, key: &[u8], offset: u32) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.write_get(out, key, offset),
            Wire::Text(c) => c.write_get(out, key, offset),
            Wire::Binary(c) => c.write_get(out, key, offset),
        }
    }

    /// Frame a lookup whose reply echoes the key.
    pub fn write_get_key(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        offset: u32,
    ) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.write_get_key(out, key, offset),
            Wire::Text(c) => c.write_get_key(out, key, offset),
            Wire::Binary(c) => c.write_get_key(out, key, offset),
        }
    }

    pub fn write_multi_get(&mut self, out: &mut dyn ByteBuffer, keys: &Keylist) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.write_multi_get(out, keys),
            Wire::Text(c) => c.write_multi_get(out, keys),
            Wire::Binary(c) => c.write_multi_get(out, keys),
        }
    }

    pub fn write_wait(
        &mut self,
        out: &mut dyn ByteBuffer,
        num_replicas: u32,
        timeout_ms: u32,
    ) -> Result<usize> {
        match &mut self.wire {
            Wire::Resp(c) => c.write_wait(out, num_replicas, timeout_ms),
            Wire::Text(c) => c.write_wait(out, num_replicas, timeout_ms),
            Wire::Binary(c) => c.write_wait(out, num_replicas, timeout_ms),
        }
    }

    /// Advance the reply parser over whatever bytes are buffered.
    ///
    /// `latency` is the caller's measurement for the reply being started; it
    /// is recorded when the reply's first bytes are seen, so even server
    /// errors carry it.
    pub fn parse_response(
        &mut self,
        input: &mut dyn ByteBuffer,
        latency: u64,
    ) -> Result<ParseEvent> {
        let keep_value = self.keep_value;
        let resp = &mut self.last_response;
        match &mut self.wire {
            Wire::Resp(c) => c.parse(input, latency, keep_value, resp),
            Wire::Text(c) => c.parse(input, latency, keep_value, resp),
            Wire::Binary(c) => c.parse(input, latency, keep_value, resp),
        }
    }
}

impl Clone for KvProtocol {
    /// Clones start with fresh parser state and an empty response, keeping
    /// only the protocol variant and the retention flag.
    fn clone(&self) -> Self {
        let wire = match &self.wire {
            Wire::Resp(_) => Wire::Resp(RespCodec::new()),
            Wire::Text(_) => Wire::Text(TextCodec::new()),
            Wire::Binary(_) => Wire::Binary(BinaryCodec::new()),
        };
        Self { wire, keep_value: self.keep_value, last_response: ProtocolResponse::new() }
    }
}
