//! Memcached ASCII protocol codec
//!
//! Requests are single command lines (`set`, `get`); replies are a sequence
//! of `VALUE <key> <flags> <len> [<cas>]` sections each followed by a data
//! block, terminated by `END` (or a bare `STORED` for writes). The status of
//! a reply is the first line seen; every VALUE section counts one hit.

use spate_common::ByteBuffer;
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::keylist::Keylist;
use crate::response::ProtocolResponse;
use crate::ParseEvent;

pub(crate) const PROTOCOL_NAME: &str = "memcache_text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextState {
    Initial,
    ReadSection,
    ReadValue,
    ReadEnd,
}

#[derive(Debug)]
pub(crate) struct TextCodec {
    state: TextState,
    value_len: usize,
    response_len: usize,
}

impl TextCodec {
    pub(crate) fn new() -> Self {
        Self { state: TextState::Initial, value_len: 0, response_len: 0 }
    }

    pub(crate) fn select_db(&mut self, _out: &mut dyn ByteBuffer, _db: u32) -> Result<usize> {
        Err(ProtocolError::Unsupported { protocol: PROTOCOL_NAME, command: "select-db" })
    }

    pub(crate) fn authenticate(
        &mut self,
        _out: &mut dyn ByteBuffer,
        _credentials: &str,
    ) -> Result<usize> {
        Err(ProtocolError::Unsupported { protocol: PROTOCOL_NAME, command: "authenticate" })
    }

    pub(crate) fn write_set(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        value: &[u8],
        expiry: u32,
        _offset: u32,
    ) -> Result<usize> {
        out.append(b"set ");
        out.append(key);
        let mut size = 4 + key.len();
        size += out.append_fmt(format_args!(" 0 {} {}\r\n", expiry, value.len()));
        out.append(value);
        out.append(b"\r\n");
        size += value.len() + 2;
        Ok(size)
    }

    pub(crate) fn write_get(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        _offset: u32,
    ) -> Result<usize> {
        out.append(b"get ");
        out.append(key);
        out.append(b"\r\n");
        Ok(4 + key.len() + 2)
    }

    pub(crate) fn write_get_key(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        offset: u32,
    ) -> Result<usize> {
        // an ASCII get already echoes the key in its VALUE line
        self.write_get(out, key, offset)
    }

    pub(crate) fn write_multi_get(
        &mut self,
        out: &mut dyn ByteBuffer,
        keys: &Keylist,
    ) -> Result<usize> {
        if keys.is_empty() {
            return Err(ProtocolError::Config("multi-get requires at least one key".into()));
        }

        out.append(b"get");
        let mut size = 3;
        for key in keys.iter() {
            out.append(b" ");
            out.append(key);
            size += 1 + key.len();
        }
        out.append(b"\r\n");
        Ok(size + 2)
    }

    pub(crate) fn write_wait(
        &mut self,
        _out: &mut dyn ByteBuffer,
        _num_replicas: u32,
        _timeout_ms: u32,
    ) -> Result<usize> {
        Err(ProtocolError::Unsupported { protocol: PROTOCOL_NAME, command: "wait" })
    }

    pub(crate) fn parse(
        &mut self,
        input: &mut dyn ByteBuffer,
        latency: u64,
        keep_value: bool,
        resp: &mut ProtocolResponse,
    ) -> Result<ParseEvent> {
        loop {
            match self.state {
                TextState::Initial => {
                    resp.clear();
                    self.response_len = 0;
                    self.state = TextState::ReadSection;
                }
                TextState::ReadSection => {
                    let Some(line) = input.readln() else {
                        return Ok(ParseEvent::Incomplete);
                    };
                    self.response_len += line.len() + 2;

                    let text = String::from_utf8_lossy(&line).into_owned();
                    if resp.status().is_none() {
                        resp.set_status(text.clone());
                    }
                    resp.set_total_len(self.response_len);

                    if line.starts_with(b"VALUE") {
                        self.value_len = parse_value_line(&text)?;
                        resp.set_latency(latency);
                        self.state = TextState::ReadValue;
                        continue;
                    } else if line.starts_with(b"END") || line.starts_with(b"STORED") {
                        self.state = TextState::ReadEnd;
                    } else {
                        resp.set_error(true);
                        debug!(line = %text, "unknown reply");
                        return Err(ProtocolError::Violation(format!("unknown reply line: {text:?}")));
                    }
                    resp.set_latency(latency);
                }
                TextState::ReadValue => {
                    if input.len() < self.value_len + 2 {
                        return Ok(ParseEvent::Incomplete);
                    }

                    if keep_value {
                        let value = input.read(self.value_len);
                        resp.set_value(value, None);
                    } else {
                        input.drain(self.value_len);
                    }
                    input.drain(2);

                    resp.incr_hits();
                    self.response_len += self.value_len + 2;
                    self.state = TextState::ReadSection;
                }
                TextState::ReadEnd => {
                    self.state = TextState::Initial;
                    return Ok(ParseEvent::Complete);
                }
            }
        }
    }
}

/// Parse `VALUE <key> <flags> <len> [<cas>]`, returning the data block length.
fn parse_value_line(text: &str) -> Result<usize> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 4 || fields.len() > 5 {
        debug!(line = %text, "unexpected VALUE reply");
        return Err(ProtocolError::Violation(format!("unexpected VALUE line: {text:?}")));
    }

    fields[2]
        .parse::<u32>()
        .map_err(|_| ProtocolError::Violation(format!("bad flags in VALUE line: {text:?}")))?;
    if fields.len() == 5 {
        fields[4]
            .parse::<u64>()
            .map_err(|_| ProtocolError::Violation(format!("bad cas in VALUE line: {text:?}")))?;
    }
    fields[3]
        .parse::<usize>()
        .map_err(|_| ProtocolError::Violation(format!("bad length in VALUE line: {text:?}")))
}
