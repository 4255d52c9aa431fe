//! Memcached binary protocol codec
//!
//! Every message starts with a 24-byte header in network byte order:
//! magic, opcode, key length, extras length, data type, vbucket/status,
//! body length, opaque, cas. Multi-get is encoded as a run of quiet GETKQ
//! frames closed by one GETK; the server answers only the keys it has, and
//! the reply to the final GETK terminates the batch, so the parser folds
//! every GETKQ response frame into the same logical reply.

use spate_common::ByteBuffer;
use tracing::error;

use crate::error::{ProtocolError, Result};
use crate::keylist::Keylist;
use crate::response::ProtocolResponse;
use crate::ParseEvent;

pub(crate) const PROTOCOL_NAME: &str = "memcache_binary";

const MAGIC_REQUEST: u8 = 0x80;
const MAGIC_RESPONSE: u8 = 0x81;
const HEADER_SIZE: usize = 24;

// Command opcodes
const CMD_GET: u8 = 0x00;
const CMD_SET: u8 = 0x01;
const CMD_GETK: u8 = 0x0c;
const CMD_GETKQ: u8 = 0x0d;
const CMD_SASL_AUTH: u8 = 0x21;

// Response status codes
const STATUS_SUCCESS: u16 = 0x00;
const STATUS_EINVAL: u16 = 0x04;
const STATUS_AUTH_ERROR: u16 = 0x20;
const STATUS_AUTH_CONTINUE: u16 = 0x21;
const STATUS_UNKNOWN_COMMAND: u16 = 0x81;
const STATUS_NOT_SUPPORTED: u16 = 0x83;
const STATUS_EBUSY: u16 = 0x85;

/// Human-readable name for a response status, if it is a known code.
fn status_text(status: u16) -> Option<&'static str> {
    Some(match status {
        STATUS_SUCCESS => "SUCCESS",
        0x01 => "KEY_ENOENT",
        0x02 => "KEY_EEXISTS",
        0x03 => "E2BIG",
        STATUS_EINVAL => "EINVAL",
        0x05 => "NOT_STORED",
        0x06 => "DELTA_BADVAL",
        0x07 => "NOT_MY_VBUCKET",
        STATUS_AUTH_ERROR => "AUTH_ERROR",
        STATUS_AUTH_CONTINUE => "AUTH_CONTINUE",
        STATUS_UNKNOWN_COMMAND => "UNKNOWN_COMMAND",
        0x82 => "ENOMEM",
        STATUS_NOT_SUPPORTED => "NOT_SUPPORTED",
        0x84 => "EINTERNAL",
        STATUS_EBUSY => "EBUSY",
        0x86 => "ETMPFAIL",
        _ => return None,
    })
}

fn is_error_status(status: u16) -> bool {
    matches!(
        status,
        STATUS_EINVAL
            | STATUS_AUTH_ERROR
            | STATUS_AUTH_CONTINUE
            | STATUS_NOT_SUPPORTED
            | STATUS_UNKNOWN_COMMAND
            | STATUS_EBUSY
    )
}

fn put_request_header(
    out: &mut dyn ByteBuffer,
    opcode: u8,
    key_len: u16,
    extras_len: u8,
    body_len: u32,
) {
    let mut header = [0u8; HEADER_SIZE];
    header[0] = MAGIC_REQUEST;
    header[1] = opcode;
    header[2..4].copy_from_slice(&key_len.to_be_bytes());
    header[4] = extras_len;
    // data type, vbucket, opaque and cas stay zero
    header[8..12].copy_from_slice(&body_len.to_be_bytes());
    out.append(&header);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryState {
    Initial,
    MultiInitial,
    ReadBody,
}

/// Binary reply parser: FSM state plus the current frame header in host order.
#[derive(Debug)]
pub(crate) struct BinaryCodec {
    state: BinaryState,
    opcode: u8,
    key_len: u16,
    extras_len: u8,
    status: u16,
    body_len: u32,
    response_len: usize,
}

impl BinaryCodec {
    pub(crate) fn new() -> Self {
        Self {
            state: BinaryState::Initial,
            opcode: 0,
            key_len: 0,
            extras_len: 0,
            status: 0,
            body_len: 0,
            response_len: 0,
        }
    }

    pub(crate) fn select_db(&mut self, _out: &mut dyn ByteBuffer, _db: u32) -> Result<usize> {
        Err(ProtocolError::Unsupported { protocol: PROTOCOL_NAME, command: "select-db" })
    }

    pub(crate) fn authenticate(
        &mut self,
        out: &mut dyn ByteBuffer,
        credentials: &str,
    ) -> Result<usize> {
        let colon = credentials.find(':').ok_or_else(|| {
            ProtocolError::Config("credentials must be formatted as user:password".into())
        })?;
        let user = &credentials[..colon];
        let password = &credentials[colon + 1..];

        let mechanism = b"PLAIN";
        let body_len = mechanism.len() + user.len() + password.len() + 2;
        put_request_header(out, CMD_SASL_AUTH, mechanism.len() as u16, 0, body_len as u32);
        out.append(mechanism);
        out.append(&[0]);
        out.append(user.as_bytes());
        out.append(&[0]);
        out.append(password.as_bytes());
        Ok(HEADER_SIZE + body_len)
    }

    pub(crate) fn write_set(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        value: &[u8],
        expiry: u32,
        _offset: u32,
    ) -> Result<usize> {
        // extras: 4 bytes flags (zero) + 4 bytes expiry
        let body_len = 8 + key.len() + value.len();
        put_request_header(out, CMD_SET, key.len() as u16, 8, body_len as u32);
        let mut extras = [0u8; 8];
        extras[4..8].copy_from_slice(&expiry.to_be_bytes());
        out.append(&extras);
        out.append(key);
        out.append(value);
        Ok(HEADER_SIZE + body_len)
    }

    pub(crate) fn write_get(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        _offset: u32,
    ) -> Result<usize> {
        put_request_header(out, CMD_GET, key.len() as u16, 0, key.len() as u32);
        out.append(key);
        Ok(HEADER_SIZE + key.len())
    }

    pub(crate) fn write_get_key(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        _offset: u32,
    ) -> Result<usize> {
        put_request_header(out, CMD_GETK, key.len() as u16, 0, key.len() as u32);
        out.append(key);
        Ok(HEADER_SIZE + key.len())
    }

    pub(crate) fn write_multi_get(
        &mut self,
        out: &mut dyn ByteBuffer,
        keys: &Keylist,
    ) -> Result<usize> {
        if keys.is_empty() {
            return Err(ProtocolError::Config("multi-get requires at least one key".into()));
        }

        let mut size = 0;
        let last = keys.keys_count() - 1;
        for (i, key) in keys.iter().enumerate() {
            // quiet gets for all but the last key; the closing GETK forces
            // the server to answer even when every quiet key missed
            let opcode = if i == last { CMD_GETK } else { CMD_GETKQ };
            put_request_header(out, opcode, key.len() as u16, 0, key.len() as u32);
            out.append(key);
            size += HEADER_SIZE + key.len();
        }
        Ok(size)
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
                BinaryState::Initial => {
                    resp.clear();
                    self.response_len = 0;
                    self.state = BinaryState::MultiInitial;
                }
                BinaryState::MultiInitial => {
                    if input.len() < HEADER_SIZE {
                        return Ok(ParseEvent::Incomplete);
                    }

                    let header = input.read(HEADER_SIZE);
                    if header[0] != MAGIC_RESPONSE {
                        error!(magic = header[0], "invalid response header magic");
                        return Err(ProtocolError::Violation(format!(
                            "invalid response magic: {:#04x}",
                            header[0]
                        )));
                    }

                    self.opcode = header[1];
                    self.key_len = u16::from_be_bytes([header[2], header[3]]);
                    self.extras_len = header[4];
                    self.status = u16::from_be_bytes([header[6], header[7]]);
                    self.body_len =
                        u32::from_be_bytes([header[8], header[9], header[10], header[11]]);

                    self.response_len += HEADER_SIZE;
                    resp.set_total_len(self.response_len);
                    if let Some(text) = status_text(self.status) {
                        resp.set_status(text.to_string());
                    }
                    if is_error_status(self.status) {
                        resp.set_error(true);
                    }
                    resp.set_latency(latency);

                    if self.body_len > 0 {
                        if (self.extras_len as u32 + self.key_len as u32) > self.body_len {
                            return Err(ProtocolError::Violation(format!(
                                "frame body too short: body {} < extras {} + key {}",
                                self.body_len, self.extras_len, self.key_len
                            )));
                        }
                        self.state = BinaryState::ReadBody;
                        continue;
                    }

                    self.state = BinaryState::Initial;
                    return Ok(ParseEvent::Complete);
                }
                BinaryState::ReadBody => {
                    if input.len() < self.body_len as usize {
                        return Ok(ParseEvent::Incomplete);
                    }

                    // extras are not interesting to the client
                    input.drain(self.extras_len as usize);
                    let payload_len =
                        self.body_len as usize - self.extras_len as usize - self.key_len as usize;

                    if keep_value {
                        let key = if self.opcode == CMD_GETK || self.opcode == CMD_GETKQ {
                            Some(input.read(self.key_len as usize))
                        } else {
                            input.drain(self.key_len as usize);
                            None
                        };
                        let value = input.read(payload_len);
                        resp.set_value(value, key);
                    } else {
                        input.drain(self.key_len as usize + payload_len);
                    }

                    if self.status == STATUS_SUCCESS {
                        resp.incr_hits();
                    }
                    self.response_len += self.body_len as usize;
                    resp.set_total_len(self.response_len);

                    if self.opcode == CMD_GETKQ {
                        // more frames of the same quiet batch follow
                        self.state = BinaryState::MultiInitial;
                        continue;
                    }
                    self.state = BinaryState::Initial;
                    return Ok(ParseEvent::Complete);
                }
            }
        }
    }
}
