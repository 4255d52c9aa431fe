//! Redis protocol (RESP) codec
//!
//! Encodes the RESP v2 subset the load generator issues (SET/SETEX/SETRANGE,
//! GET/GETRANGE, SELECT, AUTH, WAIT) and parses single-line and bulk replies.
//! Multi-bulk (`*`) replies are never requested, so encountering one on the
//! read side is a protocol violation.

use spate_common::ByteBuffer;
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::keylist::Keylist;
use crate::response::ProtocolResponse;
use crate::ParseEvent;

pub(crate) const PROTOCOL_NAME: &str = "redis";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RespState {
    Initial,
    ReadBulk,
}

/// RESP reply parser state plus the running byte count of the current reply.
#[derive(Debug)]
pub(crate) struct RespCodec {
    state: RespState,
    bulk_len: usize,
    response_len: usize,
}

impl RespCodec {
    pub(crate) fn new() -> Self {
        Self { state: RespState::Initial, bulk_len: 0, response_len: 0 }
    }

    pub(crate) fn select_db(&mut self, out: &mut dyn ByteBuffer, db: u32) -> Result<usize> {
        let db_str = db.to_string();
        Ok(out.append_fmt(format_args!(
            "*2\r\n$6\r\nSELECT\r\n${}\r\n{}\r\n",
            db_str.len(),
            db_str
        )))
    }

    pub(crate) fn authenticate(
        &mut self,
        out: &mut dyn ByteBuffer,
        credentials: &str,
    ) -> Result<usize> {
        Ok(out.append_fmt(format_args!(
            "*2\r\n$4\r\nAUTH\r\n${}\r\n{}\r\n",
            credentials.len(),
            credentials
        )))
    }

    pub(crate) fn write_set(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        value: &[u8],
        expiry: u32,
        offset: u32,
    ) -> Result<usize> {
        let mut size = if expiry == 0 && offset == 0 {
            let mut n = out.append_fmt(format_args!("*3\r\n$3\r\nSET\r\n${}\r\n", key.len()));
            out.append(key);
            n += key.len();
            n + out.append_fmt(format_args!("\r\n${}\r\n", value.len()))
        } else if offset > 0 {
            let offset_str = offset.to_string();
            let mut n = out.append_fmt(format_args!("*4\r\n$8\r\nSETRANGE\r\n${}\r\n", key.len()));
            out.append(key);
            n += key.len();
            n + out.append_fmt(format_args!(
                "\r\n${}\r\n{}\r\n${}\r\n",
                offset_str.len(),
                offset_str,
                value.len()
            ))
        } else {
            let expiry_str = expiry.to_string();
            let mut n = out.append_fmt(format_args!("*4\r\n$5\r\nSETEX\r\n${}\r\n", key.len()));
            out.append(key);
            n += key.len();
            n + out.append_fmt(format_args!(
                "\r\n${}\r\n{}\r\n${}\r\n",
                expiry_str.len(),
                expiry_str,
                value.len()
            ))
        };

        out.append(value);
        out.append(b"\r\n");
        size += value.len() + 2;
        Ok(size)
    }

    pub(crate) fn write_get(
        &mut self,
        out: &mut dyn ByteBuffer,
        key: &[u8],
        offset: u32,
    ) -> Result<usize> {
        if offset == 0 {
            let mut size = out.append_fmt(format_args!("*2\r\n$3\r\nGET\r\n${}\r\n", key.len()));
            out.append(key);
            out.append(b"\r\n");
            size += key.len() + 2;
            Ok(size)
        } else {
            let offset_str = offset.to_string();
            let mut size =
                out.append_fmt(format_args!("*4\r\n$8\r\nGETRANGE\r\n${}\r\n", key.len()));
            out.append(key);
            size += key.len();
            size += out.append_fmt(format_args!(
                "\r\n${}\r\n{}\r\n$2\r\n-1\r\n",
                offset_str.len(),
                offset_str
            ));
            Ok(size)
        }
    }

    pub(crate) fn write_get_key(
        &mut self,
        _out: &mut dyn ByteBuffer,
        _key: &[u8],
        _offset: u32,
    ) -> Result<usize> {
        Err(ProtocolError::Unsupported { protocol: PROTOCOL_NAME, command: "get-key" })
    }

    pub(crate) fn write_multi_get(
        &mut self,
        _out: &mut dyn ByteBuffer,
        _keys: &Keylist,
    ) -> Result<usize> {
        Err(ProtocolError::Unsupported { protocol: PROTOCOL_NAME, command: "multi-get" })
    }

    pub(crate) fn write_wait(
        &mut self,
        out: &mut dyn ByteBuffer,
        num_replicas: u32,
        timeout_ms: u32,
    ) -> Result<usize> {
        let num_str = num_replicas.to_string();
        let timeout_str = timeout_ms.to_string();
        Ok(out.append_fmt(format_args!(
            "*3\r\n$4\r\nWAIT\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
            num_str.len(),
            num_str,
            timeout_str.len(),
            timeout_str
        )))
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
                RespState::Initial => {
                    let Some(line) = input.readln() else {
                        return Ok(ParseEvent::Incomplete);
                    };
                    self.response_len = line.len() + 2;

                    if line.first() == Some(&b'*') {
                        debug!("multi-bulk replies are not supported");
                        return Err(ProtocolError::Violation("unexpected multi-bulk reply".into()));
                    }

                    resp.clear();
                    resp.set_latency(latency);

                    match line.first() {
                        Some(b'$') => {
                            let len = parse_bulk_len(&line)?;
                            resp.set_status(String::from_utf8_lossy(&line).into_owned());
                            if len == -1 {
                                // nil bulk: the reply is just this line
                                resp.set_total_len(self.response_len);
                                return Ok(ParseEvent::Complete);
                            }
                            self.bulk_len = len as usize;
                            self.state = RespState::ReadBulk;
                        }
                        Some(&c) if c == b'+' || c == b'-' || c == b':' => {
                            resp.set_status(String::from_utf8_lossy(&line).into_owned());
                            resp.set_total_len(self.response_len);
                            if c == b'-' {
                                resp.set_error(true);
                            }
                            return Ok(ParseEvent::Complete);
                        }
                        _ => {
                            let text = String::from_utf8_lossy(&line).into_owned();
                            debug!(line = %text, "unsupported reply");
                            return Err(ProtocolError::Violation(format!(
                                "unsupported reply line: {text:?}"
                            )));
                        }
                    }
                }
                RespState::ReadBulk => {
                    if input.len() < self.bulk_len + 2 {
                        return Ok(ParseEvent::Incomplete);
                    }

                    if keep_value && self.bulk_len > 0 {
                        let value = input.read(self.bulk_len);
                        input.drain(2);
                        resp.set_value(value, None);
                    } else {
                        input.drain(self.bulk_len + 2);
                    }

                    self.state = RespState::Initial;
                    resp.set_total_len(self.response_len + self.bulk_len + 2);
                    if self.bulk_len > 0 {
                        resp.incr_hits();
                    }
                    return Ok(ParseEvent::Complete);
                }
            }
        }
    }
}

fn parse_bulk_len(line: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(&line[1..])
        .map_err(|_| ProtocolError::Violation("non-utf8 bulk length".into()))?;
    let len = text
        .parse::<i64>()
        .map_err(|_| ProtocolError::Violation(format!("bad bulk length: {text:?}")))?;
    if len < -1 {
        return Err(ProtocolError::Violation(format!("negative bulk length: {len}")));
    }
    Ok(len)
}
