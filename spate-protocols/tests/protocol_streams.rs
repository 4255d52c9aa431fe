//! Cross-protocol reply stream tests
//!
//! Feeds canonical reply streams whole, split at every possible boundary, and
//! one byte at a time, checking that the parsers land in the same final state
//! and consume the same bytes regardless of chunking.

use spate_common::{ByteBuffer, MemBuffer};
use spate_protocols::{protocol_factory, KvProtocol, ParseEvent, ProtocolResponse};

/// Summary of one parsed reply, comparable across feeding strategies.
#[derive(Debug, PartialEq, Eq)]
struct ReplySummary {
    status: Option<String>,
    error: bool,
    hits: u32,
    total_len: usize,
    values: Vec<(Option<Vec<u8>>, Vec<u8>)>,
    latencies: Vec<u64>,
}

fn summarize(resp: &mut ProtocolResponse) -> ReplySummary {
    let mut values = Vec::new();
    while let Some(pair) = resp.get_value() {
        values.push((pair.key, pair.value));
    }
    let mut latencies = Vec::new();
    while let Some(latency) = resp.get_latency() {
        latencies.push(latency);
    }
    ReplySummary {
        status: resp.status().map(str::to_string),
        error: resp.is_error(),
        hits: resp.hits(),
        total_len: resp.total_len(),
        values,
        latencies,
    }
}

/// Parse one complete reply fed all at once.
fn parse_whole(proto: &mut KvProtocol, stream: &[u8]) -> ReplySummary {
    let mut input = MemBuffer::new();
    input.append(stream);
    let event = proto.parse_response(&mut input, 42).unwrap();
    assert_eq!(event, ParseEvent::Complete);
    assert!(input.is_empty(), "parser left {} bytes unconsumed", input.len());
    let summary = summarize(proto.last_response());
    proto.last_response().clear();
    summary
}

/// Parse one complete reply fed as two chunks split at `split`.
fn parse_split(proto: &mut KvProtocol, stream: &[u8], split: usize) -> ReplySummary {
    let mut input = MemBuffer::new();
    input.append(&stream[..split]);
    match proto.parse_response(&mut input, 42).unwrap() {
        ParseEvent::Incomplete => {}
        ParseEvent::Complete => panic!("reply completed before all bytes arrived"),
    }
    input.append(&stream[split..]);
    let event = proto.parse_response(&mut input, 42).unwrap();
    assert_eq!(event, ParseEvent::Complete, "split at {split} did not complete");
    assert!(input.is_empty());
    let summary = summarize(proto.last_response());
    proto.last_response().clear();
    summary
}

/// Parse one complete reply fed a single byte at a time.
fn parse_byte_at_a_time(proto: &mut KvProtocol, stream: &[u8]) -> ReplySummary {
    let mut input = MemBuffer::new();
    for (i, byte) in stream.iter().enumerate() {
        input.append(&[*byte]);
        match proto.parse_response(&mut input, 42).unwrap() {
            ParseEvent::Incomplete => assert!(i + 1 < stream.len()),
            ParseEvent::Complete => {
                assert_eq!(i + 1, stream.len(), "completed early at byte {i}");
            }
        }
    }
    assert!(input.is_empty());
    let summary = summarize(proto.last_response());
    proto.last_response().clear();
    summary
}

/// The chunk-boundary property: all feeding strategies agree.
fn check_chunking_invariance(make_proto: impl Fn() -> KvProtocol, stream: &[u8]) {
    let reference = parse_whole(&mut make_proto(), stream);

    let byte_wise = parse_byte_at_a_time(&mut make_proto(), stream);
    assert_eq!(byte_wise, reference, "byte-at-a-time disagrees with whole-stream parse");

    for split in 1..stream.len() {
        let chunked = parse_split(&mut make_proto(), stream, split);
        assert_eq!(chunked, reference, "split at {split} disagrees with whole-stream parse");
    }
}

fn with_retention(mut proto: KvProtocol) -> KvProtocol {
    proto.set_keep_value(true);
    proto
}

fn binary_response_frame(
    opcode: u8,
    status: u16,
    extras: &[u8],
    key: &[u8],
    value: &[u8],
) -> Vec<u8> {
    let body_len = extras.len() + key.len() + value.len();
    let mut frame = vec![0u8; 24];
    frame[0] = 0x81;
    frame[1] = opcode;
    frame[2..4].copy_from_slice(&(key.len() as u16).to_be_bytes());
    frame[4] = extras.len() as u8;
    frame[6..8].copy_from_slice(&status.to_be_bytes());
    frame[8..12].copy_from_slice(&(body_len as u32).to_be_bytes());
    frame.extend_from_slice(extras);
    frame.extend_from_slice(key);
    frame.extend_from_slice(value);
    frame
}

#[test]
fn redis_simple_ok_any_chunking() {
    check_chunking_invariance(KvProtocol::redis, b"+OK\r\n");
    let summary = parse_whole(&mut KvProtocol::redis(), b"+OK\r\n");
    assert_eq!(summary.status.as_deref(), Some("+OK"));
    assert!(!summary.error);
    assert_eq!(summary.hits, 0);
    assert_eq!(summary.total_len, 5);
}

#[test]
fn redis_bulk_hit_any_chunking() {
    let stream = b"$5\r\nhello\r\n";
    check_chunking_invariance(|| with_retention(KvProtocol::redis()), stream);
    check_chunking_invariance(KvProtocol::redis, stream);

    let summary = parse_whole(&mut with_retention(KvProtocol::redis()), stream);
    assert_eq!(summary.hits, 1);
    assert_eq!(summary.total_len, 11);
    assert_eq!(summary.values, vec![(None::<Vec<u8>>, b"hello".to_vec())]);
}

#[test]
fn redis_nil_any_chunking() {
    let stream = b"$-1\r\n";
    check_chunking_invariance(KvProtocol::redis, stream);

    let summary = parse_whole(&mut KvProtocol::redis(), stream);
    assert_eq!(summary.hits, 0);
    assert_eq!(summary.total_len, 5);
    assert_eq!(summary.status.as_deref(), Some("$-1"));
}

#[test]
fn memcache_text_get_hit_any_chunking() {
    let stream = b"VALUE k 0 5\r\nhello\r\nEND\r\n";
    check_chunking_invariance(|| with_retention(KvProtocol::memcache_text()), stream);
    check_chunking_invariance(KvProtocol::memcache_text, stream);

    let summary = parse_whole(&mut with_retention(KvProtocol::memcache_text()), stream);
    assert_eq!(summary.hits, 1);
    assert_eq!(summary.values, vec![(None::<Vec<u8>>, b"hello".to_vec())]);
    assert_eq!(summary.total_len, stream.len());
}

#[test]
fn memcache_text_multi_value_any_chunking() {
    let stream = b"VALUE a 0 2\r\nv1\r\nVALUE b 0 2\r\nv2\r\nEND\r\n";
    check_chunking_invariance(|| with_retention(KvProtocol::memcache_text()), stream);
}

#[test]
fn memcache_binary_set_success_any_chunking() {
    let stream = binary_response_frame(0x01, 0x00, &[], &[], &[]);
    check_chunking_invariance(KvProtocol::memcache_binary, &stream);

    let summary = parse_whole(&mut KvProtocol::memcache_binary(), &stream);
    assert_eq!(summary.hits, 0);
    assert!(!summary.error);
    assert_eq!(summary.status.as_deref(), Some("SUCCESS"));
    assert_eq!(summary.total_len, 24);
}

#[test]
fn memcache_binary_multi_get_any_chunking() {
    let mut stream = binary_response_frame(0x0d, 0x00, &[], b"a", b"v1");
    stream.extend_from_slice(&binary_response_frame(0x0d, 0x00, &[], b"b", b"v2"));
    stream.extend_from_slice(&binary_response_frame(0x0c, 0x00, &[], b"c", b"v3"));

    check_chunking_invariance(|| with_retention(KvProtocol::memcache_binary()), &stream);

    let summary = parse_whole(&mut with_retention(KvProtocol::memcache_binary()), &stream);
    assert_eq!(summary.hits, 3);
    assert_eq!(summary.total_len, stream.len());
    assert_eq!(
        summary.values,
        vec![
            (Some(b"a".to_vec()), b"v1".to_vec()),
            (Some(b"b".to_vec()), b"v2".to_vec()),
            (Some(b"c".to_vec()), b"v3".to_vec()),
        ]
    );
}

#[test]
fn retention_off_consumes_the_same_bytes() {
    let mut stream = binary_response_frame(0x0d, 0x00, &[], b"a", b"v1");
    stream.extend_from_slice(&binary_response_frame(0x0c, 0x00, &[], b"c", b"v3"));

    let kept = parse_whole(&mut with_retention(KvProtocol::memcache_binary()), &stream);
    let dropped = parse_whole(&mut KvProtocol::memcache_binary(), &stream);

    assert_eq!(kept.total_len, dropped.total_len);
    assert_eq!(kept.hits, dropped.hits);
    assert!(dropped.values.is_empty());
}

#[test]
fn set_round_trip_all_protocols() {
    let replies: [(&str, Vec<u8>); 3] = [
        ("redis", b"+OK\r\n".to_vec()),
        ("memcache_text", b"STORED\r\n".to_vec()),
        ("memcache_binary", binary_response_frame(0x01, 0x00, &[], &[], &[])),
    ];

    for (name, reply) in replies {
        let mut proto = protocol_factory(name).unwrap();
        let mut write_buf = MemBuffer::new();
        let n = proto.write_set(&mut write_buf, b"key", b"value", 9, 0).unwrap();
        assert_eq!(n, write_buf.len(), "{name}: encoder byte count mismatch");

        let mut read_buf = MemBuffer::new();
        read_buf.append(&reply);
        assert_eq!(proto.parse_response(&mut read_buf, 1).unwrap(), ParseEvent::Complete);
        assert!(!proto.last_response().is_error(), "{name}: unexpected error");
        assert_eq!(proto.last_response().hits(), 0, "{name}: a write must not count as a hit");
        assert_eq!(proto.last_response().total_len(), reply.len(), "{name}: total_len mismatch");
    }
}

#[test]
fn get_hit_round_trip_all_protocols() {
    let payload = b"hello";
    let replies: [(&str, Vec<u8>); 3] = [
        ("redis", b"$5\r\nhello\r\n".to_vec()),
        ("memcache_text", b"VALUE key 0 5\r\nhello\r\nEND\r\n".to_vec()),
        ("memcache_binary", binary_response_frame(0x00, 0x00, &[0, 0, 0, 0], &[], payload)),
    ];

    for (name, reply) in replies {
        let mut proto = protocol_factory(name).unwrap();
        proto.set_keep_value(true);

        let mut write_buf = MemBuffer::new();
        let n = proto.write_get(&mut write_buf, b"key", 0).unwrap();
        assert_eq!(n, write_buf.len(), "{name}: encoder byte count mismatch");

        let mut read_buf = MemBuffer::new();
        read_buf.append(&reply);
        assert_eq!(proto.parse_response(&mut read_buf, 1).unwrap(), ParseEvent::Complete);
        assert_eq!(proto.last_response().hits(), 1, "{name}: hit not counted");
        let pair = proto.last_response().get_value().unwrap();
        assert_eq!(pair.value, payload, "{name}: retained value mismatch");
    }
}

#[test]
fn back_to_back_replies_parse_independently() {
    let mut proto = KvProtocol::redis();
    let mut input = MemBuffer::new();
    input.append(b"+OK\r\n$3\r\nabc\r\n$-1\r\n");

    assert_eq!(proto.parse_response(&mut input, 0).unwrap(), ParseEvent::Complete);
    assert_eq!(proto.last_response().total_len(), 5);
    proto.last_response().clear();

    assert_eq!(proto.parse_response(&mut input, 0).unwrap(), ParseEvent::Complete);
    assert_eq!(proto.last_response().total_len(), 9);
    assert_eq!(proto.last_response().hits(), 1);
    proto.last_response().clear();

    assert_eq!(proto.parse_response(&mut input, 0).unwrap(), ParseEvent::Complete);
    assert_eq!(proto.last_response().total_len(), 5);
    assert_eq!(proto.last_response().hits(), 0);
    assert!(input.is_empty());
}
