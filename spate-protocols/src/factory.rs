//! Protocol factory
//!
//! Maps a configured protocol name to a fresh protocol instance. Unknown
//! names are reported through the error sink and yield `None` so the caller
//! can fail its configuration phase.

use tracing::error;

use crate::KvProtocol;

/// Create a protocol instance by name.
///
/// Recognized names: `redis`, `memcache_text`, `memcache_binary`.
pub fn protocol_factory(name: &str) -> Option<KvProtocol> {
    match name {
        "redis" => Some(KvProtocol::redis()),
        "memcache_text" => Some(KvProtocol::memcache_text()),
        "memcache_binary" => Some(KvProtocol::memcache_binary()),
        _ => {
            error!(protocol = name, "unknown protocol");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        for name in ["redis", "memcache_text", "memcache_binary"] {
            let proto = protocol_factory(name).expect(name);
            assert_eq!(proto.name(), name);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(protocol_factory("memcache_udp").is_none());
        assert!(protocol_factory("").is_none());
    }
}
