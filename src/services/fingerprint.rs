// src/services/fingerprint.rs

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Connection metadata a fingerprint is derived from.
///
/// Not a security boundary: two requests from the same browser on the same
/// network collide on purpose, so the fingerprint works as a coarse
/// per-device multiplexing key for the session cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMetadata {
    pub user_agent: String,
    pub ip_address: String,
    pub accept_language: String,
    pub accept_encoding: String,
}

impl DeviceMetadata {
    pub fn from_headers(headers: &HeaderMap, ip_address: String) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            user_agent: header("user-agent"),
            ip_address,
            accept_language: header("accept-language"),
            accept_encoding: header("accept-encoding"),
        }
    }
}

/// Best guess at the client IP: first hop of x-forwarded-for when present,
/// otherwise the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<std::net::SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| peer.map(|a| a.ip().to_string()))
        .unwrap_or_default()
}

/// One-way hash over the ordered metadata tuple. Pure, no I/O.
pub fn device_fingerprint(meta: &DeviceMetadata) -> String {
    let joined = [
        meta.user_agent.as_str(),
        meta.ip_address.as_str(),
        meta.accept_language.as_str(),
        meta.accept_encoding.as_str(),
    ]
    .join("|");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> DeviceMetadata {
        DeviceMetadata {
            user_agent: "Mozilla/5.0".into(),
            ip_address: "10.0.0.1".into(),
            accept_language: "en-US".into(),
            accept_encoding: "gzip, br".into(),
        }
    }

    #[test]
    fn same_metadata_same_fingerprint() {
        assert_eq!(device_fingerprint(&meta()), device_fingerprint(&meta()));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = device_fingerprint(&meta());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_device_different_fingerprint() {
        let mut other = meta();
        other.user_agent = "curl/8.0".into();
        assert_ne!(device_fingerprint(&meta()), device_fingerprint(&other));

        let mut other_net = meta();
        other_net.ip_address = "192.168.1.7".into();
        assert_ne!(device_fingerprint(&meta()), device_fingerprint(&other_net));
    }

    #[test]
    fn forwarded_header_wins_over_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.2".parse().unwrap());
        let peer = "127.0.0.1:9999".parse().ok();
        assert_eq!(client_ip(&headers, peer), "203.0.113.9");

        let empty = HeaderMap::new();
        assert_eq!(client_ip(&empty, peer), "127.0.0.1");
        assert_eq!(client_ip(&empty, None), "");
    }

    #[test]
    fn field_order_matters() {
        // user_agent and ip swapped must not collide with the original tuple
        let swapped = DeviceMetadata {
            user_agent: "10.0.0.1".into(),
            ip_address: "Mozilla/5.0".into(),
            accept_language: "en-US".into(),
            accept_encoding: "gzip, br".into(),
        };
        assert_ne!(device_fingerprint(&meta()), device_fingerprint(&swapped));
    }
}
