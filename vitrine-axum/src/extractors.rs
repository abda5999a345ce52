use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

/// Address the request came from.
///
/// The peer address when the server was started with connect info. With
/// `trust_forwarded` the first `X-Forwarded-For` entry, then `X-Real-IP`,
/// take precedence. Falls back to `"unknown"` so every request still has a key.
///
/// As an extractor it never trusts the proxy headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn from_parts(parts: &Parts, trust_forwarded: bool) -> Self {
        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        if !trust_forwarded {
            return ClientIp(peer().unwrap_or_else(|| Self::UNKNOWN.to_string()));
        }

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
        };

        let forwarded = header("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        let real_ip = || {
            header("x-real-ip")
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        };

        let ip = forwarded
            .or_else(real_ip)
            .map(str::to_string)
            .or_else(peer)
            .unwrap_or_else(|| Self::UNKNOWN.to_string());

        ClientIp(ip)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_parts(parts, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)], peer: Option<SocketAddr>) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(addr) = peer {
            parts.extensions.insert(ConnectInfo(addr));
        }
        parts
    }

    #[test]
    fn test_forwarded_for_wins_when_trusted() {
        let parts = parts(
            &[
                ("x-forwarded-for", " 203.0.113.7, 10.0.0.1"),
                ("x-real-ip", "198.51.100.2"),
            ],
            Some("127.0.0.1:4000".parse().unwrap()),
        );
        assert_eq!(ClientIp::from_parts(&parts, true).as_str(), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_then_peer_when_trusted() {
        let parts_with_real_ip = parts(&[("x-real-ip", "198.51.100.2")], None);
        assert_eq!(
            ClientIp::from_parts(&parts_with_real_ip, true).as_str(),
            "198.51.100.2"
        );

        let peer_only = parts(&[("x-forwarded-for", "")], Some("192.0.2.9:5000".parse().unwrap()));
        assert_eq!(ClientIp::from_parts(&peer_only, true).as_str(), "192.0.2.9");
    }

    #[test]
    fn test_headers_ignored_by_default() {
        let parts = parts(
            &[
                ("x-forwarded-for", "203.0.113.7"),
                ("x-real-ip", "198.51.100.2"),
            ],
            Some("192.0.2.9:5000".parse().unwrap()),
        );
        assert_eq!(ClientIp::from_parts(&parts, false).as_str(), "192.0.2.9");

        let no_peer = self::parts(&[("x-forwarded-for", "203.0.113.7")], None);
        assert_eq!(ClientIp::from_parts(&no_peer, false).as_str(), ClientIp::UNKNOWN);
    }

    #[test]
    fn test_unknown_without_any_source() {
        assert_eq!(
            ClientIp::from_parts(&parts(&[], None), true).as_str(),
            ClientIp::UNKNOWN
        );
    }
}
