//! Client address resolution.

use http::Request;
use std::net::{IpAddr, SocketAddr};

/// Peer address of the connection, for servers that do not put a bare
/// [`SocketAddr`] into request extensions.
///
/// ```ignore
/// req.extensions_mut().insert(ClientAddr(remote_addr));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Resolve the client address of `req`.
///
/// When forwarding headers are trusted, the first valid address in
/// `X-Forwarded-For` wins, then `X-Real-IP`. Otherwise, or when neither
/// holds a valid address, the peer address from the extensions is used.
/// Returns an empty string when nothing is known.
pub(crate) fn resolve_client_ip<B>(req: &Request<B>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = forwarded_ip(req) {
            return ip.to_string();
        }
    }

    req.extensions()
        .get::<ClientAddr>()
        .map(|addr| addr.0)
        .or_else(|| req.extensions().get::<SocketAddr>().copied())
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    let header_str = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

    header_str("x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or_else(|| header_str("x-real-ip").and_then(|ip| ip.trim().parse::<IpAddr>().ok()))
}
