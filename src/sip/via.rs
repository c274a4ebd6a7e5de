//! Via stack and Route manipulation
//!
//! The three proxy transforms of RFC 3261 §16 this relay performs: pushing
//! its own Via on forwarded requests, popping it off returning responses,
//! and stripping Route headers in favour of its Record-Route.

use std::net::{IpAddr, SocketAddr};

use super::headers;

/// The two header literals that identify this proxy on the wire.
/// Built once at startup from the advertised address, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ProxyIdentity {
    record_route: String,
    top_via: String,
}

impl ProxyIdentity {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            record_route: format!("Record-Route: <sip:{}:{};lr>", ip, port),
            top_via: format!("Via: SIP/2.0/UDP {}:{}", ip, port),
        }
    }

    /// `Record-Route: <sip:IP:PORT;lr>`
    pub fn record_route(&self) -> &str {
        &self.record_route
    }

    /// `Via: SIP/2.0/UDP IP:PORT`
    pub fn top_via(&self) -> &str {
        &self.top_via
    }
}

/// Annotate a Via with the address the datagram actually came from.
///
/// A bare `rport` token is replaced by `received=IP;rport=PORT`; otherwise
/// `;received=IP` is appended. RFC 3581 behaviour, also applied to the
/// client Via of locally generated responses.
pub fn annotate_received(line: &str, client: SocketAddr) -> String {
    if headers::has_rport(line) {
        line.replacen("rport", &format!("received={};rport={}", client.ip(), client.port()), 1)
    } else {
        format!("{};received={}", line, client.ip())
    }
}

/// Push the proxy's Via onto the stack of a forwarded request.
///
/// For every Via in the message: when it carries `;branch=B`, a new line
/// `TOP_VIA;branch=Bm` is inserted before it (the `m` suffix marks the
/// proxy's copy of the client branch), and the existing Via is annotated
/// with the client address. All other lines pass through unchanged.
pub fn add_top_via(lines: &[String], top_via: &str, client: SocketAddr) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len() + 1);
    for line in lines {
        if headers::is_via(line) {
            if let Some(branch) = headers::extract_branch(line) {
                out.push(format!("{};branch={}m", top_via, branch));
            }
            out.push(annotate_received(line, client));
        } else {
            out.push(line.clone());
        }
    }
    out
}

/// Drop the proxy's own Via lines from a response travelling back toward
/// the originator. Every other Via is preserved in order.
pub fn remove_top_via(lines: &[String], top_via: &str) -> Vec<String> {
    lines
        .iter()
        .filter(|line| !line.starts_with(top_via))
        .cloned()
        .collect()
}

/// Drop every Route header so downstream elements only see the routing
/// state established by the proxy's Record-Route.
pub fn remove_route(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| !line.starts_with("Route:"))
        .cloned()
        .collect()
}
