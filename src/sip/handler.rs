//! Method dispatcher and per-method handlers
//!
//! Each datagram is handled in isolation: the decoded line sequence, the
//! client address, and a reference to the receiving socket flow through the
//! proxy's methods together with the shared registrar. No per-dialog or
//! per-transaction state is kept.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::diary::CallDiary;
use crate::sip::headers;
use crate::sip::message::{self, Method, StartLine};
use crate::sip::registrar::{Binding, Registrar};
use crate::sip::via::{self, ProxyIdentity};

pub struct Proxy {
    registrar: Registrar,
    identity: ProxyIdentity,
    diary: CallDiary,
}

/// One in-flight datagram: its lines, where it came from, and the socket
/// it arrived on (which is also where any direct reply goes out).
struct Transaction<'a> {
    lines: Vec<String>,
    client: SocketAddr,
    socket: &'a Arc<UdpSocket>,
}

impl Proxy {
    pub fn new(registrar: Registrar, identity: ProxyIdentity, diary: CallDiary) -> Self {
        Self { registrar, identity, diary }
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Entry point for the listener: classify one datagram and route it to
    /// the matching handler.
    pub async fn handle_datagram(&self, payload: &[u8], client: SocketAddr, socket: &Arc<UdpSocket>) {
        let lines = match message::decode(payload) {
            Some(lines) => lines,
            None => {
                self.reject_non_sip(payload);
                return;
            }
        };
        let start = lines.first().cloned().unwrap_or_default();
        let parsed = StartLine::parse(&start);
        if parsed == StartLine::Invalid {
            self.reject_non_sip(payload);
            return;
        }

        info!(">>> {}", start);
        debug!("---\n>> server received [{}]:\n{}\n---", payload.len(), String::from_utf8_lossy(payload));
        debug!("Received from {}", client);

        let mut tx = Transaction { lines, client, socket };
        match parsed {
            StartLine::Request(method) => self.dispatch_request(method, &mut tx).await,
            StartLine::Response { .. } => self.forward_response(&mut tx).await,
            StartLine::Invalid => unreachable!("rejected above"),
        }
    }

    async fn dispatch_request(&self, method: Method, tx: &mut Transaction<'_>) {
        match method {
            Method::Register => self.process_register(tx).await,
            Method::Invite => {
                self.process_with_origin_check(tx, "480 Temporarily Unavailable").await;
                self.diary.record_call_start(
                    &headers::get_origin(&tx.lines).unwrap_or_default(),
                    &headers::get_destination(&tx.lines).unwrap_or_default(),
                );
            }
            Method::Ack => {
                self.process_ack(tx).await;
                self.diary.record_call_answered();
            }
            Method::Bye => {
                self.process_with_origin_check(tx, "406 Not Acceptable").await;
                self.diary.record_call_end();
            }
            Method::Cancel
            | Method::Options
            | Method::Info
            | Method::Message
            | Method::Refer
            | Method::Prack
            | Method::Update => self.process_with_origin_check(tx, "406 Not Acceptable").await,
            Method::Subscribe | Method::Publish | Method::Notify => {
                self.send_response(tx, "200 Everything is fine").await;
            }
            Method::Unknown(name) => {
                error!("unhandled request method {}: {}", name, tx.lines[0]);
            }
        }
    }

    /// REGISTER: bind or unbind the To AOR. A zero expires removes the
    /// binding; anything else upserts it with an absolute expiry.
    async fn process_register(&self, tx: &mut Transaction<'_>) {
        let fields = headers::register_fields(&tx.lines);
        if fields.expires == 0 {
            self.registrar.deregister(&fields.aor);
            self.send_response(tx, "200 Everything is fine").await;
            return;
        }

        info!("From: {} - Contact: {}", fields.aor, fields.contact);
        debug!("Client address: {}", tx.client);
        debug!("Expires= {}", fields.expires);

        let expires_at = Registrar::now().saturating_add(fields.expires);
        self.registrar.register(&fields.aor, &fields.contact, Arc::clone(tx.socket), tx.client, expires_at);
        self.registrar.debug_dump();
        self.send_response(tx, "200 Everything is fine").await;
    }

    /// Forwardable request with the origin gate: the From AOR must be
    /// registered, the To AOR must resolve to a live binding. The reject
    /// status for an unreachable destination is method-dependent (480 for
    /// INVITE, 406 otherwise).
    async fn process_with_origin_check(&self, tx: &mut Transaction<'_>, unavailable: &str) {
        let origin = headers::get_origin(&tx.lines).unwrap_or_default();
        if origin.is_empty() || !self.registrar.contains(&origin) {
            self.send_response(tx, "400 Bad Request").await;
            return;
        }

        let destination = headers::get_destination(&tx.lines).unwrap_or_default();
        if destination.is_empty() {
            self.send_response(tx, "500 Server Internal Error").await;
            return;
        }
        info!("destination {}", destination);

        match self.registrar.lookup(&destination) {
            Some(binding) => self.forward_request(tx, &binding).await,
            None => self.send_response(tx, unavailable).await,
        }
    }

    /// ACK is hop-by-hop and must never provoke a response: no origin
    /// gate, and an unresolvable destination drops it silently.
    async fn process_ack(&self, tx: &mut Transaction<'_>) {
        let destination = headers::get_destination(&tx.lines).unwrap_or_default();
        if destination.is_empty() {
            return;
        }
        info!("destination {}", destination);
        if let Some(binding) = self.registrar.lookup(&destination) {
            self.forward_request(tx, &binding).await;
        }
    }

    /// Push our Via, strip Route, insert Record-Route right after the
    /// request-line, and relay through the destination's own transport.
    async fn forward_request(&self, tx: &mut Transaction<'_>, binding: &Binding) {
        tx.lines = via::add_top_via(&tx.lines, self.identity.top_via(), tx.client);
        let mut lines = via::remove_route(&tx.lines);
        lines.insert(1, self.identity.record_route().to_string());
        self.transmit(&lines, &binding.handle, binding.addr).await;
    }

    /// Responses are routed by their From AOR alone: strip Route, pop our
    /// Via, relay toward the originator. Unknown origins are dropped.
    async fn forward_response(&self, tx: &mut Transaction<'_>) {
        let origin = headers::get_origin(&tx.lines).unwrap_or_default();
        if origin.is_empty() {
            return;
        }
        debug!("origin {}", origin);
        let binding = match self.registrar.lookup(&origin) {
            Some(binding) => binding,
            None => return,
        };
        let lines = via::remove_route(&tx.lines);
        let lines = via::remove_top_via(&lines, self.identity.top_via());
        self.transmit(&lines, &binding.handle, binding.addr).await;
    }

    /// Reply to the client directly with `SIP/2.0 <status>`, echoing its
    /// headers: the first tagless To gains `;tag=123456`, every Via is
    /// annotated with `received`/`rport`, Content-Length becomes zero, and
    /// the body is dropped.
    async fn send_response(&self, tx: &mut Transaction<'_>, status: &str) {
        let mut data = Vec::with_capacity(tx.lines.len() + 1);
        data.push(format!("SIP/2.0 {}", status));

        let mut tagged = false;
        for line in tx.lines.iter().skip(1) {
            if line.is_empty() {
                // header/body boundary: the body is not echoed
                data.push(String::new());
                break;
            }
            if headers::is_to(line) && !tagged && !headers::has_tag(line) {
                data.push(format!("{};tag=123456", line));
                tagged = true;
            } else if headers::is_via(line) {
                data.push(via::annotate_received(line, tx.client));
            } else if line.starts_with("Content-Length:") {
                data.push("Content-Length: 0".to_string());
            } else if line.starts_with("l:") {
                data.push("l: 0".to_string());
            } else {
                data.push(line.clone());
            }
        }
        data.push(String::new());

        self.transmit(&data, tx.socket, tx.client).await;
    }

    async fn transmit(&self, lines: &[String], socket: &Arc<UdpSocket>, target: SocketAddr) {
        let text = message::encode(lines);
        match socket.send_to(text.as_bytes(), target).await {
            Ok(_) => {
                info!("<<< {}", lines[0]);
                debug!("---\n<< server send [{}]:\n{}\n---", text.len(), text);
            }
            Err(e) => warn!("failed to send to {}: {}", target, e),
        }
    }

    /// Non-SIP datagram: hex-dump anything longer than 4 bytes at warning
    /// level, ignore the rest.
    fn reject_non_sip(&self, payload: &[u8]) {
        if payload.len() <= 4 {
            return;
        }
        warn!("---\n>> server received [{}]:", payload.len());
        for row in hexdump(payload, 16) {
            warn!("{}", row);
        }
        warn!("---");
    }
}

/// Render `data` as rows of `width` hex bytes followed by their printable
/// form, short rows padded with NULs.
fn hexdump(data: &[u8], width: usize) -> Vec<String> {
    data.chunks(width)
        .map(|chunk| {
            let mut padded = chunk.to_vec();
            padded.resize(width, 0);
            let hex: Vec<String> = padded.iter().map(|b| format!("{:02x}", b)).collect();
            let printable: String = padded
                .iter()
                .map(|&b| if b.is_ascii_alphanumeric() { b as char } else { '.' })
                .collect();
            format!("{} {}", hex.join(" "), printable)
        })
        .collect()
}
