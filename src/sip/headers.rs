//! Header accessors
//!
//! Line-oriented extraction of the handful of headers the proxy acts on:
//! From / To / Contact / Via / Expires / Content-Length. Matching is
//! case-sensitive on the canonical casing common user agents emit, plus the
//! RFC 3261 compact forms (`f:`, `t:`, `v:`, `m:`, `l:`).

/// Fields of a REGISTER request relevant to the registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFields {
    /// Address-of-record from the To header (`user@host`)
    pub aor: String,
    /// Contact URI host, `host[:port]`
    pub contact: String,
    /// Requested binding lifetime in seconds; 0 when absent or unparsable
    pub expires: u64,
}

pub fn is_from(line: &str) -> bool {
    line.starts_with("From:") || line.starts_with("f:")
}

pub fn is_to(line: &str) -> bool {
    line.starts_with("To:") || line.starts_with("t:")
}

pub fn is_via(line: &str) -> bool {
    line.starts_with("Via:") || line.starts_with("v:")
}

pub fn is_contact(line: &str) -> bool {
    line.starts_with("Contact:") || line.starts_with("m:")
}

/// `user` and `host` of the first `sip:user@host` URI in the line.
/// The host part runs until `;`, `>`, `$`, or end of line.
fn uri_parts(line: &str) -> Option<(&str, &str)> {
    let start = line.find("sip:")? + 4;
    let rest = &line[start..];
    let at = rest.find('@')?;
    let user = &rest[..at];
    let host_rest = &rest[at + 1..];
    let host_end = host_rest
        .find(|c| c == ';' || c == '>' || c == '$')
        .unwrap_or(host_rest.len());
    Some((user, &host_rest[..host_end]))
}

/// Address-of-record `user@host` of the first SIP URI in the line.
pub fn aor_in(line: &str) -> Option<String> {
    uri_parts(line).map(|(user, host)| format!("{}@{}", user, host))
}

/// Bare host of a user-less `sip:host` URI, delimited by space, `;`, `>`,
/// or `$`.
pub fn host_in(line: &str) -> Option<String> {
    let start = line.find("sip:")? + 4;
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c == ' ' || c == ';' || c == '>' || c == '$')
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// AOR of the first From header, if any.
pub fn get_origin(lines: &[String]) -> Option<String> {
    lines.iter().find(|l| is_from(l)).and_then(|l| aor_in(l))
}

/// AOR of the first To header, if any.
pub fn get_destination(lines: &[String]) -> Option<String> {
    lines.iter().find(|l| is_to(l)).and_then(|l| aor_in(l))
}

/// Scan every header line of a REGISTER for the registrar-relevant fields.
///
/// The Contact URI host falls back to `sip:HOST` when the URI has no user
/// part. An `expires=N` parameter on the Contact wins over a top-level
/// `Expires: N` header.
pub fn register_fields(lines: &[String]) -> RegisterFields {
    let mut aor = String::new();
    let mut contact = String::new();
    let mut contact_expires: Option<u64> = None;
    let mut header_expires: Option<u64> = None;

    for line in lines {
        if is_to(line) {
            if let Some(found) = aor_in(line) {
                aor = found;
            }
        }
        if is_contact(line) {
            if let Some((_, host)) = uri_parts(line) {
                contact = host.to_string();
            } else if let Some(host) = host_in(line) {
                contact = host;
            }
            if let Some(pos) = line.find("expires=") {
                let value = &line[pos + 8..];
                let end = value.find(|c| c == ';' || c == '$').unwrap_or(value.len());
                contact_expires = value[..end].trim().parse().ok();
            }
        }
        if let Some(value) = line.strip_prefix("Expires: ") {
            header_expires = value.trim().parse().ok();
        }
    }

    RegisterFields {
        aor,
        contact,
        expires: contact_expires.or(header_expires).unwrap_or(0),
    }
}

/// Value of the `;branch=` parameter of a Via, up to the next `;`.
pub fn extract_branch(line: &str) -> Option<&str> {
    let pos = line.find(";branch=")? + 8;
    let rest = &line[pos..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Whether a Via carries a bare `;rport` (no value), i.e. the client asked
/// for its source port to be echoed back.
pub fn has_rport(line: &str) -> bool {
    line.ends_with(";rport") || line.contains(";rport;")
}

/// Whether a To header already carries a `;tag`.
pub fn has_tag(line: &str) -> bool {
    line.contains(";tag")
}
