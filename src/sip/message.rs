//! SIP message codec
//!
//! A message is kept as the ordered line sequence of the datagram: element 0
//! is the start-line, the first empty element marks the header/body boundary.
//! Reference: RFC 3261 §7 - SIP messages

use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// SIP methods as defined in RFC 3261 and extensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Method {
    #[strum(serialize = "REGISTER")]
    Register,
    #[strum(serialize = "INVITE")]
    Invite,
    #[strum(serialize = "ACK")]
    Ack,
    #[strum(serialize = "BYE")]
    Bye,
    #[strum(serialize = "CANCEL")]
    Cancel,
    #[strum(serialize = "OPTIONS")]
    Options,
    /// RFC 6086
    #[strum(serialize = "INFO")]
    Info,
    /// RFC 3428
    #[strum(serialize = "MESSAGE")]
    Message,
    /// RFC 3515
    #[strum(serialize = "REFER")]
    Refer,
    /// RFC 3262
    #[strum(serialize = "PRACK")]
    Prack,
    /// RFC 3311
    #[strum(serialize = "UPDATE")]
    Update,
    /// RFC 6665
    #[strum(serialize = "SUBSCRIBE")]
    Subscribe,
    /// RFC 3903
    #[strum(serialize = "PUBLISH")]
    Publish,
    /// RFC 6665
    #[strum(serialize = "NOTIFY")]
    Notify,
    #[strum(default)]
    Unknown(String),
}

/// Classification of a datagram's first line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    /// Request-line `METHOD sip:TARGET SIP/2.0`
    Request(Method),
    /// Status-line `SIP/2.0 CODE REASON`
    Response { code: String },
    /// Neither grammar - the datagram is not SIP
    Invalid,
}

impl StartLine {
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix("SIP/2.0 ") {
            let code = rest.split(' ').next().unwrap_or("").to_string();
            return StartLine::Response { code };
        }

        let mut parts = line.splitn(3, ' ');
        let (method, uri, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(u), Some(v)) => (m, u, v),
            _ => return StartLine::Invalid,
        };
        if !uri.starts_with("sip:") || !version.starts_with("SIP/2.0") {
            return StartLine::Invalid;
        }
        StartLine::Request(Method::from_str(method).unwrap_or_else(|_| Method::Unknown(method.to_string())))
    }
}

/// Split a UDP payload into its CRLF-separated lines.
///
/// Empty separators are preserved so the header/body boundary survives.
/// Returns `None` for payloads that are not UTF-8; those are treated as
/// non-SIP by the dispatcher.
pub fn decode(payload: &[u8]) -> Option<Vec<String>> {
    let text = std::str::from_utf8(payload).ok()?;
    Some(text.split("\r\n").map(str::to_string).collect())
}

/// Join a line sequence back into wire text.
///
/// When the final element is non-empty a trailing CRLF is appended, so the
/// output always ends with a line terminator. `decode(encode(x))` preserves
/// the sequence modulo one optional trailing empty element.
pub fn encode(lines: &[String]) -> String {
    let mut text = lines.join("\r\n");
    if lines.last().map_or(true, |l| !l.is_empty()) {
        text.push_str("\r\n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_preserves_lines_and_boundary() {
        let lines = decode(b"INVITE sip:bob@example.com SIP/2.0\r\nTo: <sip:bob@example.com>\r\n\r\n").unwrap();
        assert_eq!(
            lines,
            vec![
                "INVITE sip:bob@example.com SIP/2.0",
                "To: <sip:bob@example.com>",
                "",
                "",
            ]
        );
    }

    #[test]
    fn test_decode_keeps_body_lines() {
        let lines = decode(b"INVITE sip:b@h SIP/2.0\r\n\r\nv=0\r\no=- 1 1 IN IP4 10.0.0.1\r\n").unwrap();
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "v=0");
        assert_eq!(lines[3], "o=- 1 1 IN IP4 10.0.0.1");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(decode(&[0x49, 0x4e, 0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_encode_reproduces_wire_text() {
        let payload = b"REGISTER sip:proxy SIP/2.0\r\nTo: <sip:alice@example.com>\r\n\r\n";
        let lines = decode(payload).unwrap();
        assert_eq!(encode(&lines).as_bytes(), payload);
    }

    #[test]
    fn test_encode_terminates_unterminated_message() {
        let lines = vec!["SIP/2.0 200 OK".to_string(), "To: <sip:a@b>".to_string()];
        assert_eq!(encode(&lines), "SIP/2.0 200 OK\r\nTo: <sip:a@b>\r\n");
    }

    #[test]
    fn test_round_trip_modulo_trailing_empty() {
        let lines = vec!["SIP/2.0 200 OK".to_string(), "Via: SIP/2.0/UDP 10.0.0.1".to_string()];
        let round = decode(encode(&lines).as_bytes()).unwrap();
        assert_eq!(&round[..lines.len()], &lines[..]);
        assert!(round.len() <= lines.len() + 1);
    }

    #[test]
    fn test_start_line_requests() {
        assert_eq!(
            StartLine::parse("REGISTER sip:proxy SIP/2.0"),
            StartLine::Request(Method::Register)
        );
        assert_eq!(
            StartLine::parse("INVITE sip:bob@example.com SIP/2.0"),
            StartLine::Request(Method::Invite)
        );
        assert_eq!(StartLine::parse("ACK sip:bob@example.com SIP/2.0"), StartLine::Request(Method::Ack));
    }

    #[test]
    fn test_start_line_unknown_method_is_still_a_request() {
        assert_eq!(
            StartLine::parse("WIBBLE sip:bob@example.com SIP/2.0"),
            StartLine::Request(Method::Unknown("WIBBLE".to_string()))
        );
    }

    #[test]
    fn test_start_line_response() {
        assert_eq!(
            StartLine::parse("SIP/2.0 200 OK"),
            StartLine::Response { code: "200".to_string() }
        );
        assert_eq!(
            StartLine::parse("SIP/2.0 480 Temporarily Unavailable"),
            StartLine::Response { code: "480".to_string() }
        );
    }

    #[test]
    fn test_start_line_rejects_non_sip() {
        assert_eq!(StartLine::parse(""), StartLine::Invalid);
        assert_eq!(StartLine::parse("GET / HTTP/1.1"), StartLine::Invalid);
        assert_eq!(StartLine::parse("INVITE bob SIP/2.0"), StartLine::Invalid);
        assert_eq!(StartLine::parse("hello"), StartLine::Invalid);
    }

    #[test]
    fn test_method_display_round_trip() {
        assert_eq!(Method::Invite.to_string(), "INVITE");
        assert_eq!("BYE".parse::<Method>().unwrap(), Method::Bye);
        assert_eq!(
            "WIBBLE".parse::<Method>().unwrap(),
            Method::Unknown("WIBBLE".to_string())
        );
    }
}
