use crate::headers::Headers;
use crate::types::{MessageType, NotifySubtype, SSDP_MAN_DISCOVER};
use crate::Error;
use core::fmt::Write;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tracing::{trace, warn};

/// A single SSDP datagram, either received or about to be sent
///
/// SSDP messages look like HTTP requests (NOTIFY, M-SEARCH) or
/// responses (to M-SEARCH), always without a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Which kind of message this is; `None` until set
    pub message_type: Option<MessageType>,

    /// The message headers, in order
    pub headers: Headers,

    /// Where a received message came from, or where an outgoing one
    /// is going
    pub remote: SocketAddr,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            message_type: None,
            headers: Headers::new(),
            remote: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
        }
    }
}

impl Message {
    /// Create a message of a given type, with no headers yet
    #[must_use]
    pub fn new(message_type: MessageType, remote: SocketAddr) -> Self {
        Self {
            message_type: Some(message_type),
            headers: Headers::new(),
            remote,
        }
    }

    /// Look up a header value by (case-insensitive) name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Set a header, replacing any existing value
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// The subtype of a NOTIFY message, from its NTS header
    #[must_use]
    pub fn notify_subtype(&self) -> Option<NotifySubtype> {
        self.get("NTS").map(NotifySubtype::from_nts)
    }

    /// The maximum response delay requested by an M-SEARCH, from its
    /// MX header
    #[must_use]
    pub fn maximum_wait_sec(&self) -> Option<u8> {
        self.get("MX").and_then(|mx| mx.parse::<u8>().ok())
    }
}

/// The length of the actual text in a received datagram
///
/// Some senders pad their datagrams with NULs well beyond the end of
/// the text (an Echo Dot sends a 101-character query in a 1024-byte
/// datagram), so the text ends at the first NUL, if there is one.
#[must_use]
pub fn payload_len(buf: &[u8]) -> usize {
    buf.iter().position(|&b| b == 0).unwrap_or(buf.len())
}

/// Classify the first line of a message
fn parse_start_line(line: &str) -> Result<MessageType, Error> {
    let mut parts = line.splitn(3, ' ');
    let first = parts.next().unwrap_or_default();
    let second = parts.next().ok_or(Error::InvalidMethod)?;

    if first.starts_with("HTTP/") {
        // HTTP/1.1 200 OK (the reason phrase is optional)
        if second.len() != 3 || !second.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidMethod);
        }
        return Ok(MessageType::Response);
    }

    // NOTIFY * HTTP/1.1
    let third = parts.next().ok_or(Error::InvalidMethod)?;
    if second.is_empty() || !third.starts_with("HTTP/") {
        return Err(Error::InvalidMethod);
    }
    match first {
        "M-SEARCH" => Ok(MessageType::MSearch),
        "NOTIFY" => Ok(MessageType::Notify),
        _ => Err(Error::InvalidMethod),
    }
}

/// Parse the header lines which follow the start line, up to the
/// blank line which ends them (or the end of the text)
fn parse_headers<'a>(
    lines: impl Iterator<Item = &'a str>,
    headers: &mut Headers,
) -> Result<(), Error> {
    let mut last: Option<(&str, String)> = None;
    for line in lines {
        if line.is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            // Folded continuation of the previous header
            let (_, value) = last.as_mut().ok_or(Error::InvalidHeader)?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeader)?;
        if name.is_empty() || name.contains(|c: char| c.is_whitespace()) {
            return Err(Error::InvalidHeader);
        }
        if let Some((n, v)) = last.replace((name, value.trim().to_string())) {
            headers.append(n, v);
        }
    }
    if let Some((n, v)) = last {
        headers.append(n, v);
    }
    Ok(())
}

/// Parse a received datagram
///
/// Returns `Ok(None)` if there is nothing to parse (an empty, or
/// all-NUL, datagram), which callers should silently ignore. Trailing
/// NUL padding is ignored.
///
/// # Errors
///
/// Returns `Err` if the text is not UTF-8, if the start line is not a
/// response or a NOTIFY or M-SEARCH request, if a header line is
/// malformed, or if an M-SEARCH lacks the mandatory
/// `MAN: "ssdp:discover"` header.
///
pub fn parse(
    buf: &[u8],
    remote: SocketAddr,
) -> Result<Option<Message>, Error> {
    let buf = &buf[..payload_len(buf)];
    if buf.is_empty() {
        return Ok(None);
    }

    let packet = core::str::from_utf8(buf).map_err(|_| Error::InvalidData)?;
    let mut lines = packet.lines();
    let start = lines.next().ok_or(Error::InvalidMethod)?;
    let message_type = parse_start_line(start)?;

    let mut message = Message::new(message_type, remote);
    parse_headers(lines, &mut message.headers)?;

    if message_type == MessageType::MSearch {
        let man = message.get("MAN");
        if man != Some(SSDP_MAN_DISCOVER) {
            warn!("MAN field wrong ({})", man.unwrap_or("(null)"));
            return Err(Error::InvalidHeaderToken);
        }
    }

    Ok(Some(message))
}

/// A replacement for Cursor that works with `core::fmt::Write`
struct MessageCursor<'a> {
    buf: &'a mut [u8],
    offset: usize,
}

impl<'a> MessageCursor<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        MessageCursor { buf, offset: 0 }
    }

    const fn position(&self) -> usize {
        self.offset
    }
}

impl core::fmt::Write for MessageCursor<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let n = s.len();
        if n + self.offset > self.buf.len() {
            return Err(core::fmt::Error);
        }
        self.buf[self.offset..self.offset + n].copy_from_slice(s.as_bytes());
        self.offset += n;
        Ok(())
    }
}

/// Whether a header can be written as a single line that parses back
/// to the same name and value
fn is_header_safe(name: &str, value: &str) -> bool {
    !name.is_empty()
        && !name.contains(|c: char| c == ':' || c.is_whitespace())
        && !value.contains(['\r', '\n'])
}

fn write_message<W: Write>(w: &mut W, msg: &Message) -> Result<(), Error> {
    let start = match msg.message_type {
        Some(MessageType::Response) => "HTTP/1.1 200 OK\r\n",
        Some(MessageType::Notify) => {
            if !msg.headers.contains("NTS") {
                warn!("NTS field missing");
                return Err(Error::MissingNts);
            }
            "NOTIFY * HTTP/1.1\r\n"
        }
        Some(MessageType::MSearch) => "M-SEARCH * HTTP/1.1\r\n",
        None => {
            warn!("bad message type");
            return Err(Error::InvalidMessageType);
        }
    };

    let overflow = |_| Error::BufferTooSmall;
    w.write_str(start).map_err(overflow)?;
    for (name, value) in &msg.headers {
        if !is_header_safe(name, value) {
            warn!("refusing to send header {:?}", name);
            return Err(Error::InvalidHeader);
        }
        write!(w, "{name}: {value}\r\n").map_err(overflow)?;
    }
    w.write_str("\r\n").map_err(overflow)?;
    Ok(())
}

/// Format a message as the text of a datagram
///
/// # Errors
///
/// Returns `Err` if the message type is unset, if it is a NOTIFY
/// without an NTS header, or if a header name or value would break
/// the line structure; such messages are not valid SSDP.
///
pub fn format(msg: &Message) -> Result<String, Error> {
    let mut s = String::with_capacity(512);
    write_message(&mut s, msg)?;
    trace!("TX {}\n{}", msg.remote, s);
    Ok(s)
}

/// Format a message directly into a datagram buffer
///
/// Returns the number of bytes used.
///
/// # Errors
///
/// As for [`format`], and also if the buffer is too small.
///
pub fn format_into(buf: &mut [u8], msg: &Message) -> Result<usize, Error> {
    let mut cursor = MessageCursor::new(buf);
    write_message(&mut cursor, msg)?;
    Ok(cursor.position())
}
