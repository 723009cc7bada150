use crate::udp;

/// The errors which can be returned when parsing, formatting, or
/// sending SSDP messages
///
/// Parse errors (`InvalidData`, `InvalidMethod`, `InvalidHeaderToken`,
/// `InvalidHeader`) mean a received datagram was malformed: the
/// caller should drop it and carry on. Formatting errors mean an
/// outgoing message would have been protocol-invalid, so it was not
/// sent.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The payload was not valid UTF-8 text
    #[error("invalid data")]
    InvalidData,

    /// The start line was malformed, or named a method other than
    /// NOTIFY or M-SEARCH
    #[error("invalid method")]
    InvalidMethod,

    /// An M-SEARCH did not carry `MAN: "ssdp:discover"`
    #[error("invalid header token")]
    InvalidHeaderToken,

    /// A received header line had no name, or no colon; or an
    /// outgoing header would not have fitted on one line
    #[error("invalid header")]
    InvalidHeader,

    /// A NOTIFY message was formatted without an NTS header
    #[error("NTS header missing")]
    MissingNts,

    /// A message was formatted without its type having been set
    #[error("invalid message type")]
    InvalidMessageType,

    /// A formatted message did not fit in the buffer provided
    #[error("buffer too small")]
    BufferTooSmall,

    /// An M-SEARCH was requested for a target that cannot be sent
    /// as a general search
    #[error("invalid M-SEARCH target")]
    InvalidSearchTarget,

    /// The transport failed to send a message
    #[error("transport error")]
    Transport(#[from] udp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_parse_errors() {
        assert_eq!(format!("{}", Error::InvalidMethod), "invalid method");
        assert_eq!(
            format!("{}", Error::InvalidHeaderToken),
            "invalid header token"
        );
        assert_eq!(format!("{}", Error::MissingNts), "NTS header missing");
    }

    #[test]
    fn debug_error() {
        let e = format!("{:?}", Error::InvalidData);
        assert_eq!(e, "InvalidData".to_string());
    }

    #[test]
    fn transport_error_has_source() {
        let e = Error::from(udp::Error::Syscall(
            udp::Syscall::Sendto,
            std::io::Error::new(std::io::ErrorKind::Other, "injected"),
        ));
        assert_eq!(format!("{e}"), "transport error");
        assert!(e.source().is_some());
    }
}
