//! The protocol engine of SSDP, the Simple Service Discovery Protocol
//!
//! SSDP is how UPnP devices advertise themselves, and how control
//! points find them: text messages, shaped like HTTP requests and
//! responses, sent over UDP to the multicast group 239.255.255.250
//! port 1900 (or unicast back to a searcher).
//!
//! The ssdp-engine crate contains the parts of an SSDP implementation
//! which are independent of any particular socket library or event
//! loop:
//!
//!  - [`Urn`], the grammar of UPnP unique service names and
//!    resource types (`uuid:...::urn:schemas-upnp-org:device:Basic:1`
//!    and friends);
//!
//!  - [`message`], which turns a received datagram into a typed
//!    [`Message`] and back again;
//!
//!  - [`MessageQueue`], a time-ordered queue of pending outgoing
//!    messages ([`MessageSpec`]) driven by a single one-shot timer;
//!
//!  - [`Engine`], which ties those together: received datagrams go
//!    through the parser to a [`Callback`], and due queue entries are
//!    built into messages, completed by the callback, formatted, and
//!    handed to a transport.
//!
//! The transport and the timer are supplied by the owner, via the
//! traits in [`udp`] and [`timer`]. With the `async` feature, the
//! crate also provides [`AsyncService`], which binds everything to a
//! Tokio UDP socket and Tokio timers.
//!
//! The engine is single-threaded: every operation runs to completion
//! before the next begins, so nothing in it needs locking. Owners
//! which share an engine between threads must serialise access to it
//! (as [`AsyncService`] does, with a mutex).

#![warn(rustdoc::missing_crate_level_docs)]

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

mod error;
pub use error::Error;

/// Parsing and formatting SSDP messages
pub mod message;
pub use message::Message;

/// Ordered, case-insensitive storage of message headers
pub mod headers;
pub use headers::Headers;

/// Enumerations of message types, notification subtypes, and search
/// targets, and their wire strings
pub mod types;
pub use types::{MessageType, NotifySubtype, SearchMatch, SearchTarget};

/// UPnP unique service names and resource types
pub mod urn;
pub use urn::{Urn, UrnKind};

/// Templates for pending outgoing messages
pub mod message_spec;
pub use message_spec::{MessageSpec, Owner};

/// The clock and one-shot timer needed by the message queue
pub mod timer;
pub use timer::Timer;

/// The queue of pending outgoing messages
pub mod queue;
pub use queue::MessageQueue;

/// Composing the codec and the queue into a working SSDP endpoint
pub mod engine;
pub use engine::{Callback, Engine, EngineConfig};

/// Traits abstracting over UDP socket types
pub mod udp;

#[cfg(feature = "async")]
mod async_service;

#[cfg(feature = "async")]
pub use async_service::{AsyncService, TokioTimer};

/// The SSDP multicast group
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// The SSDP port, both for the multicast group and for listening
pub const SSDP_PORT: u16 = 1900;

/// The SSDP multicast group and port, as a destination address
#[must_use]
pub const fn multicast_dest() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicast_dest_is_well_known() {
        assert_eq!(
            multicast_dest().to_string(),
            "239.255.255.250:1900".to_string()
        );
    }
}
