use crate::types::{MessageType, NotifySubtype, SearchMatch, SearchTarget};
use std::net::SocketAddr;

/// An opaque token identifying whoever asked for a message to be sent
///
/// The queue never interprets an `Owner`; it only compares them, so
/// that all pending messages for (say) one device can be cancelled
/// together with [`crate::MessageQueue::remove`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Owner(pub u64);

/// A template for an outgoing message, not yet sent
///
/// A `MessageSpec` says *what* should be sent, and to whom; the
/// message itself is only built, from the spec, when it falls due.
///
/// Two specs are equal if they would produce the same message: the
/// repeat count is deliberately not compared, so that
/// [`crate::MessageQueue::contains`] spots a pending announcement
/// however many repeats it has left.
#[derive(Debug, Clone, Copy)]
pub struct MessageSpec {
    /// Who asked for this message
    pub owner: Owner,

    /// Where the message goes
    pub destination: SocketAddr,

    /// Which kind of message
    pub message_type: MessageType,

    /// For NOTIFY messages, which subtype
    pub notify_subtype: NotifySubtype,

    /// For M-SEARCH messages, what to search for
    pub target: SearchTarget,

    /// For responses, what the original search matched
    pub search_match: SearchMatch,

    /// How many more times to send the message after this time
    pub repeat: u8,
}

impl MessageSpec {
    /// A template for a message of the given type
    #[must_use]
    pub fn new(
        message_type: MessageType,
        owner: Owner,
        destination: SocketAddr,
    ) -> Self {
        Self {
            owner,
            destination,
            message_type,
            notify_subtype: NotifySubtype::default(),
            target: SearchTarget::default(),
            search_match: SearchMatch::default(),
            repeat: 0,
        }
    }

    /// A NOTIFY of the given subtype
    #[must_use]
    pub fn notify(
        subtype: NotifySubtype,
        owner: Owner,
        destination: SocketAddr,
    ) -> Self {
        Self {
            notify_subtype: subtype,
            ..Self::new(MessageType::Notify, owner, destination)
        }
    }

    /// An M-SEARCH for the given target
    ///
    /// Searches always go to the multicast group, whatever
    /// `destination` says; see [`crate::Engine::build_message`].
    #[must_use]
    pub fn search(
        target: SearchTarget,
        owner: Owner,
        destination: SocketAddr,
    ) -> Self {
        Self {
            target,
            ..Self::new(MessageType::MSearch, owner, destination)
        }
    }

    /// A response to a search from `destination`
    #[must_use]
    pub fn response(
        search_match: SearchMatch,
        owner: Owner,
        destination: SocketAddr,
    ) -> Self {
        Self {
            search_match,
            ..Self::new(MessageType::Response, owner, destination)
        }
    }

    /// The same spec, sent `repeat` more times after the first
    #[must_use]
    pub const fn with_repeat(mut self, repeat: u8) -> Self {
        self.repeat = repeat;
        self
    }
}

impl PartialEq for MessageSpec {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.destination == other.destination
            && self.message_type == other.message_type
            && self.notify_subtype == other.notify_subtype
            && self.target == other.target
            && self.search_match == other.search_match
    }
}

impl Eq for MessageSpec {}
