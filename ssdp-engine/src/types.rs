use crate::urn::{Urn, UrnKind};
use core::fmt;

/// The value of the MAN header required in every M-SEARCH
pub const SSDP_MAN_DISCOVER: &str = "\"ssdp:discover\"";

/// The notification type, and search target, for root devices
pub const UPNP_ROOTDEVICE: &str = "upnp:rootdevice";

/// The search target matching everything
pub const SSDP_ALL: &str = "ssdp:all";

/// The three kinds of SSDP message
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Announcement: `NOTIFY * HTTP/1.1`
    Notify,
    /// Search request: `M-SEARCH * HTTP/1.1`
    MSearch,
    /// Reply to a search: `HTTP/1.1 200 OK`
    Response,
}

impl MessageType {
    /// A short name, for logging
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::MSearch => "msearch",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subtype of a NOTIFY message, carried in its NTS header
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum NotifySubtype {
    /// `ssdp:alive`: the resource is available
    #[default]
    Alive,
    /// `ssdp:byebye`: the resource is going away
    ByeBye,
    /// `ssdp:update`: the resource's boot or config id changed
    Update,
    /// `upnp:propchange`: a GENA event
    Event,
    /// Anything else
    Other,
}

impl NotifySubtype {
    const ALL: [Self; 4] =
        [Self::Alive, Self::ByeBye, Self::Update, Self::Event];

    /// The NTS header value for this subtype
    ///
    /// `Other` has no wire form, and yields the empty string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alive => "ssdp:alive",
            Self::ByeBye => "ssdp:byebye",
            Self::Update => "ssdp:update",
            Self::Event => "upnp:propchange",
            Self::Other => "",
        }
    }

    /// Look up the subtype named by an NTS header value
    #[must_use]
    pub fn from_nts(nts: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == nts)
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for NotifySubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an M-SEARCH is looking for
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SearchTarget {
    /// Root devices only: `upnp:rootdevice`
    #[default]
    Root,
    /// A device or service type:
    /// `urn:{domain}:device:{type}:{v}` or
    /// `urn:{domain}:service:{type}:{v}`
    Type,
    /// One particular device: `uuid:{uuid}`
    Uuid,
    /// All devices and services: `ssdp:all`
    All,
}

impl SearchTarget {
    /// A short name, for logging
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Type => "type",
            Self::Uuid => "uuid",
            Self::All => "all",
        }
    }

    /// Classify the ST header of an incoming M-SEARCH
    ///
    /// Returns `None` if the value is none of the recognised forms.
    /// This only says which *kind* of search it is; deciding which
    /// local resources it matches is up to the owner of those
    /// resources.
    #[must_use]
    pub fn classify(st: &str) -> Option<Self> {
        if st == SSDP_ALL {
            return Some(Self::All);
        }
        let urn = Urn::parse(st);
        match urn.kind() {
            UrnKind::Root if urn.uuid.is_empty() => Some(Self::Root),
            UrnKind::Uuid => Some(Self::Uuid),
            UrnKind::Device | UrnKind::Service if urn.uuid.is_empty() => {
                Some(Self::Type)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of match found when checking an incoming search against
/// a local resource
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SearchMatch {
    /// Matched a root device
    #[default]
    Root,
    /// Matched a device UUID
    Uuid,
    /// Matched a device or service type
    Type,
}

impl SearchMatch {
    /// A short name, for logging
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Uuid => "uuid",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for SearchMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nts_strings() {
        assert_eq!(NotifySubtype::Alive.as_str(), "ssdp:alive");
        assert_eq!(NotifySubtype::ByeBye.as_str(), "ssdp:byebye");
        assert_eq!(NotifySubtype::Update.as_str(), "ssdp:update");
        assert_eq!(NotifySubtype::Event.as_str(), "upnp:propchange");
        assert_eq!(format!("{}", NotifySubtype::Alive), "ssdp:alive");
    }

    #[test]
    fn nts_lookup() {
        assert_eq!(
            NotifySubtype::from_nts("ssdp:byebye"),
            NotifySubtype::ByeBye
        );
        assert_eq!(
            NotifySubtype::from_nts("upnp:propchange"),
            NotifySubtype::Event
        );
        assert_eq!(NotifySubtype::from_nts("potato"), NotifySubtype::Other);
        assert_eq!(NotifySubtype::from_nts(""), NotifySubtype::Other);
    }

    #[test]
    fn display_names() {
        assert_eq!(MessageType::MSearch.to_string(), "msearch");
        assert_eq!(SearchTarget::All.to_string(), "all");
        assert_eq!(SearchMatch::Uuid.to_string(), "uuid");
    }

    #[test]
    fn classify_targets() {
        assert_eq!(SearchTarget::classify("ssdp:all"), Some(SearchTarget::All));
        assert_eq!(
            SearchTarget::classify("upnp:rootdevice"),
            Some(SearchTarget::Root)
        );
        assert_eq!(
            SearchTarget::classify("uuid:2fac1234-31f8-11b4-a222-08002b34c003"),
            Some(SearchTarget::Uuid)
        );
        assert_eq!(
            SearchTarget::classify(
                "urn:schemas-upnp-org:service:ContentDirectory:1"
            ),
            Some(SearchTarget::Type)
        );
        assert_eq!(SearchTarget::classify("fnord"), None);
        assert_eq!(SearchTarget::classify("uuid:37::upnp:rootdevice"), None);
    }
}
