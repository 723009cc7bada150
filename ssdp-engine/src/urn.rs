use core::fmt;
use core::str::FromStr;

use crate::types::UPNP_ROOTDEVICE;

/// Which of the UPnP identifier forms a [`Urn`] takes
///
/// ```text
///  None     (invalid)
///  Uuid     uuid:{uuid}
///  Root                  upnp:rootdevice
///           uuid:{uuid}::upnp:rootdevice
///  Device                urn:{domain}:device:{type}:{version}
///           uuid:{uuid}::urn:{domain}:device:{type}:{version}
///  Service               urn:{domain}:service:{type}:{version}
///           uuid:{uuid}::urn:{domain}:service:{type}:{version}
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum UrnKind {
    /// Not a valid identifier
    #[default]
    None,
    /// A bare device UUID
    Uuid,
    /// A root device
    Root,
    /// A device type
    Device,
    /// A service type
    Service,
}

impl UrnKind {
    /// A short name, for logging
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Uuid => "uuid",
            Self::Root => "root",
            Self::Device => "device",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for UrnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A UPnP identifier: either a Unique Service Name (USN, which
/// includes a device UUID) or a resource type (NT/ST, which
/// usually doesn't)
///
/// Used both as the value of NT, ST and USN headers, and as the key
/// identifying a device or service.
///
/// The fields other than `kind` are only meaningful when the kind
/// calls for them: `uuid` for anything with a `uuid:` prefix, and
/// `domain`, `type_name` and `version` for devices and services.
/// Equality follows the same rule, so two root-device URNs are always
/// equal, and two device URNs are equal only if all four fields are.
#[derive(Debug, Clone, Default)]
pub struct Urn {
    kind: UrnKind,
    /// Device UUID, empty if absent
    pub uuid: String,
    /// e.g. "schemas-upnp-org"
    pub domain: String,
    /// e.g. "Basic"
    pub type_name: String,
    /// e.g. 1
    pub version: u32,
}

/// A string could not be parsed as a [`Urn`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid URN")]
pub struct UrnParseError;

/// Split off the text before the next colon
fn next_segment(s: &str) -> Option<(&str, &str)> {
    s.split_once(':')
}

/// Leading decimal digits as a number, or zero (like C's `atoi`)
fn leading_number(s: &str) -> u32 {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().unwrap_or(0)
}

impl Urn {
    /// Construct a URN from its components
    ///
    /// A version of zero is taken to mean version 1.
    #[must_use]
    pub fn new(
        kind: UrnKind,
        uuid: impl Into<String>,
        domain: impl Into<String>,
        type_name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self {
            kind,
            uuid: uuid.into(),
            domain: domain.into(),
            type_name: type_name.into(),
            version: if version == 0 { 1 } else { version },
        }
    }

    /// The root device URN, `upnp:rootdevice`
    #[must_use]
    pub fn root() -> Self {
        Self {
            kind: UrnKind::Root,
            version: 1,
            ..Self::default()
        }
    }

    /// A bare device UUID, `uuid:{uuid}`
    #[must_use]
    pub fn uuid(uuid: impl Into<String>) -> Self {
        Self {
            kind: UrnKind::Uuid,
            uuid: uuid.into(),
            version: 1,
            ..Self::default()
        }
    }

    /// A device type, `urn:{domain}:device:{type}:{version}`
    #[must_use]
    pub fn device(
        domain: impl Into<String>,
        type_name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self::new(UrnKind::Device, String::new(), domain, type_name, version)
    }

    /// A service type, `urn:{domain}:service:{type}:{version}`
    #[must_use]
    pub fn service(
        domain: impl Into<String>,
        type_name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self::new(UrnKind::Service, String::new(), domain, type_name, version)
    }

    /// The same URN qualified by a device UUID, making it a USN
    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Parse a URN, yielding a `UrnKind::None` value on failure
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut urn = Self::default();
        urn.decompose(s);
        urn
    }

    /// Which form this URN takes
    #[must_use]
    pub const fn kind(&self) -> UrnKind {
        self.kind
    }

    /// The name of this URN's kind, for logging
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Whether this is a valid URN, i.e. anything but `UrnKind::None`
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.kind != UrnKind::None
    }

    /// Replace this URN with the one described by `s`
    ///
    /// Returns `false`, and leaves `self` as `UrnKind::None`, if `s`
    /// is not in one of the recognised forms; there is no partial
    /// success.
    pub fn decompose(&mut self, s: &str) -> bool {
        *self = Self::decompose_inner(s).unwrap_or_default();
        self.is_valid()
    }

    fn decompose_inner(s: &str) -> Option<Self> {
        let mut urn = Self::default();
        let mut rest = s;

        if let Some(after) = s.strip_prefix("uuid:") {
            let Some((uuid, after)) = next_segment(after) else {
                // uuid:{uuid}
                urn.uuid = after.to_string();
                urn.kind = UrnKind::Uuid;
                return Some(urn);
            };
            urn.uuid = uuid.to_string();
            rest = after.strip_prefix(':')?;
        }

        if rest == UPNP_ROOTDEVICE {
            urn.kind = UrnKind::Root;
            return Some(urn);
        }

        let rest = rest.strip_prefix("urn:")?;
        let (domain, rest) = next_segment(rest)?;
        let (segment, rest) = next_segment(rest)?;
        let kind = match segment {
            "device" => UrnKind::Device,
            "service" => UrnKind::Service,
            _ => return None,
        };
        let (type_name, version) = next_segment(rest)?;

        urn.domain = domain.to_string();
        urn.type_name = type_name.to_string();
        urn.version = leading_number(version);
        urn.kind = kind;
        Some(urn)
    }
}

impl PartialEq for Urn {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            UrnKind::None | UrnKind::Root => true,
            UrnKind::Uuid => self.uuid == other.uuid,
            UrnKind::Device | UrnKind::Service => {
                self.version == other.version
                    && self.domain == other.domain
                    && self.type_name == other.type_name
                    && self.uuid == other.uuid
            }
        }
    }
}

impl Eq for Urn {}

impl fmt::Display for Urn {
    /// The canonical text form; empty for an invalid URN
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == UrnKind::None {
            return Ok(());
        }
        if self.kind == UrnKind::Uuid {
            return write!(f, "uuid:{}", self.uuid);
        }
        if !self.uuid.is_empty() {
            write!(f, "uuid:{}::", self.uuid)?;
        }
        match self.kind {
            UrnKind::Root => f.write_str("upnp:rootdevice"),
            UrnKind::Device | UrnKind::Service => write!(
                f,
                "urn:{}:{}:{}:{}",
                self.domain, self.kind, self.type_name, self.version
            ),
            UrnKind::None | UrnKind::Uuid => Ok(()),
        }
    }
}

impl FromStr for Urn {
    type Err = UrnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let urn = Self::parse(s);
        if urn.is_valid() {
            Ok(urn)
        } else {
            Err(UrnParseError)
        }
    }
}

/// Generate a random (version 4) UUID, in the usual hyphenated form,
/// for use as a device identity
#[must_use]
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().hyphenated().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_device_usn() {
        let urn = Urn::parse("uuid:1234::urn:schemas-upnp-org:device:Basic:1");
        assert_eq!(urn.kind(), UrnKind::Device);
        assert_eq!(urn.uuid, "1234");
        assert_eq!(urn.domain, "schemas-upnp-org");
        assert_eq!(urn.type_name, "Basic");
        assert_eq!(urn.version, 1);
    }

    #[test]
    fn decompose_service_type() {
        let urn =
            Urn::parse("urn:schemas-upnp-org:service:ContentDirectory:2");
        assert_eq!(urn.kind(), UrnKind::Service);
        assert!(urn.uuid.is_empty());
        assert_eq!(urn.domain, "schemas-upnp-org");
        assert_eq!(urn.type_name, "ContentDirectory");
        assert_eq!(urn.version, 2);
    }

    #[test]
    fn decompose_bare_uuid() {
        let urn = Urn::parse("uuid:2fac1234-31f8-11b4-a222-08002b34c003");
        assert_eq!(urn.kind(), UrnKind::Uuid);
        assert_eq!(urn.uuid, "2fac1234-31f8-11b4-a222-08002b34c003");
    }

    #[test]
    fn decompose_root() {
        let urn = Urn::parse("upnp:rootdevice");
        assert_eq!(urn.kind(), UrnKind::Root);
        assert!(urn.uuid.is_empty());

        let urn = Urn::parse("uuid:37::upnp:rootdevice");
        assert_eq!(urn.kind(), UrnKind::Root);
        assert_eq!(urn.uuid, "37");
    }

    #[test]
    fn bad_version_is_zero() {
        let urn = Urn::parse("urn:schemas-upnp-org:device:Basic:X");
        assert_eq!(urn.kind(), UrnKind::Device);
        assert_eq!(urn.version, 0);

        let urn = Urn::parse("urn:schemas-upnp-org:device:Basic:");
        assert_eq!(urn.kind(), UrnKind::Device);
        assert_eq!(urn.version, 0);
    }

    #[test]
    fn rejects_malformed() {
        for s in [
            "",
            "fnord",
            "uuid:37:upnp:rootdevice",
            "uuid:37::fnord",
            "upnp:leafdevice",
            "urn:schemas-upnp-org",
            "urn:schemas-upnp-org:device",
            "urn:schemas-upnp-org:gadget:Basic:1",
            "urn:schemas-upnp-org:device:Basic",
            "urx:schemas-upnp-org:device:Basic:1",
        ] {
            let urn = Urn::parse(s);
            assert_eq!(urn.kind(), UrnKind::None, "{s}");
            assert!(!urn.is_valid());
        }
    }

    #[test]
    fn failure_resets_previous_value() {
        let mut urn = Urn::parse("uuid:37::urn:a:device:b:3");
        assert!(urn.is_valid());
        assert!(!urn.decompose("uuid:37::urn:a:widget:b:3"));
        assert_eq!(urn.kind(), UrnKind::None);
        assert!(urn.uuid.is_empty());
        assert!(urn.domain.is_empty());
    }

    #[test]
    fn format_forms() {
        assert_eq!(Urn::root().to_string(), "upnp:rootdevice");
        assert_eq!(
            Urn::root().with_uuid("37").to_string(),
            "uuid:37::upnp:rootdevice"
        );
        assert_eq!(Urn::uuid("37").to_string(), "uuid:37");
        assert_eq!(
            Urn::device("schemas-upnp-org", "MediaServer", 1).to_string(),
            "urn:schemas-upnp-org:device:MediaServer:1"
        );
        assert_eq!(
            Urn::service("schemas-upnp-org", "ContentDirectory", 0)
                .with_uuid("37")
                .to_string(),
            "uuid:37::urn:schemas-upnp-org:service:ContentDirectory:1"
        );
        assert_eq!(Urn::default().to_string(), "");
    }

    #[test]
    fn round_trips() {
        for urn in [
            Urn::root(),
            Urn::root().with_uuid("abc"),
            Urn::uuid("abc"),
            Urn::device("schemas-upnp-org", "Basic", 1),
            Urn::device("schemas-upnp-org", "Basic", 3).with_uuid("abc"),
            Urn::service("example-com", "Switch", 12).with_uuid("abc"),
        ] {
            assert_eq!(Urn::parse(&urn.to_string()), urn);
        }
        assert_eq!(
            Urn::parse(&Urn::default().to_string()).kind(),
            UrnKind::None
        );
    }

    #[test]
    fn equality_is_kind_aware() {
        assert_eq!(Urn::root(), Urn::root().with_uuid("37"));
        assert_ne!(Urn::uuid("37"), Urn::uuid("38"));
        assert_ne!(Urn::device("a", "b", 1), Urn::service("a", "b", 1));
        assert_ne!(Urn::device("a", "b", 1), Urn::device("a", "b", 2));
        assert_ne!(
            Urn::device("a", "b", 1).with_uuid("x"),
            Urn::device("a", "b", 1)
        );
        assert_eq!(Urn::default(), Urn::default());
    }

    #[test]
    fn from_str() {
        let urn: Urn = "uuid:37::upnp:rootdevice".parse().unwrap();
        assert_eq!(urn.kind(), UrnKind::Root);
        assert_eq!("nope".parse::<Urn>(), Err(UrnParseError));
    }

    #[test]
    fn generated_uuids_are_distinct() {
        let a = generate_uuid();
        let b = generate_uuid();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
        assert_eq!(Urn::parse(&format!("uuid:{a}")).uuid, a);
    }
}
