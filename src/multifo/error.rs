//! Errors while loading resources.

use core::fmt;
use std::net::AddrParseError;

use crate::addr::Family;
use crate::monitor::MonitorError;

//------------ Stanza --------------------------------------------------------

/// The part of a resource’s configuration an address set came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stanza {
    /// The `addrs_v4` map of a resource.
    AddrsV4,

    /// The `addrs_v6` map of a resource.
    AddrsV6,

    /// The resource itself with the family detected automatically.
    Direct,
}

impl Stanza {
    /// Returns the configuration key of the stanza.
    pub fn as_str(self) -> &'static str {
        match self {
            Stanza::AddrsV4 => "addrs_v4",
            Stanza::AddrsV6 => "addrs_v6",
            Stanza::Direct => "direct",
        }
    }
}

impl fmt::Display for Stanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ LoadError -----------------------------------------------------

/// Loading the resource configuration failed.
///
/// The error names the resource and, if known, the stanza of the resource
/// the problem was found in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadError {
    resource: Option<String>,
    stanza: Option<Stanza>,
    kind: ErrorKind,
}

impl LoadError {
    pub(super) fn new(kind: ErrorKind) -> Self {
        LoadError {
            resource: None,
            stanza: None,
            kind,
        }
    }

    pub(super) fn in_resource(resource: &str, kind: ErrorKind) -> Self {
        LoadError {
            resource: Some(resource.into()),
            stanza: None,
            kind,
        }
    }

    pub(super) fn in_stanza(
        resource: &str,
        stanza: Stanza,
        kind: ErrorKind,
    ) -> Self {
        LoadError {
            resource: Some(resource.into()),
            stanza: Some(stanza),
            kind,
        }
    }

    /// Returns the name of the offending resource if there is one.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Returns the offending stanza if there is one.
    pub fn stanza(&self) -> Option<Stanza> {
        self.stanza
    }

    /// Returns what went wrong.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resource, self.stanza) {
            (Some(resource), Some(stanza)) => {
                write!(f, "resource '{resource}' ({stanza}): {}", self.kind)
            }
            (Some(resource), None) => {
                write!(f, "resource '{resource}': {}", self.kind)
            }
            (None, _) => fmt::Display::fmt(&self.kind, f),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::BadAddress { err, .. } => Some(err),
            ErrorKind::Monitor(err) => Some(err),
            _ => None,
        }
    }
}

//------------ ErrorKind -----------------------------------------------------

/// The kind of problem found in the configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The resource configuration is not a map.
    NotAMap,

    /// The resource name is empty or too long.
    BadName,

    /// The resource has an unknown option.
    BadOption(String),

    /// The resource or stanza doesn’t define any addresses.
    NoAddresses,

    /// The value for an address label is not a string.
    NotAString {
        /// The label of the address.
        label: String,
    },

    /// The value for an address label isn’t an IP address.
    BadAddress {
        /// The label of the address.
        label: String,

        /// The offending text.
        text: String,

        /// The reason parsing failed.
        err: AddrParseError,
    },

    /// The address is of the wrong family for its stanza.
    WrongFamily {
        /// The label of the address.
        label: String,

        /// The offending address.
        text: String,

        /// The family the stanza requires.
        expected: Family,
    },

    /// The `service_types` option is not a list of strings.
    ServiceTypes,

    /// The `up_thresh` option is not a number in the range (0.0 - 1.0].
    UpThresh,

    /// The `ignore_health` option is not a boolean.
    IgnoreHealth,

    /// There are more resources than can be identified.
    TooManyResources,

    /// Registering an address with the health monitor failed.
    Monitor(MonitorError),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotAMap => {
                f.write_str("resources must be configured as a map")
            }
            ErrorKind::BadName => f.write_str(
                "resource names must be between 1 and 256 bytes long",
            ),
            ErrorKind::BadOption(key) => write!(f, "bad option '{key}'"),
            ErrorKind::NoAddresses => f.write_str(
                "must define one or more 'desc => IP' mappings, either \
                 directly or inside 'addrs_v4' or 'addrs_v6'",
            ),
            ErrorKind::NotAString { label } => {
                write!(f, "address '{label}' must be a string value")
            }
            ErrorKind::BadAddress { label, text, err } => {
                write!(
                    f,
                    "failed to parse address '{text}' for '{label}': {err}"
                )
            }
            ErrorKind::WrongFamily {
                label,
                text,
                expected,
            } => {
                write!(f, "address '{text}' for '{label}' is not {expected}")
            }
            ErrorKind::ServiceTypes => {
                f.write_str("'service_types' values must be strings")
            }
            ErrorKind::UpThresh => f.write_str(
                "'up_thresh' must be a floating point value in the \
                 range (0.0 - 1.0]",
            ),
            ErrorKind::IgnoreHealth => {
                f.write_str("'ignore_health' must have a boolean value")
            }
            ErrorKind::TooManyResources => f.write_str("too many resources"),
            ErrorKind::Monitor(err) => fmt::Display::fmt(err, f),
        }
    }
}
