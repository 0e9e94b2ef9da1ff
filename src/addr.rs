//! Address families and address parsing.

use core::fmt;
use core::str::FromStr;
use std::net::{AddrParseError, IpAddr};

//------------ Family --------------------------------------------------------

/// The family of an IP address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Family {
    /// IPv4.
    V4,

    /// IPv6.
    V6,
}

impl Family {
    /// Returns the family of the given address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

//------------ parse ---------------------------------------------------------

/// Parses a textual IPv4 or IPv6 address without a port.
///
/// Surrounding whitespace is ignored.
pub fn parse(text: &str) -> Result<(IpAddr, Family), AddrParseError> {
    let addr = IpAddr::from_str(text.trim())?;
    Ok((addr, Family::of(&addr)))
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_both_families() {
        assert_eq!(parse("192.0.2.1").unwrap().1, Family::V4);
        assert_eq!(parse(" 2001:db8::1 ").unwrap().1, Family::V6);
        assert!(parse("192.0.2.1:53").is_err());
        assert!(parse("example.com").is_err());
        assert!(parse("").is_err());
    }
}
