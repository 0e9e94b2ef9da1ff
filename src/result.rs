//! Collecting resolved addresses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::addr::Family;
use crate::monitor::AddrLimits;

//------------ ResultSink ----------------------------------------------------

/// A receiver for the addresses of an answer.
pub trait ResultSink {
    /// Appends an address.
    fn add_addr(&mut self, addr: IpAddr);

    /// Removes all addresses of the given family appended so far.
    fn wipe(&mut self, family: Family);
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn add_addr(&mut self, addr: IpAddr) {
        (**self).add_addr(addr)
    }

    fn wipe(&mut self, family: Family) {
        (**self).wipe(family)
    }
}

//------------ DynResult -----------------------------------------------------

/// The addresses of a dynamic answer, kept separately per family.
///
/// A query handling thread typically keeps one of these around, sized via
/// [`with_limits`][Self::with_limits], and [`clear`][Self::clear]s it
/// before each resolve.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DynResult {
    v4: Vec<Ipv4Addr>,
    v6: Vec<Ipv6Addr>,
}

impl DynResult {
    /// Creates a new, empty result.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates an empty result with room for the largest configured sets.
    pub fn with_limits(limits: AddrLimits) -> Self {
        DynResult {
            v4: Vec::with_capacity(limits.v4),
            v6: Vec::with_capacity(limits.v6),
        }
    }

    /// Returns the IPv4 addresses.
    pub fn v4(&self) -> &[Ipv4Addr] {
        &self.v4
    }

    /// Returns the IPv6 addresses.
    pub fn v6(&self) -> &[Ipv6Addr] {
        &self.v6
    }

    /// Returns the total number of addresses.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Returns whether there are no addresses.
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    /// Returns all addresses, IPv4 first.
    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.v4
            .iter()
            .copied()
            .map(IpAddr::V4)
            .chain(self.v6.iter().copied().map(IpAddr::V6))
    }

    /// Removes all addresses, keeping the allocated space.
    pub fn clear(&mut self) {
        self.v4.clear();
        self.v6.clear();
    }
}

impl ResultSink for DynResult {
    fn add_addr(&mut self, addr: IpAddr) {
        match addr {
            IpAddr::V4(addr) => self.v4.push(addr),
            IpAddr::V6(addr) => self.v6.push(addr),
        }
    }

    fn wipe(&mut self, family: Family) {
        match family {
            Family::V4 => self.v4.clear(),
            Family::V6 => self.v6.clear(),
        }
    }
}

//============ Testing =======================================================
