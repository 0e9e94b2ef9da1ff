//! The interface to the health monitor.
//!
//! The monitor watches every configured address with one or more service
//! types, e.g., a TCP connect or an HTTP check. During configuration the
//! loader registers each pair of service type and address through the
//! [`Monitor`] trait and receives a [`MonitorIndex`] in return. At query
//! time the resolver looks up the current state of each index through the
//! [`HealthTable`] trait.
//!
//! This module also provides a simple in-memory implementation of both
//! sides, [`MonitorRegistry`] and [`StateTable`]. How states get into the
//! table is up to whoever runs the actual health checks.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};
use std::collections::HashMap;
use std::net::IpAddr;

use tracing::trace;

use crate::sttl::Sttl;

//------------ MonitorIndex --------------------------------------------------

/// A handle into the health state table.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MonitorIndex(u32);

impl MonitorIndex {
    /// Creates an index from its position in the state table.
    pub const fn new(index: u32) -> Self {
        MonitorIndex(index)
    }

    /// Returns the position in the state table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MonitorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

//------------ AddrLimits ----------------------------------------------------

/// The largest address set configured for each family.
///
/// Result buffers use these to size themselves up front.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AddrLimits {
    /// The largest number of IPv4 addresses in a single set.
    pub v4: usize,

    /// The largest number of IPv6 addresses in a single set.
    pub v6: usize,
}

//------------ Monitor -------------------------------------------------------

/// Registration of monitored addresses.
pub trait Monitor {
    /// Registers `addr` to be monitored with the service type `service`.
    ///
    /// Returns the index of the state table entry that will carry the
    /// state of this pair.
    fn register(
        &mut self,
        service: &str,
        addr: IpAddr,
    ) -> Result<MonitorIndex, MonitorError>;

    /// Reports the largest address sets once configuration is complete.
    fn set_addr_limits(&mut self, limits: AddrLimits);
}

impl<M: Monitor + ?Sized> Monitor for &mut M {
    fn register(
        &mut self,
        service: &str,
        addr: IpAddr,
    ) -> Result<MonitorIndex, MonitorError> {
        (**self).register(service, addr)
    }

    fn set_addr_limits(&mut self, limits: AddrLimits) {
        (**self).set_addr_limits(limits)
    }
}

//------------ HealthTable ---------------------------------------------------

/// Read access to the current health states.
///
/// A table may belong to an older configuration than the resources
/// resolved against it, so an index may be out of range. Such entries
/// are reported as up with the maximum TTL.
pub trait HealthTable {
    /// Returns the current state of the entry at `index`.
    fn sttl(&self, index: MonitorIndex) -> Sttl;

    /// Returns the combined state of all the given entries.
    ///
    /// Each entry is read exactly once. No entries means up.
    fn min(&self, indices: &[MonitorIndex]) -> Sttl {
        Sttl::min(indices.iter().map(|index| self.sttl(*index)))
    }
}

impl HealthTable for [Sttl] {
    fn sttl(&self, index: MonitorIndex) -> Sttl {
        self.get(index.index()).copied().unwrap_or(Sttl::MAX)
    }
}

impl HealthTable for Vec<Sttl> {
    fn sttl(&self, index: MonitorIndex) -> Sttl {
        self.as_slice().sttl(index)
    }
}

impl<T: HealthTable + ?Sized> HealthTable for &T {
    fn sttl(&self, index: MonitorIndex) -> Sttl {
        (**self).sttl(index)
    }
}

//------------ StateTable ----------------------------------------------------

/// A health state table that can be updated while it is being read.
///
/// Every entry is a single atomic word. Readers and the updating monitor
/// never block each other. A reader may see a mix of old and new states
/// across several entries, which is fine since the next query will see
/// the newer ones.
#[derive(Debug)]
pub struct StateTable {
    states: Box<[AtomicU32]>,
}

impl StateTable {
    /// Creates a table of `len` entries that all start out up.
    pub fn new(len: usize) -> Self {
        StateTable {
            states: (0..len)
                .map(|_| AtomicU32::new(Sttl::MAX.into_bits()))
                .collect(),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Updates the state of the entry at `index`.
    ///
    /// # Panics
    ///
    /// The method panics if `index` is outside the table.
    pub fn update(&self, index: MonitorIndex, sttl: Sttl) {
        self.states[index.index()].store(sttl.into_bits(), Ordering::Relaxed)
    }
}

impl HealthTable for StateTable {
    fn sttl(&self, index: MonitorIndex) -> Sttl {
        self.states
            .get(index.index())
            .map(|state| Sttl::from_bits(state.load(Ordering::Relaxed)))
            .unwrap_or(Sttl::MAX)
    }
}

//------------ MonitorRegistry -----------------------------------------------

/// The default service type every address is monitored with.
pub const DEFAULT_SERVICE_TYPE: &str = "up";

/// A registry of monitored addresses.
///
/// The registry knows a set of service types, initially only
/// [`DEFAULT_SERVICE_TYPE`]. Registering the same pair of service type and
/// address twice returns the same index.
#[derive(Clone, Debug)]
pub struct MonitorRegistry {
    /// The names of the known service types.
    services: Vec<String>,

    /// The registered pairs in index order.
    monitors: Vec<(usize, IpAddr)>,

    /// The index of each registered pair.
    lookup: HashMap<(usize, IpAddr), MonitorIndex>,

    /// The limits reported by the loader.
    limits: AddrLimits,
}

impl MonitorRegistry {
    /// Creates a registry knowing only the default service type.
    pub fn new() -> Self {
        MonitorRegistry {
            services: vec![DEFAULT_SERVICE_TYPE.into()],
            monitors: Vec::new(),
            lookup: HashMap::new(),
            limits: AddrLimits::default(),
        }
    }

    /// Adds a service type.
    ///
    /// Adding a type that already exists does nothing.
    pub fn add_service_type(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.services.contains(&name) {
            self.services.push(name)
        }
    }

    /// Returns the number of registered monitors.
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Returns whether no monitors have been registered.
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Returns the registered pairs of service type and address.
    ///
    /// The position of a pair in the iterator is its index.
    pub fn monitors(&self) -> impl Iterator<Item = (&str, IpAddr)> + '_ {
        self.monitors
            .iter()
            .map(|(service, addr)| (self.services[*service].as_str(), *addr))
    }

    /// Returns the limits reported during configuration.
    pub fn addr_limits(&self) -> AddrLimits {
        self.limits
    }

    /// Creates a state table with an entry for every registered monitor.
    pub fn state_table(&self) -> StateTable {
        StateTable::new(self.monitors.len())
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for MonitorRegistry {
    fn register(
        &mut self,
        service: &str,
        addr: IpAddr,
    ) -> Result<MonitorIndex, MonitorError> {
        let service = self
            .services
            .iter()
            .position(|name| name == service)
            .ok_or_else(|| MonitorError::UnknownService(service.into()))?;
        if let Some(index) = self.lookup.get(&(service, addr)) {
            return Ok(*index);
        }
        let index = u32::try_from(self.monitors.len())
            .map(MonitorIndex)
            .map_err(|_| MonitorError::TooManyMonitors)?;
        trace!(
            service = %self.services[service], %addr, %index,
            "registered monitor"
        );
        self.monitors.push((service, addr));
        self.lookup.insert((service, addr), index);
        Ok(index)
    }

    fn set_addr_limits(&mut self, limits: AddrLimits) {
        self.limits = limits
    }
}

//============ Error Types ===================================================

//------------ MonitorError --------------------------------------------------

/// Registering a monitor failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MonitorError {
    /// The service type is not known.
    UnknownService(String),

    /// The state table cannot grow any further.
    TooManyMonitors,
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::UnknownService(name) => {
                write!(f, "invalid service type '{name}'")
            }
            MonitorError::TooManyMonitors => {
                f.write_str("too many monitored addresses")
            }
        }
    }
}

impl std::error::Error for MonitorError {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn register_dedups_pairs() {
        let mut reg = MonitorRegistry::new();
        reg.add_service_type("http");
        let a = reg.register("up", addr("192.0.2.1")).unwrap();
        let b = reg.register("http", addr("192.0.2.1")).unwrap();
        let c = reg.register("up", addr("192.0.2.1")).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(reg.len(), 2);
        let monitors: Vec<_> = reg.monitors().collect();
        assert_eq!(
            monitors,
            [("up", addr("192.0.2.1")), ("http", addr("192.0.2.1"))]
        );
    }

    #[test]
    fn register_unknown_service() {
        let mut reg = MonitorRegistry::new();
        assert_eq!(
            reg.register("smtp", addr("2001:db8::1")),
            Err(MonitorError::UnknownService("smtp".into()))
        );
    }

    #[test]
    fn state_table_updates() {
        let table = StateTable::new(3);
        let idx = [MonitorIndex::new(0), MonitorIndex::new(2)];
        assert_eq!(table.min(&idx), Sttl::MAX);
        table.update(MonitorIndex::new(2), Sttl::down(30));
        table.update(MonitorIndex::new(1), Sttl::up(10));
        assert_eq!(table.min(&idx), Sttl::down(30));
        assert_eq!(table.min(&[]), Sttl::MAX);
    }

    #[test]
    fn out_of_range_is_up() {
        let table = StateTable::new(1);
        table.update(MonitorIndex::new(0), Sttl::down(20));
        assert_eq!(table.sttl(MonitorIndex::new(7)), Sttl::MAX);
        assert_eq!(
            table.min(&[MonitorIndex::new(0), MonitorIndex::new(7)]),
            Sttl::down(20)
        );
        assert_eq!(
            Vec::<Sttl>::new().sttl(MonitorIndex::new(0)),
            Sttl::MAX
        );
    }

    #[test]
    fn slice_table() {
        let table = vec![Sttl::up(5), Sttl::down(9)];
        assert_eq!(table.sttl(MonitorIndex::new(1)), Sttl::down(9));
        assert_eq!(
            table.as_slice().min(&[MonitorIndex::new(0), MonitorIndex::new(1)]),
            Sttl::down(5)
        );
    }
}
