//! The table of configured resources.

use core::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::error;

use crate::arena::{ClosedArena, Region};
use crate::monitor::{AddrLimits, HealthTable};
use crate::result::ResultSink;
use crate::sttl::Sttl;

use super::addrset::AddrSet;

//------------ ResourceId ----------------------------------------------------

/// The index of a resource in its table.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceId(u32);

impl ResourceId {
    /// Creates the id for the resource at position `index`.
    ///
    /// Returns `None` if the position doesn’t fit into an id.
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(ResourceId)
    }

    /// Returns the position of the resource in the table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

//------------ Resource ------------------------------------------------------

/// A resource with its IPv4 and IPv6 address sets.
///
/// At least one of the two sets is always present.
#[derive(Clone, Debug)]
pub struct Resource {
    pub(super) name: Region,
    pub(super) v4: Option<AddrSet>,
    pub(super) v6: Option<AddrSet>,
}

impl Resource {
    /// Returns the IPv4 address set if there is one.
    pub fn v4(&self) -> Option<&AddrSet> {
        self.v4.as_ref()
    }

    /// Returns the IPv6 address set if there is one.
    pub fn v6(&self) -> Option<&AddrSet> {
        self.v6.as_ref()
    }

    /// Evaluates the address sets of the resource.
    ///
    /// IPv4 is evaluated before IPv6. Both add to the same sink and the
    /// result is the combination of both states.
    pub fn resolve<T, S>(&self, table: &T, sink: &mut S) -> Sttl
    where
        T: HealthTable + ?Sized,
        S: ResultSink + ?Sized,
    {
        match (&self.v4, &self.v6) {
            (Some(v4), Some(v6)) => {
                let res = v4.evaluate(table, sink);
                res.min2(v6.evaluate(table, sink))
            }
            (Some(set), None) | (None, Some(set)) => {
                set.evaluate(table, sink)
            }
            (None, None) => {
                // Loading never produces such a resource.
                debug_assert!(false, "resource without addresses");
                Sttl::MAX
            }
        }
    }
}

//------------ ResourceTable -------------------------------------------------

/// All resources of one configuration generation.
///
/// The table is created by [`load`][super::load] and never changes
/// afterwards. It can be shared freely between query handling threads.
pub struct ResourceTable {
    /// The resources in configuration order.
    resources: Vec<Resource>,

    /// The storage for the resource names.
    names: ClosedArena,

    /// The largest address set of each family.
    limits: AddrLimits,
}

impl ResourceTable {
    pub(super) fn new(
        resources: Vec<Resource>,
        names: ClosedArena,
        limits: AddrLimits,
    ) -> Self {
        ResourceTable {
            resources,
            names,
            limits,
        }
    }

    /// Returns the number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns whether there are no resources at all.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the largest address set of each family.
    pub fn addr_limits(&self) -> AddrLimits {
        self.limits
    }

    /// Returns the resource with the given id.
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// Returns the name of a resource.
    pub fn name(&self, resource: &Resource) -> &str {
        // Names are interned from `&str`s, so this never fails.
        core::str::from_utf8(self.names.get(resource.name)).unwrap_or("")
    }

    /// Returns an iterator over all resources and their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> + '_ {
        // Loading rejects tables with more resources than there are ids.
        (0..).map(ResourceId).zip(self.resources.iter())
    }

    /// Looks up a resource by its name.
    ///
    /// This happens when zone data referring to a resource is loaded.
    /// Unknown names are logged.
    pub fn map_resource(&self, name: &str) -> Option<ResourceId> {
        let res = self
            .iter()
            .find_map(|(id, res)| (self.name(res) == name).then_some(id));
        if res.is_none() {
            error!("multifo: unknown resource '{name}'");
        }
        res
    }

    /// Resolves a resource.
    ///
    /// The addresses to answer with are added to `sink` and the combined
    /// state of the resource is returned.
    ///
    /// # Panics
    ///
    /// The method panics if `id` isn’t from this table.
    pub fn resolve<T, S>(&self, id: ResourceId, table: &T, sink: &mut S) -> Sttl
    where
        T: HealthTable + ?Sized,
        S: ResultSink + ?Sized,
    {
        self.resources[id.index()].resolve(table, sink)
    }
}

impl fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.resources.iter().map(|res| (self.name(res), res)))
            .finish()
    }
}

//------------ Generations ---------------------------------------------------

/// The currently published resource table.
///
/// Configuration reloads build a new table and publish it here. Queries
/// that are in progress keep using the table they started with. The old
/// table is dropped once the last of them is done.
///
/// The health state table is not part of a generation. A new table may be
/// resolved against the state table of an older one, in which case
/// monitors the older table doesn’t know about read as up.
#[derive(Debug)]
pub struct Generations {
    current: ArcSwap<ResourceTable>,
}

impl Generations {
    /// Creates a new value publishing `table`.
    pub fn new(table: ResourceTable) -> Self {
        Generations {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Returns the current table.
    pub fn current(&self) -> Arc<ResourceTable> {
        self.current.load_full()
    }

    /// Publishes a new table and returns the previous one.
    pub fn publish(&self, table: ResourceTable) -> Arc<ResourceTable> {
        self.current.swap(Arc::new(table))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::super::error::{ErrorKind, LoadError};
    use super::*;

    #[test]
    fn resource_id_range() {
        let id = ResourceId::from_index(7).unwrap();
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "7");
        assert!(ResourceId::from_index(u32::MAX as usize).is_some());
        if let Ok(index) = usize::try_from(u64::from(u32::MAX) + 1) {
            assert_eq!(ResourceId::from_index(index), None);
        }
    }

    #[test]
    fn too_many_resources_error() {
        let err = LoadError::in_resource("www", ErrorKind::TooManyResources);
        assert_eq!(err.to_string(), "resource 'www': too many resources");
    }
}
