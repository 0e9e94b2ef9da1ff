//! Health-aware failover between multiple addresses.
//!
//! A _resource_ is a named set of IPv4 and/or IPv6 addresses. Every address
//! is watched by the health monitor for one or more service types. When a
//! query for a resource is answered, all addresses that are currently not
//! down are returned. If too few of them are up, though, the answer falls
//! back to all addresses. If most of a cluster appears to be down, it is
//! more likely that the monitoring is wrong than that the last remaining
//! address can carry all the traffic.
//!
//! Resources are loaded from configuration through [`load`] into a
//! [`ResourceTable`] which is then used to [resolve][ResourceTable::resolve]
//! resources by their [`ResourceId`]. Each configuration reload creates a
//! new table that can be published through [`Generations`].

pub use self::addrset::{up_thresh, AddrSet, DEFAULT_UP_THRESH};
pub use self::error::{ErrorKind, LoadError, Stanza};
pub use self::load::load;
pub use self::table::{Generations, Resource, ResourceId, ResourceTable};

mod addrset;
mod error;
mod load;
mod table;
