//! Health-aware address failover for authoritative DNS.
//!
//! This crate provides the resolution engine for _dynamic_ address records
//! of an authoritative name server. Instead of a fixed list of addresses,
//! such a record refers to a resource with a number of addresses that are
//! watched by a health monitor. Each query is answered with those addresses
//! that are currently up, unless too few are, in which case all of them
//! are returned.
//!
//! The crate is organised into the following modules:
//!
//! * [multifo] loads resources from configuration and resolves them,
//! * [sttl] provides the combined health state and TTL values that both
//!   the health monitor and the resolver produce,
//! * [monitor] defines the interface to the health monitor as well as a
//!   simple in-memory implementation,
//! * [result] defines where resolved addresses go,
//! * [config] contains the configuration tree resources are loaded from,
//! * [addr] deals with address families and parsing, and
//! * [arena] provides the pooled byte string storage used for interned
//!   names.
//!
//! # Example
//!
//! ```
//! use dns_failover::config::{Map, Value};
//! use dns_failover::monitor::MonitorRegistry;
//! use dns_failover::multifo;
//! use dns_failover::result::DynResult;
//!
//! let config: Value = [(
//!     "www",
//!     Value::from(vec!["192.0.2.1", "192.0.2.2", "2001:db8::1"]),
//! )]
//! .into_iter()
//! .collect::<Map>()
//! .into();
//!
//! // The family is detected from the first address, so the IPv6
//! // address in the IPv4 set is rejected.
//! let mut monitor = MonitorRegistry::new();
//! assert!(multifo::load(&config, &mut monitor).is_err());
//!
//! let config: Value = [(
//!     "www",
//!     Value::from(vec!["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
//! )]
//! .into_iter()
//! .collect::<Map>()
//! .into();
//! let mut monitor = MonitorRegistry::new();
//! let resources = multifo::load(&config, &mut monitor).unwrap();
//! let states = monitor.state_table();
//!
//! let www = resources.map_resource("www").unwrap();
//! let mut answer = DynResult::with_limits(resources.addr_limits());
//! let sttl = resources.resolve(www, &states, &mut answer);
//! assert!(!sttl.is_down());
//! assert_eq!(answer.len(), 3);
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod addr;
pub mod arena;
pub mod config;
pub mod monitor;
pub mod multifo;
pub mod result;
pub mod sttl;
pub mod utils;
