//! Loading resources from configuration.
//!
//! The configuration of the resources is a map from resource names to
//! resource definitions. A resource is either defined through explicit
//! `addrs_v4` and `addrs_v6` stanzas or directly, in which case the family
//! of its addresses is derived from the first one:
//!
//! ```text
//! service_types: [ http ]
//! www: { addrs_v4: [ 192.0.2.1, 192.0.2.2 ], addrs_v6: [ 2001:db8::1 ] }
//! api: { up_thresh: 0.3, a: 192.0.2.10, b: 192.0.2.11, c: 192.0.2.12 }
//! ```
//!
//! Addresses can be given as a list or as a map from labels to addresses.
//! The three parameters `up_thresh`, `service_types`, and `ignore_health`
//! can appear at any level and apply to everything below unless
//! overridden.

use std::borrow::Cow;
use std::net::IpAddr;

use tracing::{debug, error, info};

use crate::addr::{self, Family};
use crate::arena::{Arena, MAX_OBJECT_SIZE};
use crate::config::{Map, Value};
use crate::monitor::{AddrLimits, Monitor, MonitorIndex, DEFAULT_SERVICE_TYPE};

use super::addrset::{self, AddrSet, DEFAULT_UP_THRESH};
use super::error::{ErrorKind, LoadError, Stanza};
use super::table::{Resource, ResourceId, ResourceTable};

//------------ Configuration Keys --------------------------------------------

const UP_THRESH: &str = "up_thresh";
const SERVICE_TYPES: &str = "service_types";
const IGNORE_HEALTH: &str = "ignore_health";
const ADDRS_V4: &str = "addrs_v4";
const ADDRS_V6: &str = "addrs_v6";

//------------ load ----------------------------------------------------------

/// Loads all resources from a configuration tree.
///
/// Every address is registered with `monitor`. Once all resources have
/// been loaded, the largest address sets are reported to it as well.
///
/// Any problem with the configuration rejects it as a whole.
pub fn load<M: Monitor + ?Sized>(
    config: &Value,
    monitor: &mut M,
) -> Result<ResourceTable, LoadError> {
    let res = Loader::new(monitor).load(config);
    if let Err(err) = &res {
        error!("multifo: {err}");
    }
    res
}

//------------ Params --------------------------------------------------------

/// The parameters that are inherited down the configuration tree.
#[derive(Clone, Copy, Debug, Default)]
struct Params<'a> {
    up_thresh: Option<&'a Value>,
    service_types: Option<&'a Value>,
    ignore_health: Option<&'a Value>,
}

impl<'a> Params<'a> {
    /// Returns whether `key` is one of the parameters.
    fn is_param(key: &str) -> bool {
        matches!(key, UP_THRESH | SERVICE_TYPES | IGNORE_HEALTH)
    }

    /// Returns the parameters with those declared in `map` overriding.
    fn override_from(self, map: &'a Map) -> Self {
        Params {
            up_thresh: map.get(UP_THRESH).or(self.up_thresh),
            service_types: map.get(SERVICE_TYPES).or(self.service_types),
            ignore_health: map.get(IGNORE_HEALTH).or(self.ignore_health),
        }
    }
}

//------------ AddrsConfig ---------------------------------------------------

/// The configuration of a single address set.
///
/// This is a map from labels to addresses with parameters separated out.
/// Lists of addresses are turned into this form using their position,
/// starting at 1, as label.
struct AddrsConfig<'a> {
    params: Params<'a>,
    addrs: Vec<(Cow<'a, str>, &'a Value)>,
}

impl<'a> AddrsConfig<'a> {
    fn from_value(
        value: &'a Value,
        inherited: Params<'a>,
    ) -> Result<Self, ErrorKind> {
        match value {
            Value::Map(map) => Ok(AddrsConfig {
                params: inherited.override_from(map),
                addrs: map
                    .iter()
                    .filter(|(key, _)| !Params::is_param(key))
                    .map(|(key, value)| (Cow::Borrowed(key), value))
                    .collect(),
            }),
            Value::Array(items) => {
                let addrs = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        let label: Cow<'a, str> =
                            Cow::Owned(format!("{}", idx + 1));
                        if item.is_scalar() {
                            Ok((label, item))
                        } else {
                            Err(ErrorKind::NotAString {
                                label: label.into_owned(),
                            })
                        }
                    })
                    .collect::<Result<_, _>>()?;
                Ok(AddrsConfig {
                    params: inherited,
                    addrs,
                })
            }
            Value::Scalar(_) => Ok(AddrsConfig {
                params: inherited,
                addrs: vec![(Cow::Borrowed("1"), value)],
            }),
        }
    }
}

//------------ Loader --------------------------------------------------------

/// The state kept while loading resources.
struct Loader<'m, M: ?Sized> {
    monitor: &'m mut M,
    names: Arena,
    limits: AddrLimits,
}

impl<'m, M: Monitor + ?Sized> Loader<'m, M> {
    fn new(monitor: &'m mut M) -> Self {
        Loader {
            monitor,
            names: Arena::new(),
            limits: AddrLimits::default(),
        }
    }

    fn load(mut self, config: &Value) -> Result<ResourceTable, LoadError> {
        let config = config
            .as_map()
            .ok_or_else(|| LoadError::new(ErrorKind::NotAMap))?;
        let params = Params::default().override_from(config);

        let mut resources = Vec::with_capacity(config.len());
        for (name, value) in config.iter() {
            if Params::is_param(name) {
                continue;
            }
            if ResourceId::from_index(resources.len()).is_none() {
                return Err(LoadError::in_resource(
                    name,
                    ErrorKind::TooManyResources,
                ));
            }
            resources.push(self.load_resource(name, value, params)?);
        }

        if !resources.is_empty() {
            self.monitor.set_addr_limits(self.limits);
        }
        info!(
            resources = resources.len(),
            v4_max = self.limits.v4,
            v6_max = self.limits.v6,
            "multifo: loaded resources"
        );
        Ok(ResourceTable::new(resources, self.names.close(), self.limits))
    }

    fn load_resource<'a>(
        &mut self,
        name: &str,
        value: &'a Value,
        params: Params<'a>,
    ) -> Result<Resource, LoadError> {
        if name.is_empty() || name.len() > MAX_OBJECT_SIZE {
            return Err(LoadError::in_resource(name, ErrorKind::BadName));
        }
        let region = self.names.alloc_copy(name.as_bytes());

        let mut res = Resource {
            name: region,
            v4: None,
            v6: None,
        };

        let map = match value.as_map() {
            Some(map)
                if map.contains_key(ADDRS_V4)
                    || map.contains_key(ADDRS_V6) =>
            {
                map
            }
            _ => {
                self.load_direct(name, value, params, &mut res)?;
                return Ok(res);
            }
        };

        let params = params.override_from(map);
        if let Some(key) = map.iter().map(|(key, _)| key).find(|key| {
            !Params::is_param(key) && *key != ADDRS_V4 && *key != ADDRS_V6
        }) {
            return Err(LoadError::in_resource(
                name,
                ErrorKind::BadOption(key.into()),
            ));
        }
        if let Some(value) = map.get(ADDRS_V4) {
            res.v4 = Some(self.load_stanza(
                name,
                Stanza::AddrsV4,
                Family::V4,
                value,
                params,
            )?);
        }
        if let Some(value) = map.get(ADDRS_V6) {
            res.v6 = Some(self.load_stanza(
                name,
                Stanza::AddrsV6,
                Family::V6,
                value,
                params,
            )?);
        }
        Ok(res)
    }

    /// Loads a resource without explicit stanzas.
    fn load_direct<'a>(
        &mut self,
        name: &str,
        value: &'a Value,
        params: Params<'a>,
        res: &mut Resource,
    ) -> Result<(), LoadError> {
        let err =
            |kind: ErrorKind| LoadError::in_stanza(name, Stanza::Direct, kind);
        let config = AddrsConfig::from_value(value, params).map_err(err)?;
        let (label, first) = config
            .addrs
            .first()
            .ok_or_else(|| err(ErrorKind::NoAddresses))?;
        let (_, family) = parse_addr(label, first).map_err(err)?;
        let set = self
            .build_set(name, Stanza::Direct, family, config)
            .map_err(err)?;
        match family {
            Family::V4 => res.v4 = Some(set),
            Family::V6 => res.v6 = Some(set),
        }
        Ok(())
    }

    fn load_stanza<'a>(
        &mut self,
        name: &str,
        stanza: Stanza,
        family: Family,
        value: &'a Value,
        params: Params<'a>,
    ) -> Result<AddrSet, LoadError> {
        let err = |kind: ErrorKind| LoadError::in_stanza(name, stanza, kind);
        let config = AddrsConfig::from_value(value, params).map_err(err)?;
        self.build_set(name, stanza, family, config).map_err(err)
    }

    fn build_set(
        &mut self,
        name: &str,
        stanza: Stanza,
        family: Family,
        config: AddrsConfig,
    ) -> Result<AddrSet, ErrorKind> {
        let services = service_types(config.params.service_types)?;
        let fraction = match config.params.up_thresh {
            Some(value) => match value.as_f64() {
                Some(fraction) if fraction > 0.0 && fraction <= 1.0 => {
                    fraction
                }
                _ => return Err(ErrorKind::UpThresh),
            },
            None => DEFAULT_UP_THRESH,
        };
        let ignore_health = match config.params.ignore_health {
            Some(value) => value.as_bool().ok_or(ErrorKind::IgnoreHealth)?,
            None => false,
        };
        if config.addrs.is_empty() {
            return Err(ErrorKind::NoAddresses);
        }

        let count = config.addrs.len();
        let mut addrs = Vec::with_capacity(count);
        let mut indices: Vec<MonitorIndex> =
            Vec::with_capacity(count * services.len());
        for (label, value) in &config.addrs {
            let (addr, addr_family) = parse_addr(label, value)?;
            if addr_family != family {
                return Err(ErrorKind::WrongFamily {
                    label: label.to_string(),
                    text: value.as_str().unwrap_or_default().into(),
                    expected: family,
                });
            }
            for service in &services {
                indices.push(
                    self.monitor
                        .register(service, addr)
                        .map_err(ErrorKind::Monitor)?,
                );
            }
            addrs.push(addr);
        }

        let up_thresh = addrset::up_thresh(count, fraction);
        let limit = match family {
            Family::V4 => &mut self.limits.v4,
            Family::V6 => &mut self.limits.v6,
        };
        *limit = (*limit).max(count);

        debug!(
            resource = name,
            %stanza,
            %family,
            count,
            up_thresh,
            ignore_health,
            "multifo: configured address set"
        );
        Ok(AddrSet::new(
            family,
            addrs.into(),
            indices.into(),
            services.len(),
            up_thresh,
            ignore_health,
        ))
    }
}

//------------ Helpers -------------------------------------------------------

/// Returns the service types to monitor each address with.
fn service_types(value: Option<&Value>) -> Result<Vec<&str>, ErrorKind> {
    match value {
        None => Ok(vec![DEFAULT_SERVICE_TYPE]),
        Some(Value::Scalar(name)) => Ok(vec![name.as_str()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().ok_or(ErrorKind::ServiceTypes))
            .collect(),
        Some(Value::Map(_)) => Err(ErrorKind::ServiceTypes),
    }
}

/// Parses the address value for `label`.
fn parse_addr(
    label: &str,
    value: &Value,
) -> Result<(IpAddr, Family), ErrorKind> {
    let text = value.as_str().ok_or_else(|| ErrorKind::NotAString {
        label: label.into(),
    })?;
    addr::parse(text).map_err(|err| ErrorKind::BadAddress {
        label: label.into(),
        text: String::from(text),
        err,
    })
}
