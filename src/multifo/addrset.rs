//! Address sets and their evaluation.

use std::net::IpAddr;

use crate::addr::Family;
use crate::monitor::{HealthTable, MonitorIndex};
use crate::result::ResultSink;
use crate::sttl::Sttl;

//------------ Configuration Constants ---------------------------------------

/// The fraction of addresses that need to be up if nothing else is
/// configured.
pub const DEFAULT_UP_THRESH: f64 = 0.5;

//------------ AddrSet -------------------------------------------------------

/// The addresses of one family of a resource.
///
/// Each address is monitored with the same number of services. The set as
/// a whole is considered up if at least `up_thresh` of its addresses are
/// not down.
#[derive(Clone, Debug)]
pub struct AddrSet {
    /// The family of all addresses.
    family: Family,

    /// The addresses in configuration order.
    addrs: Box<[IpAddr]>,

    /// The monitor indices, `num_svcs` per address, in address order.
    indices: Box<[MonitorIndex]>,

    /// The number of monitor indices per address.
    num_svcs: usize,

    /// The number of addresses that need to be up.
    up_thresh: usize,

    /// Whether health states may remove addresses from answers.
    ignore_health: bool,
}

impl AddrSet {
    /// Creates a new set.
    ///
    /// The caller guarantees that `addrs` isn’t empty, that all addresses
    /// are of `family`, that `indices` holds `num_svcs` entries per
    /// address, and that `up_thresh` is between one and the number of
    /// addresses.
    pub(crate) fn new(
        family: Family,
        addrs: Box<[IpAddr]>,
        indices: Box<[MonitorIndex]>,
        num_svcs: usize,
        up_thresh: usize,
        ignore_health: bool,
    ) -> Self {
        debug_assert!(!addrs.is_empty());
        debug_assert!(addrs.iter().all(|addr| Family::of(addr) == family));
        debug_assert_eq!(indices.len(), addrs.len() * num_svcs);
        debug_assert!(up_thresh >= 1 && up_thresh <= addrs.len());
        AddrSet {
            family,
            addrs,
            indices,
            num_svcs,
            up_thresh,
            ignore_health,
        }
    }

    /// Returns the address family of the set.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Returns the number of addresses.
    pub fn count(&self) -> usize {
        self.addrs.len()
    }

    /// Returns the addresses in configuration order.
    pub fn addrs(&self) -> &[IpAddr] {
        &self.addrs
    }

    /// Returns the number of monitored services per address.
    pub fn num_svcs(&self) -> usize {
        self.num_svcs
    }

    /// Returns the number of addresses that need to be up.
    pub fn up_thresh(&self) -> usize {
        self.up_thresh
    }

    /// Returns whether health states are ignored for the answer.
    pub fn ignore_health(&self) -> bool {
        self.ignore_health
    }

    /// Returns the monitor indices of the address at position `idx`.
    pub fn indices(&self, idx: usize) -> &[MonitorIndex] {
        &self.indices[idx * self.num_svcs..(idx + 1) * self.num_svcs]
    }

    /// Returns an iterator over the addresses and their monitor indices.
    pub fn entries(
        &self,
    ) -> impl Iterator<Item = (IpAddr, &[MonitorIndex])> + '_ {
        (0..self.addrs.len()).map(|idx| (self.addrs[idx], self.indices(idx)))
    }

    /// Adds the addresses to answer with to `sink` and returns the state.
    ///
    /// Every address that isn’t down is added. Addresses that are down
    /// are added, too, if the set ignores health. If fewer than
    /// `up_thresh` addresses are up, the set has failed. Its state is
    /// marked down and, unless health is ignored, all addresses of the
    /// family replace whatever was added before. Otherwise the
    /// state is up even if some addresses are down, but the TTL still
    /// reflects all of them.
    pub fn evaluate<T, S>(&self, table: &T, sink: &mut S) -> Sttl
    where
        T: HealthTable + ?Sized,
        S: ResultSink + ?Sized,
    {
        let mut res = Sttl::MAX;
        let mut notdown = 0;
        for (addr, indices) in self.entries() {
            let sttl = table.min(indices);
            res = res.min2(sttl);
            if !sttl.is_down() {
                sink.add_addr(addr);
                notdown += 1;
            } else if self.ignore_health {
                sink.add_addr(addr);
            }
        }

        if notdown < self.up_thresh {
            if !self.ignore_health {
                sink.wipe(self.family);
                for addr in self.addrs.iter() {
                    sink.add_addr(*addr);
                }
            }
            res.with_down(true)
        } else {
            res.with_down(false)
        }
    }
}

//------------ up_thresh -----------------------------------------------------

/// Returns the number of addresses out of `count` that need to be up.
///
/// This is `fraction` of `count` rounded up. Products that are an integer
/// but for floating point error are not rounded up. The result is always
/// between one and `count` for a non-zero `count`.
pub fn up_thresh(count: usize, fraction: f64) -> usize {
    let scaled = count as f64 * fraction;
    let nearest = scaled.round();
    let res = if (scaled - nearest).abs() < 1e-9 {
        nearest
    } else {
        scaled.ceil()
    };
    (res as usize).clamp(1, count.max(1))
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::result::DynResult;
    
    /// Creates a set of IPv4 addresses with one service each.
    ///
    /// The address at position `i` uses monitor index `i`.
    fn v4_set(count: u8, up_thresh: usize, ignore_health: bool) -> AddrSet {
        let addrs: Vec<IpAddr> = (1..=count)
            .map(|i| IpAddr::from([192, 0, 2, i]))
            .collect();
        let indices: Vec<_> =
            (0..count).map(|i| MonitorIndex::new(i.into())).collect();
        AddrSet::new(
            Family::V4,
            addrs.into(),
            indices.into(),
            1,
            up_thresh,
            ignore_health,
        )
    }

    fn states(down: &[bool]) -> Vec<Sttl> {
        down.iter().map(|down| Sttl::new(300, *down)).collect()
    }

    fn answer(res: &DynResult) -> Vec<u8> {
        res.v4().iter().map(|addr| addr.octets()[3]).collect()
    }

    #[test]
    fn all_up() {
        for ignore_health in [false, true] {
            let set = v4_set(4, 2, ignore_health);
            let mut res = DynResult::new();
            let sttl = set.evaluate(&states(&[false; 4]), &mut res);
            assert_eq!(sttl, Sttl::up(300));
            assert_eq!(answer(&res), [1, 2, 3, 4]);
        }
    }

    #[test]
    fn threshold_met_exactly() {
        let set = v4_set(4, 2, false);
        let mut res = DynResult::new();
        let sttl =
            set.evaluate(&states(&[true, false, true, false]), &mut res);
        assert!(!sttl.is_down());
        assert_eq!(answer(&res), [2, 4]);
    }

    #[test]
    fn threshold_missed_fails_open() {
        let set = v4_set(4, 2, false);
        let mut res = DynResult::new();
        let sttl = set.evaluate(&states(&[true, true, false, true]), &mut res);
        assert!(sttl.is_down());
        assert_eq!(answer(&res), [1, 2, 3, 4]);
    }

    #[test]
    fn single_down_address_fails() {
        let set = v4_set(1, 1, false);
        let mut res = DynResult::new();
        let sttl = set.evaluate(&states(&[true]), &mut res);
        assert_eq!(sttl, Sttl::down(300));
        assert_eq!(answer(&res), [1]);
    }

    #[test]
    fn fail_open_keeps_other_family() {
        let set = v4_set(2, 2, false);
        let mut res = DynResult::new();
        res.add_addr("2001:db8::1".parse().unwrap());
        set.evaluate(&states(&[true, false]), &mut res);
        assert_eq!(answer(&res), [1, 2]);
        assert_eq!(res.v6().len(), 1);
    }

    #[test]
    fn ignore_health_keeps_everything() {
        let set = v4_set(4, 2, true);

        let mut res = DynResult::new();
        let sttl =
            set.evaluate(&states(&[true, false, false, false]), &mut res);
        assert_eq!(answer(&res), [1, 2, 3, 4]);
        assert!(!sttl.is_down());

        let mut res = DynResult::new();
        let sttl = set.evaluate(&states(&[true, true, true, false]), &mut res);
        assert_eq!(answer(&res), [1, 2, 3, 4]);
        assert!(sttl.is_down());
    }

    #[test]
    fn ttl_includes_down_members() {
        let set = v4_set(3, 1, false);
        let table = vec![Sttl::up(300), Sttl::down(20), Sttl::up(100)];
        let mut res = DynResult::new();
        assert_eq!(set.evaluate(&table, &mut res), Sttl::up(20));
        assert_eq!(answer(&res), [1, 3]);
    }

    #[test]
    fn no_services_is_always_up() {
        let addrs: Vec<IpAddr> = vec!["2001:db8::1".parse().unwrap()];
        let set = AddrSet::new(
            Family::V6,
            addrs.into(),
            Vec::new().into(),
            0,
            1,
            false,
        );
        let mut res = DynResult::new();
        let table: Vec<Sttl> = Vec::new();
        assert_eq!(set.evaluate(&table, &mut res), Sttl::MAX);
        assert_eq!(res.v6().len(), 1);
    }

    #[test]
    fn several_services_per_address() {
        let addrs: Vec<IpAddr> = vec![
            "192.0.2.1".parse().unwrap(),
            "192.0.2.2".parse().unwrap(),
        ];
        let indices: Vec<_> = (0..4).map(MonitorIndex::new).collect();
        let set =
            AddrSet::new(Family::V4, addrs.into(), indices.into(), 2, 1, false);
        assert_eq!(set.indices(1), [MonitorIndex::new(2), MonitorIndex::new(3)]);

        // The first address is down through its second service.
        let table = states(&[false, true, false, false]);
        let mut res = DynResult::new();
        assert_eq!(set.evaluate(&table, &mut res), Sttl::up(300));
        assert_eq!(answer(&res), [2]);
    }

    #[test]
    fn up_thresh_rounding() {
        assert_eq!(up_thresh(4, 0.5), 2);
        assert_eq!(up_thresh(10, 0.5), 5);
        assert_eq!(up_thresh(5, 0.5), 3);
        assert_eq!(up_thresh(10, 0.3), 3);
        assert_eq!(up_thresh(10, 0.7), 7);
        assert_eq!(up_thresh(3, 0.1), 1);
        assert_eq!(up_thresh(100, 0.01), 1);
        assert_eq!(up_thresh(7, 1.0), 7);
        assert_eq!(up_thresh(1, 0.0001), 1);
        for count in 1..200 {
            for pct in 1..=100 {
                let res = up_thresh(count, f64::from(pct) / 100.0);
                assert!(res >= 1 && res <= count);
                assert_eq!(res, (count * pct as usize + 99) / 100);
            }
        }
    }
}
