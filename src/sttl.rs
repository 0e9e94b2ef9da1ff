//! Combined health state and TTL values.
//!
//! The health monitor reports the state of every monitored address and
//! service as a single 32 bit word, an [`Sttl`]. It carries a TTL of up to
//! 28 bits and a flag marking the monitored thing as down. Results for
//! several monitors are combined by taking the smallest TTL and marking the
//! result down if any input is down. This combination is associative and
//! commutative, so results can be folded in any order.

use core::fmt;

//------------ Sttl ----------------------------------------------------------

/// A health state and TTL packed into a single word.
///
/// Bit 31 is the down flag and the lowest 28 bits are the TTL. All other
/// bits are always zero.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Sttl(u32);

impl Sttl {
    /// The flag marking a state as down.
    pub const DOWN: u32 = 1 << 31;

    /// The mask for the TTL bits.
    pub const TTL_MASK: u32 = (1 << 28) - 1;

    /// The largest TTL an `Sttl` can carry.
    pub const TTL_MAX: u32 = Self::TTL_MASK;

    /// An up state with the largest possible TTL.
    ///
    /// This is the neutral element for [`min2`][Self::min2].
    pub const MAX: Self = Sttl(Self::TTL_MAX);

    /// Creates a new value from a TTL and a down flag.
    ///
    /// TTLs larger than [`TTL_MAX`][Self::TTL_MAX] are capped.
    pub const fn new(ttl: u32, down: bool) -> Self {
        let ttl = if ttl > Self::TTL_MAX { Self::TTL_MAX } else { ttl };
        if down {
            Sttl(ttl | Self::DOWN)
        } else {
            Sttl(ttl)
        }
    }

    /// Creates an up value with the given TTL.
    pub const fn up(ttl: u32) -> Self {
        Self::new(ttl, false)
    }

    /// Creates a down value with the given TTL.
    pub const fn down(ttl: u32) -> Self {
        Self::new(ttl, true)
    }

    /// Creates a value from its raw bits, dropping any undefined bits.
    pub const fn from_bits(bits: u32) -> Self {
        Sttl(bits & (Self::DOWN | Self::TTL_MASK))
    }

    /// Returns the raw bits of the value.
    pub const fn into_bits(self) -> u32 {
        self.0
    }

    /// Returns the TTL.
    pub const fn ttl(self) -> u32 {
        self.0 & Self::TTL_MASK
    }

    /// Returns whether the value is marked down.
    pub const fn is_down(self) -> bool {
        self.0 & Self::DOWN != 0
    }

    /// Returns the same TTL with the down flag set to `down`.
    #[must_use]
    pub const fn with_down(self, down: bool) -> Self {
        Self::new(self.ttl(), down)
    }

    /// Combines two values.
    ///
    /// The result has the smaller of the two TTLs and is down if either
    /// value is down.
    #[must_use]
    pub fn min2(self, other: Self) -> Self {
        let down = (self.0 | other.0) & Self::DOWN;
        Sttl(down | self.ttl().min(other.ttl()))
    }

    /// Combines all values of an iterator.
    ///
    /// An empty iterator results in [`Sttl::MAX`], i.e., up.
    pub fn min<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        iter.into_iter().fold(Self::MAX, Self::min2)
    }
}

//--- Default

impl Default for Sttl {
    fn default() -> Self {
        Self::MAX
    }
}

//--- Display

impl fmt::Display for Sttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_down() {
            write!(f, "DOWN/{}", self.ttl())
        } else {
            write!(f, "UP/{}", self.ttl())
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn samples() -> [Sttl; 6] {
        [
            Sttl::MAX,
            Sttl::up(0),
            Sttl::up(300),
            Sttl::down(30),
            Sttl::down(Sttl::TTL_MAX),
            Sttl::up(31),
        ]
    }

    #[test]
    fn packing() {
        let sttl = Sttl::down(42);
        assert!(sttl.is_down());
        assert_eq!(sttl.ttl(), 42);
        assert_eq!(sttl.into_bits(), Sttl::DOWN | 42);
        assert!(!sttl.with_down(false).is_down());
        assert_eq!(Sttl::up(u32::MAX).ttl(), Sttl::TTL_MAX);
        assert_eq!(Sttl::from_bits(u32::MAX), Sttl::down(Sttl::TTL_MAX));
    }

    #[test]
    fn min2_takes_lowest_ttl_and_any_down() {
        assert_eq!(Sttl::up(300).min2(Sttl::down(600)), Sttl::down(300));
        assert_eq!(Sttl::up(300).min2(Sttl::up(60)), Sttl::up(60));
        assert_eq!(Sttl::MAX.min2(Sttl::up(5)), Sttl::up(5));
    }

    #[test]
    fn min2_is_commutative_and_associative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(a.min2(b), b.min2(a));
                for c in samples() {
                    assert_eq!(a.min2(b).min2(c), a.min2(b.min2(c)));
                }
            }
        }
    }

    #[test]
    fn min_of_nothing_is_up() {
        assert_eq!(Sttl::min(core::iter::empty()), Sttl::MAX);
        assert_eq!(
            Sttl::min([Sttl::up(10), Sttl::down(20)]),
            Sttl::down(10)
        );
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Sttl::down(5)), "DOWN/5");
        assert_eq!(format!("{}", Sttl::up(7)), "UP/7");
    }
}
