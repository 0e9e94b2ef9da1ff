//! Helpers for bounded tunables.

use std::cmp;

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a tunable.
#[derive(Clone, Copy, Debug)]
pub struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    pub fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn limit_clamps_both_ends() {
        const VAL: DefMinMax<usize> = DefMinMax::new(1024, 256, 4096);
        assert_eq!(VAL.default(), 1024);
        assert_eq!(VAL.limit(1), 256);
        assert_eq!(VAL.limit(2000), 2000);
        assert_eq!(VAL.limit(1 << 20), 4096);
    }
}
