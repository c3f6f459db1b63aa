use crate::bst::Side;
use std::fmt;

/// The balance factor of an AVL node: `height(right) - height(left)`.
///
/// Between public operations every node's factor is `-1`, `0`, or `1`. The fix-up walks compute
/// the transient `-2` and `2` states without ever storing them.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Balance(i8);

impl Balance {
    pub const EVEN: Balance = Balance(0);

    /// A factor leaning one level toward `side`.
    pub fn leaning(side: Side) -> Balance {
        Balance(side.delta())
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// The factor after the subtree on `side` grows by one level.
    pub fn shifted(self, side: Side) -> Balance {
        let value = self.0 + side.delta();
        debug_assert!((-2..=2).contains(&value), "balance factor {} out of range", value);
        Balance(value)
    }

    /// The side whose subtree is taller, or `None` when both are the same height.
    pub fn heavy_side(self) -> Option<Side> {
        match self.0 {
            0 => None,
            value if value < 0 => Some(Side::Left),
            _ => Some(Side::Right),
        }
    }

    pub fn is_valid(self) -> bool {
        (-1..=1).contains(&self.0)
    }
}

impl fmt::Debug for Balance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}
