//! Tagged bitsets for region collection flags.

use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// How a named region collection is drawn and stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionFlags(u32);

impl RegionFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Draw empty regions as a vertical bar.
    pub const DRAW_EMPTY: Self = Self(1 << 0);
    /// Do not show the regions on the minimap.
    pub const HIDE_ON_MINIMAP: Self = Self(1 << 1);
    /// Draw empty regions as a horizontal bar.
    pub const DRAW_EMPTY_AS_OVERWRITE: Self = Self(1 << 2);
    /// Keep the regions across process restarts (keyed by file identity and key).
    pub const PERSISTENT: Self = Self(1 << 4);
    /// Disable filling the regions.
    pub const DRAW_NO_FILL: Self = Self(1 << 5);
    /// Do not record region changes in undo history.
    pub const NO_UNDO: Self = Self(1 << 6);
    /// Disable the outline around the regions.
    pub const DRAW_NO_OUTLINE: Self = Self(1 << 8);
    /// Draw a solid underline under the regions.
    pub const DRAW_SOLID_UNDERLINE: Self = Self(1 << 9);
    /// Draw a stippled underline under the regions.
    pub const DRAW_STIPPLED_UNDERLINE: Self = Self(1 << 10);
    /// Draw a squiggly underline under the regions.
    pub const DRAW_SQUIGGLY_UNDERLINE: Self = Self(1 << 11);
    /// Do not draw the regions at all.
    pub const HIDDEN: Self = Self(1 << 7);

    /// Create flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Copy with the flags in `other` cleared.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for RegionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RegionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_and_query() {
        let flags = RegionFlags::DRAW_NO_FILL
            | RegionFlags::DRAW_NO_OUTLINE
            | RegionFlags::DRAW_SQUIGGLY_UNDERLINE;
        assert!(flags.contains(RegionFlags::DRAW_NO_FILL | RegionFlags::DRAW_NO_OUTLINE));
        assert!(!flags.contains(RegionFlags::PERSISTENT));
        assert_eq!(flags.without(RegionFlags::DRAW_NO_FILL).bits(), (1 << 8) | (1 << 11));
        assert!(RegionFlags::NONE.is_empty());
    }
}
