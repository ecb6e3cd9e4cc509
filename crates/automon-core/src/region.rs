//! Screen regions used to prune the template search area

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Where on screen a template is expected.
///
/// Plain bit flags: `TOP`/`BOTTOM` select a horizontal half, `LEFT`/`RIGHT` a
/// vertical half, and combining one of each gives a quadrant. `ALL` (no bits)
/// disables pruning. `AD_AREA` is special and selects the top-left and
/// top-right ninths of the screen, searched independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(u8);

const NAMED: &[(&str, Region)] = &[
    ("ALL", Region::ALL),
    ("TOP", Region::TOP),
    ("BOTTOM", Region::BOTTOM),
    ("LEFT", Region::LEFT),
    ("RIGHT", Region::RIGHT),
    ("TOP_LEFT", Region::TOP_LEFT),
    ("TOP_RIGHT", Region::TOP_RIGHT),
    ("BOTTOM_LEFT", Region::BOTTOM_LEFT),
    ("BOTTOM_RIGHT", Region::BOTTOM_RIGHT),
    ("AD_AREA", Region::AD_AREA),
];

impl Region {
    pub const ALL: Region = Region(0);
    pub const TOP: Region = Region(1);
    pub const BOTTOM: Region = Region(2);
    pub const LEFT: Region = Region(4);
    pub const RIGHT: Region = Region(8);
    pub const TOP_LEFT: Region = Region(1 | 4);
    pub const TOP_RIGHT: Region = Region(1 | 8);
    pub const BOTTOM_LEFT: Region = Region(2 | 4);
    pub const BOTTOM_RIGHT: Region = Region(2 | 8);
    pub const AD_AREA: Region = Region(16);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Region) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_all(self) -> bool {
        self.0 == 0
    }

    /// Rectangles of a `width`×`height` frame that should be searched.
    ///
    /// `TOP` wins over `BOTTOM` and `LEFT` over `RIGHT` when both are set.
    pub fn crops(self, width: u32, height: u32) -> Vec<Rect> {
        if self.contains(Region::AD_AREA) {
            let (third_w, third_h) = (width / 3, height / 3);
            return vec![
                Rect::new(0, 0, third_w, third_h),
                Rect::new(width - third_w, 0, third_w, third_h),
            ];
        }

        let (mut y_start, mut y_end) = (0, height);
        let (mut x_start, mut x_end) = (0, width);

        if self.contains(Region::TOP) {
            y_end = height / 2;
        } else if self.contains(Region::BOTTOM) {
            y_start = height / 2;
        }

        if self.contains(Region::LEFT) {
            x_end = width / 2;
        } else if self.contains(Region::RIGHT) {
            x_start = width / 2;
        }

        vec![Rect::new(x_start, y_start, x_end - x_start, y_end - y_start)]
    }

    /// Tightest half/quadrant fully containing `found` in a frame of the
    /// given size, if any.
    pub fn enclosing(found: Rect, width: u32, height: u32) -> Option<Region> {
        let mut bits = 0;
        if found.bottom() <= height / 2 {
            bits |= Region::TOP.0;
        } else if found.y >= height / 2 {
            bits |= Region::BOTTOM.0;
        }

        if found.right() <= width / 2 {
            bits |= Region::LEFT.0;
        } else if found.x >= width / 2 {
            bits |= Region::RIGHT.0;
        }

        (bits != 0).then_some(Region(bits))
    }
}

impl BitOr for Region {
    type Output = Region;

    fn bitor(self, rhs: Region) -> Region {
        Region(self.0 | rhs.0)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = NAMED.iter().find(|(_, r)| r == self) {
            return f.write_str(name);
        }
        let parts: Vec<&str> = NAMED[1..5]
            .iter()
            .filter(|(_, r)| self.contains(*r))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&parts.join("|"))
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut region = Region::ALL;
        for part in s.split('|') {
            let part = part.trim();
            let part = part.strip_prefix("Region.").unwrap_or(part);
            let (_, named) = NAMED
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .ok_or_else(|| format!("unknown region '{}'", part))?;
            region = region | *named;
        }
        Ok(region)
    }
}

impl TryFrom<String> for Region {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.to_string()
    }
}
