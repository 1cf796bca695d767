use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of stats a resource carries. Fixed by the game.
pub const STAT_COUNT: usize = 11;

/// One named numeric attribute of a resource.
///
/// Variants are declared in *internal order* (alphabetical by abbreviation),
/// which is the order used for storage and vector indexing. The game itself
/// lists stats in a different order when printing or accepting stat text —
/// see [`Stat::game_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    /// Conductivity
    Cd,
    /// Cold resistance
    Cr,
    /// Decay resistance
    Dr,
    /// Entangle resistance
    Er,
    /// Flavor
    Fl,
    /// Heat resistance
    Hr,
    /// Malleability
    Ma,
    /// Overall quality
    Oq,
    /// Potential energy
    Pe,
    /// Shock resistance
    Sr,
    /// Unit toughness
    Ut,
}

/// All stats in internal (storage) order.
const INTERNAL_ORDER: [Stat; STAT_COUNT] = [
    Stat::Cd,
    Stat::Cr,
    Stat::Dr,
    Stat::Er,
    Stat::Fl,
    Stat::Hr,
    Stat::Ma,
    Stat::Oq,
    Stat::Pe,
    Stat::Sr,
    Stat::Ut,
];

/// All stats in the order the game displays and parses them.
const GAME_ORDER: [Stat; STAT_COUNT] = [
    Stat::Er,
    Stat::Cr,
    Stat::Cd,
    Stat::Dr,
    Stat::Fl,
    Stat::Hr,
    Stat::Ma,
    Stat::Pe,
    Stat::Oq,
    Stat::Sr,
    Stat::Ut,
];

impl Stat {
    /// All stats in internal order.
    pub fn all() -> &'static [Stat] {
        &INTERNAL_ORDER
    }

    /// All stats in the order the game prints them.
    pub fn game_order() -> &'static [Stat] {
        &GAME_ORDER
    }

    /// Stable index into internal order. Relies on the variants being
    /// declared in internal order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Two-letter abbreviation used by the game and the remote database.
    pub fn abbrev(self) -> &'static str {
        match self {
            Self::Cd => "CD",
            Self::Cr => "CR",
            Self::Dr => "DR",
            Self::Er => "ER",
            Self::Fl => "FL",
            Self::Hr => "HR",
            Self::Ma => "MA",
            Self::Oq => "OQ",
            Self::Pe => "PE",
            Self::Sr => "SR",
            Self::Ut => "UT",
        }
    }

    /// Full display name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cd => "Conductivity",
            Self::Cr => "Cold Resistance",
            Self::Dr => "Decay Resistance",
            Self::Er => "Entangle Resistance",
            Self::Fl => "Flavor",
            Self::Hr => "Heat Resistance",
            Self::Ma => "Malleability",
            Self::Oq => "Overall Quality",
            Self::Pe => "Potential Energy",
            Self::Sr => "Shock Resistance",
            Self::Ut => "Unit Toughness",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// Error when a stat abbreviation fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatAbbrevError(pub String);

impl fmt::Display for StatAbbrevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stat abbreviation: '{}'", self.0)
    }
}

impl std::error::Error for StatAbbrevError {}

impl FromStr for Stat {
    type Err = StatAbbrevError;

    /// Parse a two-letter abbreviation, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for &stat in Stat::all() {
            if stat.abbrev().eq_ignore_ascii_case(s) {
                return Ok(stat);
            }
        }
        Err(StatAbbrevError(s.to_string()))
    }
}
