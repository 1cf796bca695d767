//! Value vectors: the shared base type for resource stats, filters, and
//! weight vectors.
//!
//! A vector holds one integer per [`Stat`], each constrained to 0..=1000.
//! Vectors are stored in internal order regardless of which order the
//! source text used; formatting and parsing take an explicit ordering flag.

use serde::{Deserialize, Serialize};

use crate::class::ResourceClass;
use crate::error::{StatParseError, StatParseReport, ValidationError};
use crate::stat::{STAT_COUNT, Stat};

/// Upper bound for every stat slot.
pub const MAX_STAT_VALUE: u16 = 1000;

/// An ordered array of one value per stat, each in 0..=1000.
///
/// Immutable by convention: every constructor validates, [`set`](Self::set)
/// re-validates, and callers receive copies rather than references into
/// shared state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatVector([u16; STAT_COUNT]);

impl StatVector {
    /// The all-zero vector.
    pub const ZERO: StatVector = StatVector([0; STAT_COUNT]);

    /// Build a vector from a slice in internal order, validating length
    /// and every slot.
    pub fn new(values: &[u16]) -> Result<Self, ValidationError> {
        if values.len() != STAT_COUNT {
            return Err(ValidationError::WrongLength {
                expected: STAT_COUNT,
                actual: values.len(),
            });
        }
        let mut slots = [0u16; STAT_COUNT];
        for (&stat, &value) in Stat::all().iter().zip(values) {
            if value > MAX_STAT_VALUE {
                return Err(ValidationError::OutOfRange {
                    stat: stat.abbrev(),
                    value: value as i64,
                });
            }
            slots[stat.index()] = value;
        }
        Ok(Self(slots))
    }

    /// Convenience constructor for sparse vectors: all slots zero except
    /// the given (stat, value) pairs.
    pub fn from_pairs(pairs: &[(Stat, u16)]) -> Result<Self, ValidationError> {
        let mut v = Self::ZERO;
        for &(stat, value) in pairs {
            v.set(stat, value)?;
        }
        Ok(v)
    }

    pub fn get(&self, stat: Stat) -> u16 {
        self.0[stat.index()]
    }

    /// Set one slot, validating the range.
    pub fn set(&mut self, stat: Stat, value: u16) -> Result<(), ValidationError> {
        if value > MAX_STAT_VALUE {
            return Err(ValidationError::OutOfRange {
                stat: stat.abbrev(),
                value: value as i64,
            });
        }
        self.0[stat.index()] = value;
        Ok(())
    }

    /// Sum of all slots.
    pub fn sum(&self) -> u32 {
        self.0.iter().map(|&v| v as u32).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// Iterate (stat, value) pairs for every non-zero slot, internal order.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Stat, u16)> + '_ {
        Stat::all()
            .iter()
            .map(|&s| (s, self.get(s)))
            .filter(|&(_, v)| v > 0)
    }

    /// Format as space-delimited integers in the requested ordering.
    pub fn format(&self, game_order: bool) -> String {
        let order = if game_order {
            Stat::game_order()
        } else {
            Stat::all()
        };
        let mut out = String::with_capacity(STAT_COUNT * 5);
        for (i, &stat) in order.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&self.get(stat).to_string());
        }
        out
    }

    /// Parse exactly [`STAT_COUNT`] integers in the requested ordering.
    /// Tokens may be separated by whitespace or commas.
    pub fn parse(text: &str, game_order: bool) -> Result<Self, ValidationError> {
        let order = if game_order {
            Stat::game_order()
        } else {
            Stat::all()
        };
        let tokens: Vec<&str> = tokenize(text).collect();
        if tokens.len() != STAT_COUNT {
            return Err(ValidationError::WrongLength {
                expected: STAT_COUNT,
                actual: tokens.len(),
            });
        }
        let mut v = Self::ZERO;
        for (&stat, token) in order.iter().zip(tokens) {
            let value: i64 = token.parse().map_err(|_| ValidationError::NotANumber {
                stat: stat.abbrev(),
                token: token.to_string(),
            })?;
            if !(0..=MAX_STAT_VALUE as i64).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    stat: stat.abbrev(),
                    value,
                });
            }
            v.0[stat.index()] = value as u16;
        }
        Ok(v)
    }
}

/// Split a stat text blob into integer tokens. The game delimits with
/// commas, the remote database with whitespace; both appear in imports.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

// ── Resource stats ──────────────────────────────────────────────────────────

/// The stat values measured for one concrete resource instance.
///
/// A slot of 0 means "not expected / not present"; 1..=1000 is a genuine
/// measurement. Which slots must be non-zero is dictated by the resource's
/// class — see [`ResourceClass::validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceStats(StatVector);

impl ResourceStats {
    /// The "no data" constant. A resource carrying `BLANK` has not been
    /// measured at all.
    pub const BLANK: ResourceStats = ResourceStats(StatVector::ZERO);

    pub fn from_vector(v: StatVector) -> Self {
        Self(v)
    }

    pub fn as_vector(&self) -> &StatVector {
        &self.0
    }

    pub fn get(&self, stat: Stat) -> u16 {
        self.0.get(stat)
    }

    pub fn set(&mut self, stat: Stat, value: u16) -> Result<(), ValidationError> {
        self.0.set(stat, value)
    }

    pub fn sum(&self) -> u32 {
        self.0.sum()
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_zero()
    }

    pub fn format(&self, game_order: bool) -> String {
        self.0.format(game_order)
    }

    /// Parse a stat blob shaped by `class`: the tokens correspond, in game
    /// order, to exactly the stats the class expects. Non-expected stats
    /// are implicitly zero.
    ///
    /// All problems are aggregated into one [`StatParseReport`]; parsing
    /// never stops at the first bad token.
    pub fn parse_for_class(text: &str, class: &ResourceClass) -> Result<Self, StatParseReport> {
        let mut report = StatParseReport::new();
        let mut tokens = tokenize(text);
        let mut stats = ResourceStats::BLANK;

        for &stat in Stat::game_order() {
            if !class.expects(stat) {
                continue;
            }
            match tokens.next() {
                None => report.push(StatParseError::MissingToken {
                    stat: stat.abbrev(),
                }),
                Some(token) => match token.parse::<i64>() {
                    Err(_) => report.push(StatParseError::BadToken {
                        stat: stat.abbrev(),
                        token: token.to_string(),
                    }),
                    Ok(n) if !(1..=MAX_STAT_VALUE as i64).contains(&n) => {
                        report.push(StatParseError::ValueOutOfRange {
                            stat: stat.abbrev(),
                            value: n,
                        })
                    }
                    Ok(n) => stats.0.0[stat.index()] = n as u16,
                },
            }
        }

        let surplus: Vec<&str> = tokens.collect();
        if let Some(first) = surplus.first() {
            report.push(StatParseError::SurplusTokens {
                count: surplus.len(),
                first: first.to_string(),
            });
        }

        if report.is_empty() { Ok(stats) } else { Err(report) }
    }
}

// ── Filters ─────────────────────────────────────────────────────────────────

/// User-supplied per-stat thresholds. Zero means "don't care about this
/// stat"; there is no notion of "expected" here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter(StatVector);

impl ResourceFilter {
    pub const EMPTY: ResourceFilter = ResourceFilter(StatVector::ZERO);

    pub fn from_vector(v: StatVector) -> Self {
        Self(v)
    }

    pub fn get(&self, stat: Stat) -> u16 {
        self.0.get(stat)
    }

    pub fn set(&mut self, stat: Stat, value: u16) -> Result<(), ValidationError> {
        self.0.set(stat, value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_zero()
    }

    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Stat, u16)> + '_ {
        self.0.iter_nonzero()
    }
}

// ── Weights ─────────────────────────────────────────────────────────────────

/// Per-stat weights used to collapse a resource's stats into one scalar
/// rating. Usually the non-zero weights sum to 100, but the rating engine
/// normalizes by the actual total, so any positive weights work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightVector(StatVector);

impl WeightVector {
    pub fn from_vector(v: StatVector) -> Self {
        Self(v)
    }

    pub fn get(&self, stat: Stat) -> u16 {
        self.0.get(stat)
    }

    pub fn total(&self) -> u32 {
        self.0.sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_zero()
    }

    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Stat, u16)> + '_ {
        self.0.iter_nonzero()
    }
}

#[cfg(test)]
#[path = "tests/values_tests.rs"]
mod tests;
