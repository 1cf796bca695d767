use std::fmt;

use thiserror::Error;

/// Validation failures for stat values and resource fields.
///
/// Always surfaced synchronously to the caller; values are never silently
/// clamped or corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A stat value outside 0..=1000.
    #[error("{stat} value {value} is out of range 0..=1000")]
    OutOfRange { stat: &'static str, value: i64 },

    /// A vector constructed from a slice of the wrong length.
    #[error("expected {expected} stat values, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// A stat token that is not an integer.
    #[error("token '{token}' for {stat} is not a number")]
    NotANumber { stat: &'static str, token: String },

    /// An expected stat that is missing or out of its measured range.
    #[error("'{class}' expects {stat} in 1..=1000, got {value}")]
    ExpectedStatInvalid {
        class: String,
        stat: &'static str,
        value: u16,
    },

    /// A stat the class does not expect carrying a non-zero value.
    #[error("'{class}' does not expect {stat}, but it is {value}")]
    UnexpectedStat {
        class: String,
        stat: &'static str,
        value: u16,
    },

    /// A resource name shorter than the remote database accepts.
    #[error("resource name '{0}' is too short (minimum 3 characters)")]
    NameTooShort(String),
}

/// One failure encountered while parsing a stat text blob against a class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatParseError {
    /// A token that is not an integer.
    #[error("token '{token}' for {stat} is not a number")]
    BadToken { stat: &'static str, token: String },

    /// A token that parsed but falls outside the measured range.
    #[error("{stat} value {value} is out of range 1..=1000")]
    ValueOutOfRange { stat: &'static str, value: i64 },

    /// Tokens ran out before every expected stat was filled.
    #[error("no value for expected stat {stat}")]
    MissingToken { stat: &'static str },

    /// Tokens remained after every expected stat was filled.
    #[error("{count} surplus token(s) starting at '{first}'")]
    SurplusTokens { count: usize, first: String },
}

/// Aggregate of every failure from one stat-text parse.
///
/// Parsing never aborts on the first bad token: the whole blob is walked
/// and all problems are reported in one message, so a user fixing an
/// import line sees everything wrong with it at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatParseReport {
    errors: Vec<StatParseError>,
}

impl StatParseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: StatParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[StatParseError] {
        &self.errors
    }
}

impl fmt::Display for StatParseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parse error(s): ", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StatParseReport {}
