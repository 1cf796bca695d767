pub(crate) mod deplete;
pub(crate) mod dupes;
pub(crate) mod filter;
pub(crate) mod galaxies;
pub(crate) mod lookup;
pub(crate) mod rate;
pub(crate) mod refresh;
pub(crate) mod status;
pub(crate) mod submit;
pub(crate) mod watch;

use spawn_ledger_core::{Stat, StatVector};

use crate::error::CliError;

/// Parse "OQ=966,DR=500"-style pairs into a vector.
pub(crate) fn parse_stat_pairs(text: &str) -> Result<StatVector, CliError> {
    let mut vector = StatVector::ZERO;
    for pair in text.split(',').filter(|p| !p.trim().is_empty()) {
        let (abbrev, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::usage(format!("expected STAT=VALUE, got '{pair}'")))?;
        let stat: Stat = abbrev
            .trim()
            .parse()
            .map_err(|e| CliError::usage(format!("{e}")))?;
        let value: u16 = value
            .trim()
            .parse()
            .map_err(|_| CliError::usage(format!("'{}' is not a stat value", value.trim())))?;
        vector.set(stat, value)?;
    }
    Ok(vector)
}
