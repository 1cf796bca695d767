//! Weighted rating: collapse a resource's stats into one scalar against a
//! weight vector, normalized by class caps.

use spawn_ledger_core::{ResourceClass, ResourceStats, WeightVector};

/// Rate `stats` against `weights`, returning a scalar in 0..=1000.
///
/// Caps come from `caps_source` when given, otherwise from the resource's
/// own class. Per stat the contribution is `weight * min(value, cap) / cap`;
/// the total is normalized by the sum of non-zero weights, scaled to 1000,
/// and rounded half-up. An empty weight vector rates 0.
///
/// `zero_is_max` treats a weighted stat the resource carries as 0 as if it
/// sat at its cap. Many classes legitimately omit stats, and a weight
/// vector built for a whole branch of the taxonomy would otherwise punish
/// every class missing one of the weighted stats.
///
/// `own_cap_wins` is the alternate cap rule: when the resource's own class
/// caps a stat higher than `caps_source` does, the higher own-class cap is
/// used for that stat.
pub fn rate(
    weights: &WeightVector,
    stats: &ResourceStats,
    own_class: &ResourceClass,
    caps_source: Option<&ResourceClass>,
    zero_is_max: bool,
    own_cap_wins: bool,
) -> u16 {
    let total = weights.total();
    if total == 0 {
        return 0;
    }

    let caps_class = caps_source.unwrap_or(own_class);
    let mut acc = 0f64;

    for (stat, weight) in weights.iter_nonzero() {
        let mut cap = caps_class.cap(stat);
        if own_cap_wins && own_class.cap(stat) > cap {
            cap = own_class.cap(stat);
        }

        let value = stats.get(stat);
        let ratio = if value == 0 {
            // Unmeasured or not carried by the class at all.
            if zero_is_max { 1.0 } else { 0.0 }
        } else if cap == 0 {
            // Measured value but no cap from either class: full marks.
            // Happens only with a caps source that lacks the stat while
            // the measurement predates a taxonomy correction.
            1.0
        } else {
            (value.min(cap) as f64) / (cap as f64)
        };

        acc += weight as f64 * ratio;
    }

    let rated = (acc * 1000.0 / total as f64).round();
    // Clamp is a formality: every ratio is <= 1.0.
    rated.clamp(0.0, 1000.0) as u16
}
