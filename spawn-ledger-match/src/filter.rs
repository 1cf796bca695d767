//! Plain-filter predicates over a resource's stats.

use spawn_ledger_core::{ResourceFilter, ResourceStats, Stat};

/// Plain-filter acceptance.
///
/// With `require_all`, every non-zero filter threshold must be met by the
/// resource; any failing stat rejects. Without it, meeting any single
/// threshold accepts.
///
/// An all-zero filter accepts everything under `require_all` and rejects
/// everything otherwise. The asymmetry is intentional: "no thresholds all
/// of which must hold" is vacuously true, "no threshold at least one of
/// which must hold" is vacuously false.
pub fn is_better(filter: &ResourceFilter, stats: &ResourceStats, require_all: bool) -> bool {
    if require_all {
        for (stat, threshold) in filter.iter_nonzero() {
            if stats.get(stat) < threshold {
                return false;
            }
        }
        true
    } else {
        for (stat, threshold) in filter.iter_nonzero() {
            if stats.get(stat) >= threshold {
                return true;
            }
        }
        false
    }
}

/// Union test: true iff some stat is non-zero in *both* the filter and the
/// resource.
///
/// A resource whose expected stat was never measured carries 0 there and
/// can never satisfy the union on that stat, even though the absence may be
/// a data-quality gap rather than a true zero. The remote data cannot tell
/// the two apart, so neither do we.
pub fn has_minimum_one_value(filter: &ResourceFilter, stats: &ResourceStats) -> bool {
    filter.iter_nonzero().any(|(stat, _)| stats.get(stat) > 0)
}

/// Completeness pre-check: the resource carries a non-zero value for every
/// stat in `required`. Guards run this before their real logic so that
/// half-measured resources don't trigger alerts, unless the guard opts out.
pub fn has_all_values(required: impl IntoIterator<Item = Stat>, stats: &ResourceStats) -> bool {
    required.into_iter().all(|stat| stats.get(stat) > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawn_ledger_core::StatVector;

    fn filter(pairs: &[(Stat, u16)]) -> ResourceFilter {
        ResourceFilter::from_vector(StatVector::from_pairs(pairs).unwrap())
    }

    fn stats(pairs: &[(Stat, u16)]) -> ResourceStats {
        ResourceStats::from_vector(StatVector::from_pairs(pairs).unwrap())
    }

    #[test]
    fn require_all_needs_every_threshold() {
        let f = filter(&[(Stat::Oq, 500), (Stat::Dr, 300)]);
        let good = stats(&[(Stat::Oq, 600), (Stat::Dr, 300)]);
        let partial = stats(&[(Stat::Oq, 600), (Stat::Dr, 299)]);
        assert!(is_better(&f, &good, true));
        assert!(!is_better(&f, &partial, true));
    }

    #[test]
    fn require_any_accepts_on_first_met_threshold() {
        let f = filter(&[(Stat::Oq, 500), (Stat::Dr, 300)]);
        let partial = stats(&[(Stat::Oq, 600), (Stat::Dr, 1)]);
        let neither = stats(&[(Stat::Oq, 499), (Stat::Dr, 299)]);
        assert!(is_better(&f, &partial, false));
        assert!(!is_better(&f, &neither, false));
    }

    #[test]
    fn empty_filter_asymmetry() {
        let f = ResourceFilter::EMPTY;
        let any = stats(&[(Stat::Oq, 1)]);
        assert!(is_better(&f, &any, true));
        assert!(!is_better(&f, &any, false));
        assert!(is_better(&f, &ResourceStats::BLANK, true));
        assert!(!is_better(&f, &ResourceStats::BLANK, false));
    }

    #[test]
    fn tightening_a_threshold_is_monotonic() {
        let base = stats(&[(Stat::Oq, 700), (Stat::Dr, 400)]);
        for threshold in [1u16, 300, 400, 401, 700, 701, 1000] {
            let f = filter(&[(Stat::Oq, 500), (Stat::Dr, threshold)]);
            let accepted = is_better(&f, &base, true);
            // Tighten OQ upward; an accept may flip to reject, never the
            // reverse.
            let tighter = filter(&[(Stat::Oq, 800), (Stat::Dr, threshold)]);
            let accepted_tighter = is_better(&tighter, &base, true);
            assert!(!accepted_tighter || accepted);
        }
    }

    #[test]
    fn union_ignores_unmeasured_stats() {
        let f = filter(&[(Stat::Pe, 200)]);
        let measured = stats(&[(Stat::Pe, 1)]);
        let unmeasured = stats(&[(Stat::Oq, 900)]);
        assert!(has_minimum_one_value(&f, &measured));
        assert!(!has_minimum_one_value(&f, &unmeasured));
        assert!(!has_minimum_one_value(&f, &ResourceStats::BLANK));
    }

    #[test]
    fn has_all_values_checks_presence_not_magnitude() {
        let s = stats(&[(Stat::Oq, 1), (Stat::Dr, 1)]);
        assert!(has_all_values([Stat::Oq, Stat::Dr], &s));
        assert!(!has_all_values([Stat::Oq, Stat::Pe], &s));
    }
}
