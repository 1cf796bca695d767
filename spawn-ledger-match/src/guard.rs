//! Guards: user-configured matchers that alert on qualifying resources.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use spawn_ledger_core::{ResourceClass, ResourceFilter, ResourceStats, Stat, WeightVector};

use crate::filter::{has_all_values, is_better};
use crate::weights::rate;

/// How caps are resolved when a guard rates a resource.
#[derive(Debug, Clone, Default)]
pub struct CapPolicy {
    /// Class providing the caps; `None` uses the resource's own class.
    pub caps_source: Option<Arc<ResourceClass>>,
    /// Treat a weighted-but-zero resource stat as sitting at its cap.
    pub zero_is_max: bool,
    /// Prefer the resource's own class cap when it is higher than the
    /// caps source's (the user's cap-treatment preference).
    pub own_cap_wins: bool,
}

/// One matching strategy a guard can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GuardLogic {
    /// Threshold filter; `require_all` selects all-of vs any-of.
    Plain {
        filter: ResourceFilter,
        require_all: bool,
    },
    /// Weighted rating compared against the guard's limit.
    Weighted { weights: WeightVector },
}

impl GuardLogic {
    fn matches(
        &self,
        stats: &ResourceStats,
        class: &ResourceClass,
        caps: &CapPolicy,
        limit: u16,
    ) -> bool {
        match self {
            GuardLogic::Plain {
                filter,
                require_all,
            } => is_better(filter, stats, *require_all),
            GuardLogic::Weighted { weights } => {
                rate(
                    weights,
                    stats,
                    class,
                    caps.caps_source.as_deref(),
                    caps.zero_is_max,
                    caps.own_cap_wins,
                ) >= limit
            }
        }
    }

    /// Stats this logic references (non-zero slots).
    fn referenced_stats(&self) -> Vec<Stat> {
        match self {
            GuardLogic::Plain { filter, .. } => {
                filter.iter_nonzero().map(|(s, _)| s).collect()
            }
            GuardLogic::Weighted { weights } => {
                weights.iter_nonzero().map(|(s, _)| s).collect()
            }
        }
    }
}

/// A user-defined matcher: primary logic, optional secondary logic, and the
/// knobs controlling the completeness pre-check and the weighted limit.
///
/// `last_triggered` is transient session state — it orders the guard list
/// by recency of alarm and is reset whenever the underlying resource set
/// refreshes. It is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guard {
    pub name: String,
    pub primary: GuardLogic,
    pub secondary: Option<GuardLogic>,
    /// Skip the completeness pre-check: match resources even when some
    /// referenced stat has no measured value yet.
    pub accept_no_stats: bool,
    /// Minimum rate a weighted logic must reach. Ignored by plain logic.
    pub limit: u16,
    #[serde(skip)]
    last_triggered: Option<Instant>,
}

impl Guard {
    pub fn new(name: impl Into<String>, primary: GuardLogic) -> Self {
        Self {
            name: name.into(),
            primary,
            secondary: None,
            accept_no_stats: false,
            limit: 0,
            last_triggered: None,
        }
    }

    /// Whether this guard accepts the resource.
    ///
    /// Acceptance is conjunctive: the primary logic must match, and the
    /// secondary logic (when set) must match too. Unless `accept_no_stats`
    /// is set, a resource missing a measured value for any stat either
    /// logic references is rejected up front.
    pub fn matches(&self, stats: &ResourceStats, class: &ResourceClass, caps: &CapPolicy) -> bool {
        if !self.accept_no_stats {
            let mut required = self.primary.referenced_stats();
            if let Some(secondary) = &self.secondary {
                required.extend(secondary.referenced_stats());
            }
            if !has_all_values(required, stats) {
                return false;
            }
        }

        if !self.primary.matches(stats, class, caps, self.limit) {
            return false;
        }
        match &self.secondary {
            Some(secondary) => secondary.matches(stats, class, caps, self.limit),
            None => true,
        }
    }

    /// Record that this guard just fired.
    pub fn record_trigger(&mut self) {
        self.last_triggered = Some(Instant::now());
    }

    /// Clear the transient trigger mark (the resource set was refreshed).
    pub fn reset_trigger(&mut self) {
        self.last_triggered = None;
    }

    pub fn last_triggered(&self) -> Option<Instant> {
        self.last_triggered
    }

    /// Ordering for guard lists: most recently triggered first, guards
    /// that never fired last, ties broken by name ascending.
    pub fn recent_first(a: &Guard, b: &Guard) -> Ordering {
        match (b.last_triggered, a.last_triggered) {
            (Some(tb), Some(ta)) => tb.cmp(&ta).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => a.name.cmp(&b.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawn_ledger_core::StatVector;

    fn class() -> ResourceClass {
        ResourceClass {
            token: "test".into(),
            name: "Test".into(),
            parent: None,
            caps: StatVector::from_pairs(&[(Stat::Oq, 1000), (Stat::Dr, 1000)]).unwrap(),
            spawnable: true,
            space_or_recycled: false,
        }
    }

    fn stats(pairs: &[(Stat, u16)]) -> ResourceStats {
        ResourceStats::from_vector(StatVector::from_pairs(pairs).unwrap())
    }

    fn plain(pairs: &[(Stat, u16)], require_all: bool) -> GuardLogic {
        GuardLogic::Plain {
            filter: ResourceFilter::from_vector(StatVector::from_pairs(pairs).unwrap()),
            require_all,
        }
    }

    #[test]
    fn primary_and_secondary_are_conjunctive() {
        let mut guard = Guard::new("both", plain(&[(Stat::Oq, 500)], true));
        guard.secondary = Some(plain(&[(Stat::Dr, 500)], true));
        let caps = CapPolicy::default();
        let c = class();

        assert!(guard.matches(&stats(&[(Stat::Oq, 600), (Stat::Dr, 600)]), &c, &caps));
        assert!(!guard.matches(&stats(&[(Stat::Oq, 600), (Stat::Dr, 400)]), &c, &caps));
        assert!(!guard.matches(&stats(&[(Stat::Oq, 400), (Stat::Dr, 600)]), &c, &caps));
    }

    #[test]
    fn incomplete_resources_are_rejected_unless_opted_in() {
        let mut guard = Guard::new("oq+dr", plain(&[(Stat::Oq, 1), (Stat::Dr, 500)], false));
        let caps = CapPolicy::default();
        let c = class();
        // DR was never measured; the any-of logic would match on OQ alone,
        // but the pre-check rejects first.
        let half_measured = stats(&[(Stat::Oq, 900)]);
        assert!(!guard.matches(&half_measured, &c, &caps));

        guard.accept_no_stats = true;
        assert!(guard.matches(&half_measured, &c, &caps));
    }

    #[test]
    fn weighted_guard_honors_limit() {
        let weights =
            WeightVector::from_vector(StatVector::from_pairs(&[(Stat::Oq, 100)]).unwrap());
        let mut guard = Guard::new("rated", GuardLogic::Weighted { weights });
        guard.limit = 800;
        let caps = CapPolicy::default();
        let c = class();

        assert!(guard.matches(&stats(&[(Stat::Oq, 800)]), &c, &caps));
        assert!(!guard.matches(&stats(&[(Stat::Oq, 799)]), &c, &caps));
    }

    #[test]
    fn guard_ordering_recent_first_then_name() {
        let quiet_a = Guard::new("alpha", plain(&[(Stat::Oq, 1)], true));
        let quiet_b = Guard::new("beta", plain(&[(Stat::Oq, 1)], true));
        let mut fired = Guard::new("zulu", plain(&[(Stat::Oq, 1)], true));
        fired.record_trigger();

        let mut guards = vec![quiet_b, fired, quiet_a];
        guards.sort_by(Guard::recent_first);
        let names: Vec<&str> = guards.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["zulu", "alpha", "beta"]);
    }

    #[test]
    fn reset_clears_ordering_mark() {
        let mut guard = Guard::new("g", plain(&[(Stat::Oq, 1)], true));
        guard.record_trigger();
        assert!(guard.last_triggered().is_some());
        guard.reset_trigger();
        assert!(guard.last_triggered().is_none());
    }
}
