//! Rate-limited probing of the server's authoritative freshness timestamp.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use spawn_ledger_net::{NetError, ResourceService};

/// Minimum spacing between calls to the remote status endpoint. Within
/// the window the most recently fetched value is reused.
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(180);

/// Extra delay added after a host-resolution failure, so a dead link does
/// not produce an error per tick.
const FAILURE_BACKOFF_MARGIN: Duration = Duration::from_secs(30);

/// Outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Fetched from the server just now.
    Fresh(DateTime<Utc>),
    /// Reused from within the rate-limit window.
    Cached(DateTime<Utc>),
    /// The server could not be reached and no usable value is cached.
    /// `first_failure` is true only for the first failure in a run of
    /// failures — the caller shows its error dialog on that one and stays
    /// quiet for the rest.
    Unavailable { first_failure: bool },
}

impl ProbeResult {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Fresh(when) | Self::Cached(when) => Some(*when),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug)]
struct ProbeState {
    last_value: Option<DateTime<Utc>>,
    next_allowed: Option<Instant>,
    last_attempt_ok: bool,
}

/// Rate limiter and failure suppressor around the status endpoint.
#[derive(Debug)]
pub struct StatusProbe {
    state: Mutex<ProbeState>,
}

impl Default for StatusProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusProbe {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProbeState {
                last_value: None,
                next_allowed: None,
                last_attempt_ok: true,
            }),
        }
    }

    /// Reopen the rate-limit window immediately.
    #[cfg(test)]
    pub(crate) fn open_window(&self) {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .next_allowed = None;
    }

    /// Fetch the server's freshness timestamp, or reuse the cached value
    /// inside the rate-limit window. Blocks on network I/O outside it.
    pub fn probe(&self, service: &dyn ResourceService) -> ProbeResult {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let now = Instant::now();
        if let Some(next_allowed) = state.next_allowed {
            if now < next_allowed {
                return match state.last_value {
                    Some(when) => ProbeResult::Cached(when),
                    // Mid-backoff with nothing cached: stay quiet.
                    None => ProbeResult::Unavailable {
                        first_failure: false,
                    },
                };
            }
        }

        match service.server_status() {
            Ok(when) => {
                state.last_value = Some(when);
                state.next_allowed = Some(now + MIN_PROBE_INTERVAL);
                state.last_attempt_ok = true;
                ProbeResult::Fresh(when)
            }
            Err(error) => {
                let first_failure = state.last_attempt_ok;
                state.last_attempt_ok = false;
                state.next_allowed = Some(now + backoff_for(&error));
                log::warn!("status probe failed: {error}");
                ProbeResult::Unavailable { first_failure }
            }
        }
    }
}

/// Host-resolution failures back off a little longer than the normal
/// window; everything else just respects the rate limit.
fn backoff_for(error: &NetError) -> Duration {
    if error.is_host_unreachable() {
        MIN_PROBE_INTERVAL + FAILURE_BACKOFF_MARGIN
    } else {
        MIN_PROBE_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use spawn_ledger_core::Galaxy;
    use spawn_ledger_net::ProtocolStatus;
    use spawn_ledger_registry::ResourceDraft;

    /// Service stub whose status endpoint can be scripted.
    struct ScriptedService {
        calls: AtomicUsize,
        fail: std::sync::Mutex<bool>,
    }

    impl ScriptedService {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: std::sync::Mutex::new(fail),
            }
        }

        fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ResourceService for ScriptedService {
        fn find_by_id(&self, _id: u64) -> Result<Option<ResourceDraft>, NetError> {
            unimplemented!("not used by the probe")
        }
        fn find_by_name(
            &self,
            _name: &str,
            _galaxy: Galaxy,
        ) -> Result<Option<ResourceDraft>, NetError> {
            unimplemented!("not used by the probe")
        }
        fn find_by_prefix(
            &self,
            _prefix: &str,
            _galaxy: Galaxy,
        ) -> Result<Vec<(String, String)>, NetError> {
            unimplemented!("not used by the probe")
        }
        fn submit_new(&self, _draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
            unimplemented!("not used by the probe")
        }
        fn submit_historical(&self, _draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
            unimplemented!("not used by the probe")
        }
        fn submit_edit(&self, _draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
            unimplemented!("not used by the probe")
        }
        fn mark_depleted(&self, _id: u64) -> Result<ProtocolStatus, NetError> {
            unimplemented!("not used by the probe")
        }
        fn mark_available(&self, _id: u64, _planet_id: u32) -> Result<ProtocolStatus, NetError> {
            unimplemented!("not used by the probe")
        }
        fn server_status(&self) -> Result<DateTime<Utc>, NetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock().unwrap() {
                Err(NetError::HostUnreachable("no such host".into()))
            } else {
                Ok(Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap())
            }
        }
        fn download(&self, _remote_path: &str, _dest: &Path) -> Result<u64, NetError> {
            unimplemented!("not used by the probe")
        }
    }

    #[test]
    fn second_probe_within_window_reuses_the_value() {
        let service = ScriptedService::new(false);
        let probe = StatusProbe::new();

        let first = probe.probe(&service);
        assert!(matches!(first, ProbeResult::Fresh(_)));
        let second = probe.probe(&service);
        assert!(matches!(second, ProbeResult::Cached(_)));
        assert_eq!(first.timestamp(), second.timestamp());
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn only_the_first_failure_in_a_run_is_loud() {
        let service = ScriptedService::new(true);
        let probe = StatusProbe::new();

        assert_eq!(
            probe.probe(&service),
            ProbeResult::Unavailable {
                first_failure: true
            }
        );
        // Still inside the backoff window: quiet, and no network call.
        assert_eq!(
            probe.probe(&service),
            ProbeResult::Unavailable {
                first_failure: false
            }
        );
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn recovery_resets_the_failure_run() {
        let service = ScriptedService::new(false);
        let probe = StatusProbe::new();
        assert!(matches!(probe.probe(&service), ProbeResult::Fresh(_)));

        // Force the window open and fail the next attempt: loud again.
        probe
            .state
            .lock()
            .unwrap()
            .next_allowed = Some(Instant::now() - Duration::from_secs(1));
        service.set_fail(true);
        match probe.probe(&service) {
            ProbeResult::Unavailable { first_failure } => assert!(first_failure),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
