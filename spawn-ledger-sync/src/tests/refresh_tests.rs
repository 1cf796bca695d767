use super::*;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};

use spawn_ledger_core::Stat;
use spawn_ledger_net::{NetError, ProtocolStatus};
use spawn_ledger_registry::{ResourceDraft, Subscriber, UpdateCategory};

const GALAXY: Galaxy = Galaxy(7);

fn ts(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, h, 0, 0).unwrap()
}

fn resources_xml(h: u32, body: &str) -> String {
    format!(
        "<resources galaxy=\"7\" last_updated=\"2021-03-01 {h:02}:00:00 UTC\">\n{body}\n</resources>\n"
    )
}

const HANSOLO: &str = r#"<resource id="42" name="Hansolo" class="copper_desh"
    stats="0 0 0 0 0 0 0 500 0 0 0"/>"#;

/// Scriptable stand-in for the remote database.
struct FakeService {
    status: Mutex<DateTime<Utc>>,
    fail_status: AtomicBool,
    fail_download: AtomicBool,
    exports: Mutex<HashMap<String, String>>,
    downloads: AtomicUsize,
    /// When set, `download` rendezvouses on `started` then blocks on
    /// `release` — lets a test hold a download mid-flight.
    gates: Mutex<Option<(Arc<Barrier>, Arc<Barrier>)>>,
}

impl FakeService {
    fn new(status: DateTime<Utc>) -> Self {
        Self {
            status: Mutex::new(status),
            fail_status: AtomicBool::new(false),
            fail_download: AtomicBool::new(false),
            exports: Mutex::new(HashMap::new()),
            downloads: AtomicUsize::new(0),
            gates: Mutex::new(None),
        }
    }

    fn set_status(&self, when: DateTime<Utc>) {
        *self.status.lock().unwrap() = when;
    }

    fn set_export(&self, remote_path: &str, content: String) {
        self.exports
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), content);
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl ResourceService for FakeService {
    fn find_by_id(&self, _id: u64) -> Result<Option<ResourceDraft>, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn find_by_name(
        &self,
        _name: &str,
        _galaxy: Galaxy,
    ) -> Result<Option<ResourceDraft>, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn find_by_prefix(
        &self,
        _prefix: &str,
        _galaxy: Galaxy,
    ) -> Result<Vec<(String, String)>, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn submit_new(&self, _draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn submit_historical(&self, _draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn submit_edit(&self, _draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn mark_depleted(&self, _id: u64) -> Result<ProtocolStatus, NetError> {
        unimplemented!("not exercised by the sync layer")
    }
    fn mark_available(&self, _id: u64, _planet_id: u32) -> Result<ProtocolStatus, NetError> {
        unimplemented!("not exercised by the sync layer")
    }

    fn server_status(&self) -> Result<DateTime<Utc>, NetError> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(NetError::HostUnreachable("no such host".into()));
        }
        Ok(*self.status.lock().unwrap())
    }

    fn download(&self, remote_path: &str, dest: &Path) -> Result<u64, NetError> {
        let gates = self.gates.lock().unwrap().clone();
        if let Some((started, release)) = gates {
            started.wait();
            release.wait();
        }
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(NetError::Transport("connection reset".into()));
        }
        let content = self
            .exports
            .lock()
            .unwrap()
            .get(remote_path)
            .cloned()
            .ok_or_else(|| NetError::Http(404))?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, &content)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(content.len() as u64)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    service: Arc<FakeService>,
    registry: Arc<ResourceRegistry>,
    notifier: Arc<Notifier>,
    manager: Arc<SyncManager<FakeService>>,
}

fn fixture(status: DateTime<Utc>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::new(status));
    let registry = Arc::new(ResourceRegistry::new());
    let notifier = Arc::new(Notifier::new());
    let manager = Arc::new(SyncManager::new(
        service.clone(),
        registry.clone(),
        notifier.clone(),
        dir.path().to_path_buf(),
    ));
    Fixture {
        _dir: dir,
        service,
        registry,
        notifier,
        manager,
    }
}

#[test]
fn full_cycle_downloads_ingests_and_notifies() {
    let fx = fixture(ts(10));
    fx.service.set_export("exports/current/7.xml", resources_xml(10, HANSOLO));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscriber: Arc<dyn Subscriber> = Arc::new(move |e: &UpdateEvent| {
        sink.lock().unwrap().push(e.category);
    });
    fx.notifier
        .subscribe(UpdateCategory::GalaxyData(GALAXY), "test", subscriber);

    let kind = ExportKind::CurrentResources(GALAXY);
    assert_eq!(fx.manager.state(kind), CacheState::Unchecked);

    let outcome = fx.manager.refresh(kind).unwrap();
    match outcome {
        RefreshOutcome::Updated(UpdateReport::Resources(summary)) => {
            assert_eq!(summary.created, 1);
        }
        other => panic!("expected Updated, got {other:?}"),
    }
    assert_eq!(fx.manager.state(kind), CacheState::UpToDate);
    assert_eq!(fx.service.downloads(), 1);

    let resource = fx.registry.lookup_id(42).unwrap();
    assert_eq!(resource.stats().get(Stat::Oq), 500);

    assert_eq!(
        *events.lock().unwrap(),
        vec![UpdateCategory::GalaxyData(GALAXY)]
    );

    // Same remote hour: the second refresh is a no-op.
    let outcome = fx.manager.refresh(kind).unwrap();
    assert_eq!(outcome, RefreshOutcome::UpToDate);
    assert_eq!(fx.service.downloads(), 1);
}

#[test]
fn remote_hour_bump_triggers_redownload_with_backup() {
    let fx = fixture(ts(10));
    let kind = ExportKind::CurrentResources(GALAXY);
    fx.service.set_export("exports/current/7.xml", resources_xml(10, HANSOLO));
    fx.manager.refresh(kind).unwrap();

    // Server moved to the next hour with a corrected measurement.
    fx.service.set_status(ts(11));
    fx.service.set_export(
        "exports/current/7.xml",
        resources_xml(
            11,
            r#"<resource id="42" name="Hansolo" class="copper_desh"
                stats="0 0 0 0 0 0 0 512 0 0 0"/>"#,
        ),
    );
    fx.manager.probe.open_window();

    let outcome = fx.manager.refresh(kind).unwrap();
    assert!(matches!(outcome, RefreshOutcome::Updated(_)));
    assert_eq!(fx.service.downloads(), 2);

    // The previous generation was rotated into .bak1.
    let live = fx.manager.local_path(kind);
    let backup = PathBuf::from(format!("{}.bak1", live.display()));
    assert!(fs::read_to_string(&live).unwrap().contains("512"));
    assert!(fs::read_to_string(&backup).unwrap().contains("500"));

    // The canonical instance was corrected in place.
    assert_eq!(fx.registry.lookup_id(42).unwrap().stats().get(Stat::Oq), 512);
}

#[test]
fn status_failure_is_loud_once_then_quiet() {
    let fx = fixture(ts(10));
    fx.service.fail_status.store(true, Ordering::SeqCst);
    let kind = ExportKind::CurrentResources(GALAXY);

    assert_eq!(
        fx.manager.refresh(kind).unwrap(),
        RefreshOutcome::StatusUnavailable {
            first_failure: true
        }
    );
    assert_eq!(fx.manager.state(kind), CacheState::Failed);

    assert_eq!(
        fx.manager.refresh(kind).unwrap(),
        RefreshOutcome::StatusUnavailable {
            first_failure: false
        }
    );
}

#[test]
fn failed_download_leaves_the_previous_file_intact() {
    let fx = fixture(ts(10));
    let kind = ExportKind::CurrentResources(GALAXY);
    fx.service.set_export("exports/current/7.xml", resources_xml(10, HANSOLO));
    fx.manager.refresh(kind).unwrap();
    let before = fs::read_to_string(fx.manager.local_path(kind)).unwrap();

    fx.service.set_status(ts(11));
    fx.service.fail_download.store(true, Ordering::SeqCst);
    fx.manager.probe.open_window();

    assert!(fx.manager.refresh(kind).is_err());
    assert_eq!(fx.manager.state(kind), CacheState::Failed);

    // Old file untouched, no stray temp file.
    assert_eq!(fs::read_to_string(fx.manager.local_path(kind)).unwrap(), before);
    let tmp = fx.manager.cache_root.join("current_7.xml.tmp");
    assert!(!tmp.exists());
}

#[test]
fn concurrent_refresh_for_the_same_galaxy_is_dropped() {
    let fx = fixture(ts(10));
    let kind = ExportKind::CurrentResources(GALAXY);
    fx.service.set_export("exports/current/7.xml", resources_xml(10, HANSOLO));

    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    *fx.service.gates.lock().unwrap() = Some((started.clone(), release.clone()));

    let manager = fx.manager.clone();
    let worker = std::thread::spawn(move || manager.refresh(kind).unwrap());

    // Wait until the worker is inside its download, then ask again: the
    // second request must be dropped, not queued.
    started.wait();
    assert_eq!(
        fx.manager.refresh(kind).unwrap(),
        RefreshOutcome::DroppedBusy
    );

    *fx.service.gates.lock().unwrap() = None;
    release.wait();
    assert!(matches!(
        worker.join().unwrap(),
        RefreshOutcome::Updated(_)
    ));
}

#[test]
fn categories_refresh_rebuilds_the_taxonomy() {
    let fx = fixture(ts(10));
    fx.service.set_export(
        "exports/categories.xml",
        r#"<categories last_updated="2021-03-01 10:00:00 UTC">
          <class token="copper" name="Copper" caps="0 0 0 0 0 0 0 1000 0 0 0"/>
          <class token="copper_desh" name="Desh Copper" parent="copper" spawnable="1"
                 caps="0 0 0 0 0 0 0 1000 0 0 0"/>
        </categories>"#
            .to_string(),
    );

    let outcome = fx.manager.refresh(ExportKind::Categories).unwrap();
    assert_eq!(outcome, RefreshOutcome::Updated(UpdateReport::Classes(2)));
    assert!(fx.manager.classes().by_token("copper_desh").is_some());
}

#[test]
fn load_cached_bootstraps_without_the_network() {
    let fx = fixture(ts(10));
    let kind = ExportKind::CurrentResources(GALAXY);
    let path = fx.manager.local_path(kind);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, resources_xml(9, HANSOLO)).unwrap();

    let report = fx.manager.load_cached(kind).unwrap();
    assert!(matches!(report, Some(UpdateReport::Resources(_))));
    assert!(fx.registry.lookup_id(42).is_some());
    assert_eq!(fx.service.downloads(), 0);

    assert_eq!(fx.manager.load_cached(ExportKind::Servers).unwrap(), None);
}
