//! The [`ResourceService`] contract and its HTTP implementation.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use spawn_ledger_core::Galaxy;
use spawn_ledger_registry::ResourceDraft;

use crate::credentials::Credentials;
use crate::envelope::{self, Envelope};
use crate::error::NetError;
use crate::status::ProtocolStatus;

/// Everything the core needs from the remote resource database.
///
/// All methods block on network I/O; run them on worker threads. "Unknown
/// resource" is an `Ok(None)` / empty `Vec`, never an error. Submission
/// methods return the decoded [`ProtocolStatus`] so callers can apply the
/// already-exists whitelist themselves.
pub trait ResourceService: Send + Sync {
    fn find_by_id(&self, id: u64) -> Result<Option<ResourceDraft>, NetError>;

    fn find_by_name(
        &self,
        name: &str,
        galaxy: Galaxy,
    ) -> Result<Option<ResourceDraft>, NetError>;

    /// All (name, class token) tuples whose name starts with `prefix`.
    fn find_by_prefix(
        &self,
        prefix: &str,
        galaxy: Galaxy,
    ) -> Result<Vec<(String, String)>, NetError>;

    fn submit_new(&self, draft: &ResourceDraft) -> Result<ProtocolStatus, NetError>;

    /// Submit a resource that is no longer spawned (back-filling history).
    fn submit_historical(&self, draft: &ResourceDraft) -> Result<ProtocolStatus, NetError>;

    fn submit_edit(&self, draft: &ResourceDraft) -> Result<ProtocolStatus, NetError>;

    fn mark_depleted(&self, id: u64) -> Result<ProtocolStatus, NetError>;

    fn mark_available(&self, id: u64, planet_id: u32) -> Result<ProtocolStatus, NetError>;

    /// The authoritative freshness instant for the server's bulk exports.
    fn server_status(&self) -> Result<DateTime<Utc>, NetError>;

    /// Download a bulk export to `dest`. Returns the byte count written.
    fn download(&self, remote_path: &str, dest: &Path) -> Result<u64, NetError>;
}

/// HTTP implementation of [`ResourceService`].
pub struct HttpResourceService {
    http: reqwest::blocking::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpResourceService {
    /// Build a client for the given server base URL. Credentials are
    /// optional; submissions without them fail with a credentials error
    /// before touching the network.
    pub fn new(base_url: impl Into<String>, credentials: Option<Credentials>) -> Result<Self, NetError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST a request envelope and decode the response envelope.
    fn roundtrip(&self, body: String) -> Result<Envelope, NetError> {
        let resp = self
            .http
            .post(self.endpoint("resource"))
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::Http(status.as_u16()));
        }
        let text = resp.text()?;
        envelope::decode_response(&text)
    }

    fn lookup(&self, op: &str, extra: &[(&str, String)]) -> Result<Envelope, NetError> {
        let body = envelope::encode_request(op, None, None, extra)?;
        let envelope = self.roundtrip(body)?;
        if !envelope.status.is_accepted() {
            return Err(NetError::Rejected(envelope.status));
        }
        Ok(envelope)
    }

    fn submit(
        &self,
        op: &str,
        resource: Option<&ResourceDraft>,
        extra: &[(&str, String)],
    ) -> Result<ProtocolStatus, NetError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| NetError::credentials("submissions require an account"))?;
        let body = envelope::encode_request(op, resource, Some(creds), extra)?;
        let envelope = self.roundtrip(body)?;
        log::debug!("{op}: server answered {}", envelope.status);
        Ok(envelope.status)
    }
}

impl ResourceService for HttpResourceService {
    fn find_by_id(&self, id: u64) -> Result<Option<ResourceDraft>, NetError> {
        let envelope = self.lookup("find_by_id", &[("id", id.to_string())])?;
        Ok(envelope.resources.into_iter().next())
    }

    fn find_by_name(
        &self,
        name: &str,
        galaxy: Galaxy,
    ) -> Result<Option<ResourceDraft>, NetError> {
        let envelope = self.lookup(
            "find_by_name",
            &[
                ("name", name.to_string()),
                ("galaxy", galaxy.id().to_string()),
            ],
        )?;
        Ok(envelope.resources.into_iter().next())
    }

    fn find_by_prefix(
        &self,
        prefix: &str,
        galaxy: Galaxy,
    ) -> Result<Vec<(String, String)>, NetError> {
        let envelope = self.lookup(
            "find_by_prefix",
            &[
                ("prefix", prefix.to_string()),
                ("galaxy", galaxy.id().to_string()),
            ],
        )?;
        Ok(envelope.matches)
    }

    fn submit_new(&self, draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
        self.submit("submit_new", Some(draft), &[])
    }

    fn submit_historical(&self, draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
        self.submit("submit_historical", Some(draft), &[])
    }

    fn submit_edit(&self, draft: &ResourceDraft) -> Result<ProtocolStatus, NetError> {
        self.submit("submit_edit", Some(draft), &[])
    }

    fn mark_depleted(&self, id: u64) -> Result<ProtocolStatus, NetError> {
        self.submit("mark_depleted", None, &[("id", id.to_string())])
    }

    fn mark_available(&self, id: u64, planet_id: u32) -> Result<ProtocolStatus, NetError> {
        self.submit(
            "mark_available",
            None,
            &[("id", id.to_string()), ("planet", planet_id.to_string())],
        )
    }

    fn server_status(&self) -> Result<DateTime<Utc>, NetError> {
        let resp = self.http.get(self.endpoint("status")).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::Http(status.as_u16()));
        }
        let text = resp.text()?;
        envelope::decode_server_status(&text)
    }

    fn download(&self, remote_path: &str, dest: &Path) -> Result<u64, NetError> {
        let url = self.endpoint(remote_path);
        let mut resp = self.http.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::Http(status.as_u16()));
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(dest)?;
        let written = resp.copy_to(&mut file).map_err(NetError::from)?;
        log::debug!("downloaded {url} -> {} ({written} bytes)", dest.display());
        Ok(written)
    }
}
