//! Remote protocol client for the community resource database.
//!
//! The rest of the system depends on the [`ResourceService`] trait, not on
//! HTTP: the sync layer and the CLI are generic over it, and tests swap in
//! in-memory fakes. [`HttpResourceService`] is the real implementation,
//! speaking the database's XML envelope over HTTP.
//!
//! All calls here block on network I/O. Callers that must stay responsive
//! run them on worker tasks (see the sync crate's refresher).

pub mod client;
pub mod credentials;
pub mod envelope;
pub mod error;
pub mod status;

pub use client::{HttpResourceService, ResourceService};
pub use credentials::Credentials;
pub use error::NetError;
pub use status::ProtocolStatus;
