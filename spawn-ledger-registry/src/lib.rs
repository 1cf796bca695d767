//! Resource identity: transient drafts, canonical deduplicated instances,
//! the registry that joins them, and the per-category update fan-out.
//!
//! The draft/canonical split is deliberate: a [`ResourceDraft`] is freely
//! mutable and scoped to one local operation (parsing an import line,
//! assembling a submission), while a [`KnownResource`] is the single
//! long-lived instance for its identity, handed out as an `Arc` and only
//! correctable through the registry's explicit update path.

pub mod draft;
pub mod error;
pub mod known;
pub mod notify;
pub mod registry;

pub use draft::{AvailabilityRecord, ResourceDraft, Waypoint};
pub use error::RegistryError;
pub use known::KnownResource;
pub use notify::{Notifier, Subscriber, UpdateCategory, UpdateEvent};
pub use registry::ResourceRegistry;
