//! Matching, rating, and near-duplicate detection.
//!
//! Everything here is pure in-memory computation over the core model:
//! plain threshold filters, weighted ratings normalized against class caps,
//! user-configured guards, and the fuzzy name scan that runs before a new
//! resource is submitted to the remote database.

pub mod dedupe;
pub mod filter;
pub mod guard;
pub mod weights;

pub use dedupe::{DuplicateWarning, find_near_duplicates, levenshtein, normalize_name};
pub use filter::{has_all_values, has_minimum_one_value, is_better};
pub use guard::{CapPolicy, Guard, GuardLogic};
pub use weights::rate;
