//! Capabilities shared by persisted aggregates.
//!
//! Entities opt into each capability separately instead of inheriting from a
//! common base type.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Has a stable, opaque identity.
pub trait Identified {
    fn id(&self) -> Uuid;
}

/// Tracks creation and last modification times.
pub trait Auditable {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Carries a logical deletion flag. Deleted rows are never returned by reads.
pub trait SoftDeletable {
    fn is_deleted(&self) -> bool;
}

/// Carries the row version used for optimistic concurrency checks.
pub trait Versioned {
    fn version(&self) -> i64;
}

/// An aggregate the generic repository can store.
pub trait Entity: Identified + SoftDeletable + Versioned + Clone + Send + Sync + 'static {
    /// Predicate type accepted by `find`, `count` and `get_paged`.
    type Filter: Default + Send + Sync;

    /// Short name used in logs and error messages.
    const NAME: &'static str;
}
