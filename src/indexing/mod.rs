//! Derived-index maintenance.
//!
//! The store publishes mutation events; the maintainer fans each event out to
//! every registered projection. Projections are independent per-document pure
//! transforms, so one document failing analysis in one projection never
//! blocks the others.

pub mod maintainer;

pub use maintainer::IndexMaintainer;

use crate::error::Result;
use crate::store::MutationEvent;
use async_trait::async_trait;

/// Capability trait for a derived projection.
///
/// Implementations map one mutation event onto their own projection slot and
/// must be safe to call concurrently for distinct identifiers. Adding a new
/// projection means implementing this trait and registering it with the
/// maintainer; existing projections are untouched.
#[async_trait]
pub trait ProjectionBuilder: Send + Sync {
    /// Stable name used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Apply one mutation to this projection
    async fn apply(&self, event: &MutationEvent) -> Result<()>;

    /// Drop all projection state (start of a bulk rebuild)
    async fn clear(&self) -> Result<()>;
}
