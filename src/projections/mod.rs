//! In-process projections maintained alongside the search index.
//!
//! Each projection owns its own lockable map keyed by the mutation's slot
//! (identifier or report id), so updates to unrelated branches and products
//! never contend. Entries are pure functions of one source record; grouping
//! across records happens only at query time.

pub mod branches;
pub mod product_version;

pub use branches::BranchListingProjection;
pub use product_version::{ProductVersionGroup, ProductVersionProjection};
