//! Featurevault: a living-documentation server.
//!
//! Feature documents written in a structured specification language are
//! stored per branch/group/title under a derived, branch-scoped identifier
//! and made queryable along independent dimensions: free text, product and
//! version, upload date, and branch membership.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod indexing;
pub mod models;
pub mod projections;
pub mod query;
pub mod search;
pub mod store;

pub use error::{AppError, Result};
