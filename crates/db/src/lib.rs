//! Collaborator contracts the negotiation engine reads from and writes to.
//!
//! Storage is owned by the embedding storefront; this crate only defines
//! the catalog and session seams plus in-memory implementations used by the
//! CLI and tests.

pub mod fixtures;
pub mod repositories;

pub use fixtures::{demo_catalog, seed_catalog, SeedResult};
pub use repositories::{
    InMemoryProductCatalog, InMemorySessionStore, ProductCatalog, RepositoryError, SessionStore,
};
