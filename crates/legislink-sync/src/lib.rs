//! Sync layer: registry collaborators, cross-registry linking, unification, and the run pipeline.

mod error;
pub mod linker;
pub mod pipeline;
pub mod registry;
pub mod unifier;

#[cfg(feature = "http")]
pub mod http;

pub use error::{FetchError, SyncError};
pub use linker::{IdentityCache, Linker};
pub use pipeline::{Pipeline, RunOptions, SyncReport};
pub use registry::{
    GovernmentSource, JsonFileSource, ParliamentRegistry, PublicationRegistry, TribunalRegistry,
};
pub use unifier::Unifier;

#[cfg(feature = "http")]
pub use http::{EliClient, SaosClient, SejmClient};
