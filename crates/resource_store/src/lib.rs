//! Persistence adapter for resources: uploaded files and attachments with an
//! optional inline payload, an optional owning note and an optional external
//! storage pointer.
//!
//! The store turns sparse filters and patches into parameterized SQL, rebuilds
//! typed entities from rows, and sweeps resources whose creator was deleted.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::resource::{
    CreateResource, FindResource, MemoId, Resource, ResourceId, ResourceValidationError,
    UpdateResource, UserId,
};
pub use repo::resource_repo::{
    vacuum_resources, RepoError, RepoResult, ResourceStore, SqliteResourceStore,
};
