//! Gallery admin core
//!
//! Staged editing of a photo manifest kept in a remote versioned file store,
//! conflict-safe publishing, and the batch processor that stubs new photos.

pub mod auth;
pub mod batch;
pub mod config;
pub mod errors;
pub mod models;
pub mod publish;
pub mod remote;
pub mod session;
pub mod store;

pub use errors::{AppError, AppResult};
pub use publish::{PublishCoordinator, PublishOutcome, PublishReport};
pub use remote::{HttpFileStore, MemoryFileStore, RemoteFile, RemoteFileStore};
pub use session::AdminSession;
pub use store::{ReconciliationStore, SharedStore, StoreEvent};
