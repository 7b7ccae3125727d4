pub mod auth;
pub mod backup;
pub mod context;
pub mod envfile;
pub mod error;
pub mod merge;
pub mod remote;
pub mod sync;
pub mod tracker;

pub use context::{ContextFlags, ContextSource, LocalContext, ResolvedContext, SharedContext};
pub use envfile::EnvMapping;
pub use error::{EnvSyncError, Result};
pub use remote::{Environment, Organization, Project, Remote, RollbackOutcome, Snapshot};
pub use sync::{Prompter, SyncEngine, SyncOptions};
pub use tracker::VersionStore;
