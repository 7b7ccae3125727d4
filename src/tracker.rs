//! Local cache of the last known remote version per context.
//!
//! The tracked value is only a hint used to populate the base version of
//! a push; the remote independently validates it. Entries never expire.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::context::ResolvedContext;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedVersion {
    pub base_version: u64,
    pub last_synced_at: DateTime<Utc>,
}

/// Explicit handle to the on-disk version store. Call sites receive the
/// store they need; nothing reaches into process-wide paths behind the
/// caller's back.
#[derive(Debug)]
pub struct VersionStore {
    path: PathBuf,
    entries: HashMap<String, TrackedVersion>,
}

impl VersionStore {
    /// Platform-specific default location, e.g.
    /// `~/.local/share/envsync/versions.toml` on Linux.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "envsync").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find data directory")
        })?;
        Ok(dirs.data_dir().join("versions.toml"))
    }

    /// Load the store at `path`, starting empty when the file does not
    /// exist yet.
    pub fn load(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, context: &ResolvedContext) -> Option<&TrackedVersion> {
        self.entries.get(&context.tracker_key())
    }

    /// Record `version` as the new base for `context` and persist
    /// immediately.
    pub fn set(&mut self, context: &ResolvedContext, version: u64) -> Result<()> {
        self.entries.insert(
            context.tracker_key(),
            TrackedVersion {
                base_version: version,
                last_synced_at: Utc::now(),
            },
        );
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
