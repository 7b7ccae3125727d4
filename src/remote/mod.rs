//! The remote snapshot store, seen from the client side.
//!
//! The sync protocol talks to the remote exclusively through the
//! [`Remote`] trait, so the protocol can be exercised against a scripted
//! in-memory remote in tests and against [`HttpRemote`] in production.

use serde::Deserialize;

use crate::error::Result;

pub mod http;

pub use http::HttpRemote;

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// An immutable, versioned, full-content capture of an environment's
/// variable set. `version_number` 0 means no versions have been pushed
/// yet.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub environment_id: u64,
    pub version_number: u64,
    pub plaintext: String,
    pub is_forced_push: bool,
    pub base_version_number: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollbackOutcome {
    pub rolled_back_from: u64,
    pub rolled_back_to: u64,
    /// The freshly appended version whose content equals the target's.
    pub version_number: u64,
}

/// Client-side surface of the remote store. Name→id resolution goes
/// through the listing verbs; snapshots are replace-all, never merged
/// field-level on the server.
pub trait Remote {
    fn list_organizations(&self) -> Result<Vec<Organization>>;
    fn list_projects(&self, org_id: u64) -> Result<Vec<Project>>;
    fn list_environments(&self, project_id: u64) -> Result<Vec<Environment>>;

    fn current_snapshot(&self, env_id: u64) -> Result<Snapshot>;
    fn snapshot_by_version(&self, env_id: u64, version: u64) -> Result<Snapshot>;

    /// Submit a full-state snapshot. A `base_version` of `None` is a
    /// forced push: accepted unconditionally and flagged as forced in
    /// the resulting version record. A stale base yields
    /// [`crate::EnvSyncError::Conflict`].
    fn push_snapshot(
        &self,
        env_id: u64,
        plaintext: &str,
        base_version: Option<u64>,
    ) -> Result<Snapshot>;

    /// Append a new version whose content equals `target_version`'s.
    /// History is never mutated.
    fn rollback(&self, env_id: u64, target_version: u64) -> Result<RollbackOutcome>;

    fn create_environment(&self, project_id: u64, name: &str) -> Result<Environment>;
    fn clone_environment(&self, env_id: u64, name: &str) -> Result<Environment>;
    fn delete_environment(&self, env_id: u64, hard: bool) -> Result<()>;
}

/// Find an entry by name or slug. Names match exactly, slugs
/// case-insensitively.
pub fn find_by_name<'a, T>(
    items: &'a [T],
    wanted: &str,
    name: impl Fn(&T) -> &str,
    slug: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    items
        .iter()
        .find(|item| name(item) == wanted || slug(item).eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_name_matches_name_or_slug() {
        let orgs = vec![
            Organization {
                id: 1,
                name: "Acme Corp".into(),
                slug: "acme".into(),
            },
            Organization {
                id: 2,
                name: "Umbrella".into(),
                slug: "umbrella".into(),
            },
        ];
        let hit = find_by_name(&orgs, "Acme Corp", |o| &o.name, |o| &o.slug).unwrap();
        assert_eq!(hit.id, 1);
        let hit = find_by_name(&orgs, "UMBRELLA", |o| &o.name, |o| &o.slug).unwrap();
        assert_eq!(hit.id, 2);
        assert!(find_by_name(&orgs, "nope", |o| &o.name, |o| &o.slug).is_none());
    }
}
