//! The versioned synchronization protocol: pull, push, rollback.
//!
//! `SyncEngine` orchestrates the remote port, the env-text codec, the
//! override merge, the backup chain and the version tracker. It performs
//! no interactive I/O of its own; every decision point goes through the
//! injected [`Prompter`], so the protocol runs unchanged under a
//! scripted decision source in tests and a denying one in JSON/service
//! mode.
//!
//! Each command is a strict sequence of awaited steps. Backups and
//! version records are written only after the corresponding fetch or
//! submit succeeded, so an aborted prompt never leaves partial state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup;
use crate::context::{ResolvedContext, LOCAL_FILE};
use crate::envfile;
use crate::error::{EnvSyncError, Result};
use crate::merge;
use crate::remote::{find_by_name, Environment, Organization, Project, Remote};
use crate::tracker::VersionStore;

/// Decision port for the protocol's confirmation points.
pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Asks on the terminal.
pub struct InteractivePrompter;

impl Prompter for InteractivePrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(inquire::Confirm::new(message)
            .with_default(default)
            .prompt()?)
    }
}

/// Used in JSON and service-token mode, where prompts are disallowed.
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        Err(EnvSyncError::InteractiveRequired(format!(
            "confirmation ({})",
            message
        )))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Skip base-version checking on push and never prompt to force.
    pub force: bool,
    /// Skip overwrite confirmations.
    pub assume_yes: bool,
    /// Service-token invocation: local context and overrides are
    /// ignored and pushes carry no base version.
    pub service_mode: bool,
}

#[derive(Debug)]
pub struct PullOutcome {
    pub version: u64,
    pub variable_count: usize,
    pub backed_up: bool,
}

#[derive(Debug)]
pub struct PushOutcome {
    pub version: u64,
    pub forced: bool,
}

#[derive(Debug)]
pub struct RollbackReport {
    pub rolled_back_from: u64,
    pub rolled_back_to: u64,
    pub new_version: u64,
}

pub struct SyncEngine<'a> {
    remote: &'a dyn Remote,
    tracker: &'a mut VersionStore,
    prompter: &'a mut dyn Prompter,
    context: ResolvedContext,
    overrides: HashMap<String, String>,
    dir: PathBuf,
    working: PathBuf,
    backup: PathBuf,
    options: SyncOptions,
}

impl<'a> SyncEngine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        remote: &'a dyn Remote,
        tracker: &'a mut VersionStore,
        prompter: &'a mut dyn Prompter,
        context: ResolvedContext,
        overrides: HashMap<String, String>,
        dir: &Path,
        working_file: &str,
        options: SyncOptions,
    ) -> Self {
        let working = dir.join(working_file);
        let backup = dir.join(format!("{}.backup", working_file));
        Self {
            remote,
            tracker,
            prompter,
            context,
            overrides,
            dir: dir.to_path_buf(),
            working,
            backup,
            options,
        }
    }

    pub fn context(&self) -> &ResolvedContext {
        &self.context
    }

    /// Name→id resolution against the remote listings. A miss at any
    /// level is fatal for the invocation.
    fn resolve_org_project(&self) -> Result<(Organization, Project)> {
        let orgs = self.remote.list_organizations()?;
        let org = find_by_name(&orgs, &self.context.org, |o| &o.name, |o| &o.slug)
            .ok_or_else(|| {
                EnvSyncError::NotFound(format!("organization '{}'", self.context.org))
            })?
            .clone();
        let projects = self.remote.list_projects(org.id)?;
        let project = find_by_name(&projects, &self.context.project, |p| &p.name, |p| &p.slug)
            .ok_or_else(|| EnvSyncError::NotFound(format!("project '{}'", self.context.project)))?
            .clone();
        Ok((org, project))
    }

    fn resolve_environment(&self) -> Result<Environment> {
        let (_, project) = self.resolve_org_project()?;
        let environments = self.remote.list_environments(project.id)?;
        let environment = find_by_name(
            &environments,
            &self.context.environment,
            |e| &e.name,
            |e| &e.slug,
        )
        .ok_or_else(|| {
            EnvSyncError::NotFound(format!("environment '{}'", self.context.environment))
        })?;
        Ok(environment.clone())
    }

    /// Fetch a snapshot (current or pinned), merge overrides, write the
    /// working file. Backs up only when the computed content actually
    /// differs from what is on disk.
    pub fn pull(&mut self, version: Option<u64>) -> Result<PullOutcome> {
        let environment = self.resolve_environment()?;
        let snapshot = match version {
            Some(v) => self.remote.snapshot_by_version(environment.id, v)?,
            None => self.remote.current_snapshot(environment.id)?,
        };
        let base = envfile::parse(&snapshot.plaintext);

        // version 0 / empty remote is a valid state, not an error, but
        // overwriting the working file with it needs an explicit yes
        if (snapshot.version_number == 0 || base.is_empty()) && !self.options.assume_yes {
            let confirmed = self.prompter.confirm(
                &format!(
                    "Remote environment {} has no variables yet. Overwrite {}?",
                    self.context,
                    self.working.display()
                ),
                false,
            )?;
            if !confirmed {
                return Err(EnvSyncError::Cancelled);
            }
        }

        let merged = if self.options.service_mode {
            base
        } else {
            merge::apply_overrides(&base, &self.overrides)
        };
        let new_content = envfile::format(&merged);
        let current = if self.working.exists() {
            fs::read_to_string(&self.working)?
        } else {
            String::new()
        };

        let mut backed_up = false;
        if backup::content_differs(&new_content, &current) {
            backed_up = backup::capture(&self.working, &self.backup)?;
        }
        fs::write(&self.working, &new_content)?;
        self.ensure_gitignore()?;
        self.tracker.set(&self.context, snapshot.version_number)?;

        Ok(PullOutcome {
            version: snapshot.version_number,
            variable_count: merged.len(),
            backed_up,
        })
    }

    /// Submit the working file as a new full-state snapshot, with
    /// optimistic-concurrency base tracking and a one-shot forced retry
    /// on conflict.
    pub fn push(&mut self) -> Result<PushOutcome> {
        let content = fs::read_to_string(&self.working).map_err(|_| {
            EnvSyncError::Validation(format!("working file {} not found", self.working.display()))
        })?;
        let mut payload = envfile::parse(&content);
        if payload.is_empty() {
            return Err(EnvSyncError::Validation(format!(
                "working file {} is empty; nothing to push",
                self.working.display()
            )));
        }

        // an override value sitting in the working file would leak into
        // the shared snapshot unless the user explicitly opts in
        if !self.options.force && !self.options.service_mode {
            let colliding = merge::collisions(&payload, &self.overrides);
            if !colliding.is_empty() {
                let include = self.prompter.confirm(
                    &format!(
                        "Working file contains local override keys ({}). Include their values in the shared snapshot?",
                        colliding.join(", ")
                    ),
                    false,
                )?;
                if !include {
                    merge::strip_keys(&mut payload, &colliding);
                }
            }
        }

        let environment = self.resolve_environment()?;
        let base_version = self.determine_base_version(environment.id);
        backup::capture(&self.working, &self.backup)?;
        let plaintext = envfile::format(&payload);

        match self
            .remote
            .push_snapshot(environment.id, &plaintext, base_version)
        {
            Ok(snapshot) => {
                self.tracker.set(&self.context, snapshot.version_number)?;
                Ok(PushOutcome {
                    version: snapshot.version_number,
                    forced: snapshot.is_forced_push,
                })
            }
            Err(conflict @ EnvSyncError::Conflict { .. }) => {
                if self.options.force || self.options.service_mode {
                    return Err(conflict);
                }
                let retry = match self.prompter.confirm(
                    &format!(
                        "{}. Pull first to reconcile, or retry as a forced push overwriting the remote?",
                        conflict
                    ),
                    false,
                ) {
                    Ok(answer) => answer,
                    // prompts disabled: surface the conflict itself
                    Err(EnvSyncError::InteractiveRequired(_)) => false,
                    Err(other) => return Err(other),
                };
                if !retry {
                    return Err(conflict);
                }
                let snapshot = self.remote.push_snapshot(environment.id, &plaintext, None)?;
                self.tracker.set(&self.context, snapshot.version_number)?;
                Ok(PushOutcome {
                    version: snapshot.version_number,
                    forced: snapshot.is_forced_push,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// The base version a push claims to have started from: the tracked
    /// value when present, otherwise a best-effort remote read. Forced
    /// and service-token pushes carry no base.
    fn determine_base_version(&self, env_id: u64) -> Option<u64> {
        if self.options.force || self.options.service_mode {
            return None;
        }
        if let Some(entry) = self.tracker.get(&self.context) {
            return Some(entry.base_version);
        }
        // best-effort optimistic read; a failure here degrades to "no
        // base" rather than aborting the push
        self.remote
            .current_snapshot(env_id)
            .ok()
            .map(|s| s.version_number)
    }

    /// Ask the remote to append a new version equal to `target`, then
    /// pull that new version into the working file.
    pub fn rollback(&mut self, target: u64) -> Result<RollbackReport> {
        let environment = self.resolve_environment()?;
        let outcome = self.remote.rollback(environment.id, target)?;
        backup::capture(&self.working, &self.backup)?;

        let snapshot = self
            .remote
            .snapshot_by_version(environment.id, outcome.version_number)?;
        let base = envfile::parse(&snapshot.plaintext);
        let merged = if self.options.service_mode {
            base
        } else {
            merge::apply_overrides(&base, &self.overrides)
        };
        fs::write(&self.working, envfile::format(&merged))?;
        self.tracker.set(&self.context, outcome.version_number)?;

        Ok(RollbackReport {
            rolled_back_from: outcome.rolled_back_from,
            rolled_back_to: outcome.rolled_back_to,
            new_version: outcome.version_number,
        })
    }

    /// The locally stored base with overrides applied, canonical form.
    pub fn print(&self) -> Result<String> {
        let content = fs::read_to_string(&self.working).map_err(|_| {
            EnvSyncError::Validation(format!("working file {} not found", self.working.display()))
        })?;
        let base = envfile::parse(&content);
        let merged = if self.options.service_mode {
            base
        } else {
            merge::apply_overrides(&base, &self.overrides)
        };
        Ok(envfile::format(&merged))
    }

    pub fn create_environment(&mut self, name: &str) -> Result<Environment> {
        let (_, project) = self.resolve_org_project()?;
        self.remote.create_environment(project.id, name)
    }

    pub fn clone_environment(&mut self, new_name: &str) -> Result<Environment> {
        let environment = self.resolve_environment()?;
        self.remote.clone_environment(environment.id, new_name)
    }

    pub fn delete_environment(&mut self, hard: bool) -> Result<()> {
        let environment = self.resolve_environment()?;
        if !self.options.assume_yes {
            let confirmed = self.prompter.confirm(
                &format!(
                    "{} delete environment {}?",
                    if hard { "Permanently" } else { "Soft" },
                    self.context
                ),
                false,
            )?;
            if !confirmed {
                return Err(EnvSyncError::Cancelled);
            }
        }
        self.remote.delete_environment(environment.id, hard)
    }

    pub fn list_environments(&self) -> Result<Vec<Environment>> {
        let (_, project) = self.resolve_org_project()?;
        self.remote.list_environments(project.id)
    }

    /// The working file, its backup and the local context file must
    /// never be committed. Creates `.gitignore` when absent; appends
    /// only the missing entries otherwise.
    fn ensure_gitignore(&self) -> Result<()> {
        let path = self.dir.join(".gitignore");
        let entries = [
            self.working
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            self.backup
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            LOCAL_FILE.to_string(),
        ];

        let existing = if path.exists() {
            fs::read_to_string(&path)?
        } else {
            String::new()
        };
        let present: Vec<&str> = existing.lines().map(str::trim).collect();
        let missing: Vec<&String> = entries
            .iter()
            .filter(|e| !e.is_empty() && !present.contains(&e.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let mut updated = existing;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        for entry in missing {
            updated.push_str(entry);
            updated.push('\n');
        }
        fs::write(&path, updated)?;
        Ok(())
    }
}
