//! Context resolution: which (organization, project, environment) a
//! command operates against.
//!
//! Two files participate, both TOML:
//!
//! - `envsync.toml` — the shared context, committed by the team. If it
//!   exists, all three fields must be present and non-empty.
//! - `envsync.local.toml` — the developer-private context: optional
//!   field-level overrides of the shared context plus the local
//!   `overrides` variable map. Never committed.
//!
//! Resolution is a strict priority chain per field: flag, then local
//! file, then shared file. The resolver never prompts; when it cannot
//! produce a full triple it returns `None` and the caller decides
//! whether to fail or fall back to interactive selection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{EnvSyncError, Result};

/// File name of the team-committed shared context.
pub const SHARED_FILE: &str = "envsync.toml";
/// File name of the developer-private local context.
pub const LOCAL_FILE: &str = "envsync.local.toml";

/// Team-committed context. All fields required and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedContext {
    pub org: String,
    pub project: String,
    pub environment: String,
}

impl SharedContext {
    /// Load from `dir`, returning `None` when the file does not exist.
    ///
    /// A file that exists but is missing any field, or carries an empty
    /// one, is a configuration error rather than an absent context.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(SHARED_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let raw: RawShared = toml::from_str(&content)
            .map_err(|e| EnvSyncError::Configuration(format!("{}: {}", SHARED_FILE, e)))?;
        Ok(Some(raw.validate()?))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(dir.join(SHARED_FILE), content)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawShared {
    org: Option<String>,
    project: Option<String>,
    environment: Option<String>,
}

impl RawShared {
    fn validate(self) -> Result<SharedContext> {
        let field = |name: &str, value: Option<String>| -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(EnvSyncError::Configuration(format!(
                    "{}: missing or empty field '{}'",
                    SHARED_FILE, name
                ))),
            }
        };
        Ok(SharedContext {
            org: field("org", self.org)?,
            project: field("project", self.project)?,
            environment: field("environment", self.environment)?,
        })
    }
}

/// Developer-private context. Everything optional; `overrides` holds
/// literal values that supersede the remote snapshot during merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalContext {
    pub org: Option<String>,
    pub project: Option<String>,
    pub environment: Option<String>,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl LocalContext {
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(LOCAL_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let local: LocalContext = toml::from_str(&content)
            .map_err(|e| EnvSyncError::Configuration(format!("{}: {}", LOCAL_FILE, e)))?;
        Ok(Some(local))
    }
}

/// Where a resolved context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    Flags,
    Local,
    Shared,
    Interactive,
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextSource::Flags => "flags",
            ContextSource::Local => "local",
            ContextSource::Shared => "shared",
            ContextSource::Interactive => "interactive",
        };
        f.write_str(s)
    }
}

/// The (org, project, environment) triple a command operates on.
/// Immutable once resolved for an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedContext {
    pub org: String,
    pub project: String,
    pub environment: String,
    pub source: ContextSource,
}

impl ResolvedContext {
    /// Key used by the version tracker store.
    pub fn tracker_key(&self) -> String {
        format!("{}/{}/{}", self.org, self.project, self.environment)
    }
}

impl fmt::Display for ResolvedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.environment)
    }
}

/// Context fields supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ContextFlags {
    pub org: Option<String>,
    pub project: Option<String>,
    pub environment: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Resolve the active context from flags and context files in `dir`.
///
/// A full flag triple short-circuits; partial flags only override the
/// matching field. `skip_local` ignores the local file entirely, which
/// service-token invocations require. Returns `None` when any field is
/// still missing — the caller either fails or falls back to an
/// interactive flow.
pub fn resolve(
    flags: &ContextFlags,
    dir: &Path,
    skip_local: bool,
) -> Result<Option<ResolvedContext>> {
    let flag_org = non_empty(flags.org.as_ref());
    let flag_project = non_empty(flags.project.as_ref());
    let flag_environment = non_empty(flags.environment.as_ref());

    if let (Some(org), Some(project), Some(environment)) = (
        flag_org.clone(),
        flag_project.clone(),
        flag_environment.clone(),
    ) {
        return Ok(Some(ResolvedContext {
            org,
            project,
            environment,
            source: ContextSource::Flags,
        }));
    }

    let local = if skip_local {
        None
    } else {
        LocalContext::load(dir)?
    };
    let shared = SharedContext::load(dir)?;

    let pick = |flag: Option<String>,
                local_field: Option<&String>,
                shared_field: Option<&String>|
     -> Option<String> {
        flag.or_else(|| non_empty(local_field))
            .or_else(|| non_empty(shared_field))
    };

    let org = pick(
        flag_org,
        local.as_ref().and_then(|l| l.org.as_ref()),
        shared.as_ref().map(|s| &s.org),
    );
    let project = pick(
        flag_project,
        local.as_ref().and_then(|l| l.project.as_ref()),
        shared.as_ref().map(|s| &s.project),
    );
    let environment = pick(
        flag_environment,
        local.as_ref().and_then(|l| l.environment.as_ref()),
        shared.as_ref().map(|s| &s.environment),
    );

    match (org, project, environment) {
        (Some(org), Some(project), Some(environment)) => {
            let source = if local.is_some() {
                ContextSource::Local
            } else {
                ContextSource::Shared
            };
            Ok(Some(ResolvedContext {
                org,
                project,
                environment,
                source,
            }))
        }
        _ => Ok(None),
    }
}
