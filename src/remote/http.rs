//! HTTP implementation of the remote port.
//!
//! Thin REST client: bearer-token auth, JSON bodies, one request per
//! verb. Failures map onto the error taxonomy; nothing is retried.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Environment, Organization, Project, Remote, RollbackOutcome, Snapshot};
use crate::error::{EnvSyncError, Result};

pub struct HttpRemote {
    base: Url,
    token: String,
    client: Client,
}

impl HttpRemote {
    pub fn new(base: Url, token: String) -> Self {
        Self {
            base,
            token,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| EnvSyncError::Validation(format!("invalid API URL: {}", e)))
    }

    fn get<T: DeserializeOwned>(&self, path: &str, resource: &str) -> Result<T> {
        let resp = self
            .client
            .get(self.url(path)?)
            .bearer_auth(&self.token)
            .send()?;
        decode(check_status(resp, resource)?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        resource: &str,
    ) -> Result<T> {
        let resp = self
            .client
            .post(self.url(path)?)
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        decode(check_status(resp, resource)?)
    }
}

/// Map non-success statuses onto the error taxonomy. Conflict (409) is
/// handled by the caller where the attempted base version is known.
fn check_status(resp: Response, resource: &str) -> Result<Response> {
    match resp.status() {
        s if s.is_success() => Ok(resp),
        StatusCode::UNAUTHORIZED => Err(EnvSyncError::AuthenticationRequired),
        StatusCode::FORBIDDEN => Err(EnvSyncError::PermissionDenied(resource.to_string())),
        StatusCode::NOT_FOUND => Err(EnvSyncError::NotFound(resource.to_string())),
        s if s.is_client_error() => {
            let message = resp.text().unwrap_or_default();
            Err(EnvSyncError::Validation(message))
        }
        s => Err(EnvSyncError::Network(format!(
            "unexpected status {} for {}",
            s, resource
        ))),
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    Ok(resp.json()?)
}

#[derive(Serialize)]
struct PushRequest<'a> {
    plaintext: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_version: Option<u64>,
}

#[derive(Serialize)]
struct RollbackRequest {
    target_version: u64,
}

#[derive(Serialize)]
struct NameRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ConflictBody {
    current_version: u64,
}

impl Remote for HttpRemote {
    fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.get("v1/organizations", "organization listing")
    }

    fn list_projects(&self, org_id: u64) -> Result<Vec<Project>> {
        self.get(
            &format!("v1/organizations/{}/projects", org_id),
            "project listing",
        )
    }

    fn list_environments(&self, project_id: u64) -> Result<Vec<Environment>> {
        self.get(
            &format!("v1/projects/{}/environments", project_id),
            "environment listing",
        )
    }

    fn current_snapshot(&self, env_id: u64) -> Result<Snapshot> {
        self.get(&format!("v1/environments/{}/snapshot", env_id), "snapshot")
    }

    fn snapshot_by_version(&self, env_id: u64, version: u64) -> Result<Snapshot> {
        self.get(
            &format!("v1/environments/{}/snapshots/{}", env_id, version),
            &format!("snapshot version {}", version),
        )
    }

    fn push_snapshot(
        &self,
        env_id: u64,
        plaintext: &str,
        base_version: Option<u64>,
    ) -> Result<Snapshot> {
        let resp = self
            .client
            .post(self.url(&format!("v1/environments/{}/snapshots", env_id))?)
            .bearer_auth(&self.token)
            .json(&PushRequest {
                plaintext,
                base_version,
            })
            .send()?;
        if resp.status() == StatusCode::CONFLICT {
            let body: ConflictBody = resp.json()?;
            return Err(EnvSyncError::Conflict {
                base: base_version,
                remote_version: body.current_version,
            });
        }
        decode(check_status(resp, "snapshot push")?)
    }

    fn rollback(&self, env_id: u64, target_version: u64) -> Result<RollbackOutcome> {
        self.post(
            &format!("v1/environments/{}/rollback", env_id),
            &RollbackRequest { target_version },
            &format!("rollback to version {}", target_version),
        )
    }

    fn create_environment(&self, project_id: u64, name: &str) -> Result<Environment> {
        self.post(
            &format!("v1/projects/{}/environments", project_id),
            &NameRequest { name },
            "environment creation",
        )
    }

    fn clone_environment(&self, env_id: u64, name: &str) -> Result<Environment> {
        self.post(
            &format!("v1/environments/{}/clone", env_id),
            &NameRequest { name },
            "environment clone",
        )
    }

    fn delete_environment(&self, env_id: u64, hard: bool) -> Result<()> {
        let mut url = self.url(&format!("v1/environments/{}", env_id))?;
        if hard {
            url.set_query(Some("hard=true"));
        }
        let resp = self
            .client
            .delete(url)
            .bearer_auth(&self.token)
            .send()?;
        check_status(resp, "environment deletion")?;
        Ok(())
    }
}
