//! Access-token storage.
//!
//! Personal tokens (from `envsync login`) live in the system keychain. A
//! service token supplied via flag or `ENVSYNC_TOKEN` takes precedence
//! and switches the invocation into service mode: no local context, no
//! overrides, no prompts.

use keyring::Entry;

use crate::error::{EnvSyncError, Result};

const SERVICE: &str = "envsync";
const ACCOUNT: &str = "default";

fn entry() -> Result<Entry> {
    Ok(Entry::new(SERVICE, ACCOUNT)?)
}

pub fn store_token(token: &str) -> Result<()> {
    entry()?.set_password(token)?;
    Ok(())
}

pub fn load_token() -> Result<Option<String>> {
    match entry()?.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Remove the stored token. Returns whether one existed.
pub fn clear_token() -> Result<bool> {
    match entry()?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// The token to use for this invocation, plus whether it is a service
/// token. A missing token is an authentication error, not a prompt.
pub fn resolve_token(service_token: Option<String>) -> Result<(String, bool)> {
    if let Some(token) = service_token.filter(|t| !t.is_empty()) {
        return Ok((token, true));
    }
    match load_token()? {
        Some(token) => Ok((token, false)),
        None => Err(EnvSyncError::AuthenticationRequired),
    }
}
