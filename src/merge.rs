//! Combining a remote base snapshot with local override values.
//!
//! The merge is direction-dependent: on pull and print, overrides are
//! always applied on top of the base; on push, keys that appear both in
//! the working file and in the declared overrides are a leak hazard and
//! go through an explicit confirm-or-strip step in the sync protocol.

use crate::envfile::EnvMapping;
use std::collections::HashMap;

/// Apply `overrides` on top of `base`. Overrides strictly win; keys
/// present only in the overrides are added.
pub fn apply_overrides(base: &EnvMapping, overrides: &HashMap<String, String>) -> EnvMapping {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Keys present in both the working-file mapping and the declared
/// overrides, sorted for stable display.
pub fn collisions(workfile: &EnvMapping, overrides: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<String> = workfile
        .keys()
        .filter(|k| overrides.contains_key(*k))
        .cloned()
        .collect();
    keys.sort();
    keys
}

/// Remove the given keys from a push payload. Removed keys are omitted
/// entirely so the remote keeps its own last known value for them.
pub fn strip_keys(payload: &mut EnvMapping, keys: &[String]) {
    for key in keys {
        payload.remove(key);
    }
}
