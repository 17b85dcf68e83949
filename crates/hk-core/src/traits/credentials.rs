//! Credential resolution traits

use std::collections::HashMap;

use crate::types::Credential;

/// Maps a key name to local private key material
pub trait KeyResolver: Send + Sync {
    /// Look up a key by name
    fn resolve_key(&self, name: &str) -> Option<Credential>;
}

impl KeyResolver for HashMap<String, Credential> {
    fn resolve_key(&self, name: &str) -> Option<Credential> {
        self.get(name).cloned()
    }
}
