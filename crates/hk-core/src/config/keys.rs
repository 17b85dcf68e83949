//! SSH key registry

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::traits::KeyResolver;
use crate::types::Credential;

/// A named SSH key known to the local machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyEntry {
    /// Name under which the public key is registered with the cloud project
    pub name: String,

    /// Path to the private key; a leading `~` is the home directory
    pub private_key_path: PathBuf,

    /// Path to the matching public key
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
}

impl SshKeyEntry {
    /// Create a new entry
    pub fn new(name: impl Into<String>, private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            private_key_path: private_key_path.into(),
            public_key_path: None,
        }
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

impl KeyResolver for Vec<SshKeyEntry> {
    fn resolve_key(&self, name: &str) -> Option<Credential> {
        self.iter()
            .find(|entry| entry.name == name)
            .map(|entry| Credential::from_path(&entry.name, expand_home(&entry.private_key_path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeySource;

    #[test]
    fn test_resolve_known_key() {
        let keys = vec![
            SshKeyEntry::new("ops", "/etc/keys/ops"),
            SshKeyEntry::new("deploy", "/etc/keys/deploy"),
        ];
        let cred = keys.resolve_key("deploy").unwrap();
        assert_eq!(cred.name, "deploy");
        assert_eq!(cred.source, KeySource::Path(PathBuf::from("/etc/keys/deploy")));
    }

    #[test]
    fn test_resolve_unknown_key() {
        let keys = vec![SshKeyEntry::new("ops", "/etc/keys/ops")];
        assert!(keys.resolve_key("missing").is_none());
    }

    #[test]
    fn test_expand_home() {
        let absolute = Path::new("/tmp/id_rsa");
        assert_eq!(expand_home(absolute), PathBuf::from("/tmp/id_rsa"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/.ssh/id_rsa")),
                home.join(".ssh/id_rsa")
            );
        }
    }
}
