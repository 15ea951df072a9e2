//! Credential Vault: a single JSON file mapping provider name to
//! [`Credential`], serialized through an in-process reader/writer lock.
//!
//! The file is fully rewritten on every save; there is no partial-update
//! path and no cross-process locking (the vault is a process-wide
//! resource, not a shared one).

mod error;

pub use error::VaultError;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// An OAuth credential for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    #[serde(rename = "access")]
    pub access_token: String,
    #[serde(rename = "refresh")]
    pub refresh_token: String,
    /// Unix seconds; 0 means "never expires".
    pub expires: i64,

    /// Unrecognized fields round-trip silently rather than causing a parse
    /// error; the vault never repairs or prunes them.
    #[serde(flatten)]
    pub extra_fields: HashMap<String, serde_json::Value>,
}

impl Credential {
    pub fn new(
        provider: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires: i64,
    ) -> Self {
        Self {
            kind: "oauth".to_string(),
            provider: provider.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires,
            extra_fields: HashMap::new(),
        }
    }

    /// `now >= expires` when `expires` is positive; never-expiring (0) is
    /// always fresh.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires > 0 && now >= self.expires
    }

    /// The refresh window opens 60s before actual expiry so the Auth
    /// Transport can swap the token before a request ever sees a 401.
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.expires > 0 && now >= self.expires - 60
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultFile(HashMap<String, Credential>);

/// Credential Vault backed by a single JSON file.
pub struct CredentialVault {
    path: PathBuf,
    state: RwLock<HashMap<String, Credential>>,
}

impl CredentialVault {
    /// Default path: `<config-dir>/cpe/auth.json`.
    pub fn default_path() -> Result<PathBuf, VaultError> {
        Ok(dirs::config_dir()
            .ok_or(VaultError::NoConfigDir)?
            .join("cpe")
            .join("auth.json"))
    }

    /// Open the vault at its default path, tolerating a missing file.
    pub fn open() -> Result<Self, VaultError> {
        Self::open_at(Self::default_path()?)
    }

    pub fn open_at(path: PathBuf) -> Result<Self, VaultError> {
        let state = Self::load(&path)?;
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    fn load(path: &Path) -> Result<HashMap<String, Credential>, VaultError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(VaultError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let file: VaultFile =
            serde_json::from_str(&contents).map_err(|source| VaultError::CorruptedData {
                path: path.display().to_string(),
                source,
            })?;
        Ok(file.0)
    }

    fn persist(&self, state: &HashMap<String, Credential>) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| VaultError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
            set_dir_mode(parent);
        }
        let body = serde_json::to_string_pretty(&VaultFile(state.clone()))
            .unwrap_or_else(|_| "{}".to_string());

        // Write to a sibling temp file and rename into place so a reader
        // never observes a partially written vault file.
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, body).map_err(|source| VaultError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        set_file_mode(&tmp_path);
        std::fs::rename(&tmp_path, &self.path).map_err(|source| VaultError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn get(&self, provider: &str) -> Result<Credential, VaultError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .get(provider)
            .cloned()
            .ok_or_else(|| VaultError::not_found(provider))
    }

    pub fn save(&self, credential: Credential) -> Result<(), VaultError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.insert(credential.provider.clone(), credential);
        self.persist(&state)
    }

    pub fn delete(&self, provider: &str) -> Result<(), VaultError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.remove(provider).is_none() {
            return Err(VaultError::not_found(provider));
        }
        self.persist(&state)
    }

    pub fn list(&self) -> BTreeSet<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.keys().cloned().collect()
    }
}

#[cfg(unix)]
fn set_file_mode(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mut perms = metadata.permissions();
        perms.set_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) {}

#[cfg(unix)]
fn set_dir_mode(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mut perms = metadata.permissions();
        perms.set_mode(0o700);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) {}
