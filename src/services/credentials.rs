//! Instance credentials registry.
//!
//! Keeps the engine instances a user has connected to and which one is
//! active. Records persist as JSON in the data directory.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File name of the registry inside the data directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Connection details for one engine instance.
#[derive(Debug, Clone)]
pub struct CredentialsRecord {
    /// Stable identifier.
    pub id: String,
    /// Base URL of the instance.
    pub base_uri: String,
    /// API key.
    pub access_key: SecretString,
    /// Friendly name.
    pub name: Option<String>,
}

impl CredentialsRecord {
    /// Creates a record with an id derived from its URL and key.
    #[must_use]
    pub fn new(base_uri: impl Into<String>, access_key: SecretString) -> Self {
        let base_uri = base_uri.into();
        let id = derive_id(&base_uri, access_key.expose_secret());
        Self {
            id,
            base_uri,
            access_key,
            name: None,
        }
    }

    /// Overrides the derived id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the friendly name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// Returns the name, falling back to the base URL.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.base_uri)
    }
}

impl PartialEq for CredentialsRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.base_uri == other.base_uri
            && self.access_key.expose_secret() == other.access_key.expose_secret()
            && self.name == other.name
    }
}

/// Derives a record id: the first 8 hex digits of SHA-256 over
/// `{"baseUri":…,"accessKey":…}`.
#[must_use]
pub fn derive_id(base_uri: &str, access_key: &str) -> String {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Identity<'a> {
        base_uri: &'a str,
        access_key: &'a str,
    }

    let json = serde_json::to_string(&Identity {
        base_uri,
        access_key,
    })
    .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..8].to_string()
}

/// On-disk form of a record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    base_uri: String,
    access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&CredentialsRecord> for StoredRecord {
    fn from(record: &CredentialsRecord) -> Self {
        Self {
            id: record.id.clone(),
            base_uri: record.base_uri.clone(),
            access_key: record.access_key.expose_secret().to_string(),
            name: record.name.clone(),
        }
    }
}

impl From<StoredRecord> for CredentialsRecord {
    fn from(stored: StoredRecord) -> Self {
        Self {
            id: stored.id,
            base_uri: stored.base_uri,
            access_key: SecretString::from(stored.access_key),
            name: stored.name,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRegistry {
    #[serde(default)]
    records: Vec<StoredRecord>,
    #[serde(default)]
    current: Option<StoredRecord>,
}

/// Registry of known instances.
///
/// Changes are kept in memory until [`CredentialsStore::persist`].
#[derive(Debug, Default)]
pub struct CredentialsStore {
    path: Option<PathBuf>,
    records: Vec<CredentialsRecord>,
    current: Option<CredentialsRecord>,
}

impl CredentialsStore {
    /// Creates an in-memory store that never persists.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the registry at `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let registry = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::OperationFailed {
                operation: "read_credentials".to_string(),
                cause: e.to_string(),
            })?;
            serde_json::from_str::<StoredRegistry>(&contents).map_err(|e| Error::OperationFailed {
                operation: "parse_credentials".to_string(),
                cause: e.to_string(),
            })?
        } else {
            StoredRegistry::default()
        };

        Ok(Self {
            path: Some(path),
            records: registry.records.into_iter().map(Into::into).collect(),
            current: registry.current.map(Into::into),
        })
    }

    /// Returns the registry path inside `data_dir`.
    #[must_use]
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CREDENTIALS_FILE)
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns every record in insertion order.
    #[must_use]
    pub fn records(&self) -> &[CredentialsRecord] {
        &self.records
    }

    /// Returns the active record.
    #[must_use]
    pub const fn current(&self) -> Option<&CredentialsRecord> {
        self.current.as_ref()
    }

    /// Looks a record up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CredentialsRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Adds or replaces a record. Returns its id.
    pub fn save(&mut self, record: CredentialsRecord) -> String {
        let id = record.id.clone();
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        tracing::debug!(id = %id, "saved credentials");
        id
    }

    /// Saves a record and makes it the active one. Returns its id.
    pub fn authenticate(&mut self, record: CredentialsRecord) -> String {
        self.current = Some(record.clone());
        self.save(record)
    }

    /// Makes a saved record the active one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no record has that id.
    pub fn switch(&mut self, id: &str) -> Result<&CredentialsRecord> {
        let record = self
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("unknown instance `{id}`")))?;
        tracing::info!(id, base_uri = %record.base_uri, "switched instance");
        Ok(self.current.insert(record))
    }

    /// Removes a record. The active record is left as is.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        before != self.records.len()
    }

    /// Forgets every record and the active one.
    pub fn logout(&mut self) {
        self.records.clear();
        self.current = None;
    }

    /// Writes the registry to its file. No-op for in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let registry = StoredRegistry {
            records: self.records.iter().map(StoredRecord::from).collect(),
            current: self.current.as_ref().map(StoredRecord::from),
        };
        let json = serde_json::to_string_pretty(&registry)
            .map_err(|e| Error::operation("serialize_credentials", e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_data_dir", e))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::operation("write_credentials", e))?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, path).map_err(|e| Error::operation("write_credentials", e))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| Error::operation("write_credentials", e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
