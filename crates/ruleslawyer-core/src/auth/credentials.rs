use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

/// Keychain service name
const SERVICE_NAME: &str = "ruleslawyer";

/// Key under which the bearer token is persisted, in every backend
pub const TOKEN_KEY: &str = "auth_token";

/// Credentials file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Persistent home of the bearer token.
///
/// Implementations do storage only: no network access and no inspection of
/// the token itself. `clear` must succeed when nothing is stored.
pub trait CredentialStore: Send + Sync {
    /// Persist the token, overwriting any previous one
    fn save(&self, token: &str) -> Result<()>;

    /// Return the persisted token, if any
    fn load(&self) -> Result<Option<String>>;

    /// Remove the persisted token
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// OS keychain
// ============================================================================

/// Stores the token in the OS keychain.
pub struct KeyringStore {
    entry: Entry,
}

impl KeyringStore {
    pub fn new() -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)
            .context("Failed to create keyring entry")?;
        Ok(Self { entry })
    }
}

impl CredentialStore for KeyringStore {
    fn save(&self, token: &str) -> Result<()> {
        self.entry
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn load(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// JSON file
// ============================================================================

/// Stores the token as `{"auth_token": "..."}` in a JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `credentials.json` inside `dir`
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(CREDENTIALS_FILE),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create credentials directory")?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents).context("Failed to write credentials file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict credentials file permissions")?;
        }
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn save(&self, token: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)?;
        debug!(path = ?self.path, "Token saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        let mut entries = self.read_entries()?;
        Ok(entries.remove(TOKEN_KEY))
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
        } else {
            self.write_entries(&entries)?;
        }
        debug!(path = ?self.path, "Token cleared");
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
