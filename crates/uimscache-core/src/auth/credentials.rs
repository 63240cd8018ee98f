use anyhow::{Context, Result};
use keyring::Entry;

use crate::api::Credentials;

/// Keychain service under which UIMS passwords are filed, one entry per UID.
const SERVICE_NAME: &str = "uimscache";

/// UIMS passwords kept in the OS keychain.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(uid: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, uid).context("Failed to open keychain entry")
    }

    /// Remember the password for `credentials.uid`.
    pub fn save(credentials: &Credentials) -> Result<()> {
        Self::entry(&credentials.uid)?
            .set_password(&credentials.password)
            .context("Failed to store password in keychain")
    }

    /// Credentials for `uid`, if a password was saved for it.
    pub fn load(uid: &str) -> Result<Credentials> {
        let password = Self::entry(uid)?
            .get_password()
            .with_context(|| format!("No saved password for {}", uid))?;
        Ok(Credentials {
            uid: uid.to_string(),
            password,
        })
    }

    pub fn forget(uid: &str) -> Result<()> {
        Self::entry(uid)?
            .delete_credential()
            .context("Failed to delete password from keychain")
    }
}
