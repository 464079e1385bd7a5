use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

pub trait SecretStore: Send + Sync {
    fn save_master_key(&self, key: &str) -> Result<(), InfraError>;
    fn load_master_key(&self) -> Result<Option<String>, InfraError>;
    fn delete_master_key(&self) -> Result<(), InfraError>;
}

/// OS credential store: Keychain on macOS, Credential Manager on Windows and the
/// kernel keyutils session keyring on Linux, which does not outlive a reboot.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service_name: String,
    account_name: String,
}

impl KeyringSecretStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new("pomoboard.document-store", "default")
    }
}

impl SecretStore for KeyringSecretStore {
    fn save_master_key(&self, key: &str) -> Result<(), InfraError> {
        self.entry()?
            .set_password(key.trim())
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load_master_key(&self) -> Result<Option<String>, InfraError> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }

    fn delete_master_key(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    key: Mutex<Option<String>>,
}

impl SecretStore for InMemorySecretStore {
    fn save_master_key(&self, key: &str) -> Result<(), InfraError> {
        let mut guard = self
            .key
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(key.trim().to_string());
        Ok(())
    }

    fn load_master_key(&self) -> Result<Option<String>, InfraError> {
        let guard = self
            .key
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_master_key(&self) -> Result<(), InfraError> {
        let mut guard = self
            .key
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

/// The key in `app.json` wins; otherwise the secret store must hold one.
pub fn resolve_master_key(config: &AppConfig, secrets: &dyn SecretStore) -> Result<String, InfraError> {
    if let Some(key) = config.configured_master_key() {
        return Ok(key.to_string());
    }
    secrets
        .load_master_key()?
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            InfraError::InvalidConfig(
                "missing master key (set masterKey in app.json or store it in the keyring)"
                    .to_string(),
            )
        })
}
