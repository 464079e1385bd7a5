use crate::infrastructure::document_store::DEFAULT_CREDENTIAL_HEADER;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const APP_JSON: &str = "app.json";
const SCHEMA_VERSION: u8 = 1;
const DEFAULT_API_BASE: &str = "https://api.jsonbin.io/v3/b/";
const DEFAULT_DEBOUNCE_MS: u64 = 2_000;
const DEFAULT_SYNCED_STATUS_MS: u64 = 2_000;
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub bin_id: String,
    #[serde(default = "default_credential_header")]
    pub credential_header: String,
    #[serde(default)]
    pub master_key: Option<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_synced_status_ms")]
    pub synced_status_ms: u64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_credential_header() -> String {
    DEFAULT_CREDENTIAL_HEADER.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_synced_status_ms() -> u64 {
    DEFAULT_SYNCED_STATUS_MS
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SCHEMA_VERSION,
            api_base: default_api_base(),
            bin_id: String::new(),
            credential_header: default_credential_header(),
            master_key: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            synced_status_ms: DEFAULT_SYNCED_STATUS_MS,
            timezone: default_timezone(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn synced_status_hold(&self) -> Duration {
        Duration::from_millis(self.synced_status_ms)
    }

    pub fn parsed_timezone(&self) -> Result<Tz, InfraError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("invalid timezone '{}': {error}", self.timezone))
        })
    }

    pub fn configured_master_key(&self) -> Option<&str> {
        self.master_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        if self.schema != SCHEMA_VERSION {
            return Err(InfraError::InvalidConfig(format!(
                "unsupported schema {}",
                self.schema
            )));
        }
        if self.bin_id.trim().is_empty() {
            return Err(InfraError::InvalidConfig("binId must not be empty".to_string()));
        }
        if self.debounce_ms == 0 {
            return Err(InfraError::InvalidConfig("debounceMs must be > 0".to_string()));
        }
        self.parsed_timezone()?;
        Ok(())
    }
}

/// Writes `app.json` with defaults unless one already exists.
pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    fs::create_dir_all(config_dir)?;
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != u64::from(SCHEMA_VERSION) {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    let config: AppConfig = serde_json::from_value(parsed)?;
    config.validate()?;
    Ok(config)
}
