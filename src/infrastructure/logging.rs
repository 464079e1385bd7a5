use crate::infrastructure::error::InfraError;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> Result<bool, InfraError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid logFilter '{default_filter}': {error}"))
        })?,
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}
