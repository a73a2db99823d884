use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "PRISMCTL_CONFIG";
const PASSWORD_ENV_VAR: &str = "PRISMCTL_PASSWORD";
const DEFAULT_CONFIG_PATH: &str = "config/prismctl.toml";
const ENV_PREFIX: &str = "PRISMCTL";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(explicit_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = explicit_path.unwrap_or_else(|| {
        env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    });

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);

    Ok(config)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    if let Ok(password) = env::var(PASSWORD_ENV_VAR) {
        if !password.is_empty() {
            config.cluster.password = Some(password);
        }
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // PRISMCTL__CLUSTER__HOST -> cluster.host
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.cluster.port, 9440);
        assert_eq!(config.api.vm_collection, "vms");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[cluster]
host = "10.42.1.39"
port = 9440
username = "ops"

[transport]
verify_tls = true
max_retries = 5

[listing]
name_field = "/status/name"
id_field = "/metadata/uuid"

[batch]
execution_order = "NON_SEQUENTIAL"
action_on_failure = "ABORT"

[clone]
memory = "2GiB"
num_vcpus = 2
max_concurrency = 8
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();

        assert_eq!(config.cluster.host, "10.42.1.39");
        assert_eq!(config.cluster.username, "ops");
        assert!(config.transport.verify_tls);
        assert_eq!(config.transport.max_retries, 5);
        assert_eq!(config.listing.name_field, "/status/name");
        assert_eq!(
            config.batch.execution_order,
            crate::batch::ExecutionOrder::NonSequential
        );
        assert_eq!(
            config.batch.action_on_failure,
            crate::batch::ActionOnFailure::Abort
        );
        assert_eq!(config.clone.memory.as_u64(), 2 * 1024 * 1024 * 1024);
        assert_eq!(config.clone.max_concurrency, 8);
        assert!(config.cluster.password.is_none());
    }

    #[test]
    fn test_password_in_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            "[cluster]\nusername = \"admin\"\npassword = \"leaked\"\n",
        )
        .unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert!(config.cluster.password.is_none());
    }
}
