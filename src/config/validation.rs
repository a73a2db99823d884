use super::models::Config;
use thiserror::Error;

const MAX_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cluster.host must not be empty")]
    EmptyHost,

    #[error("cluster.port must be non-zero")]
    InvalidPort,

    #[error("cluster.scheme must be 'http' or 'https', got '{0}'")]
    InvalidScheme(String),

    #[error("{field} must start with '/': '{value}'")]
    RelativePath { field: String, value: String },

    #[error("{field} must not be empty")]
    EmptyField { field: String },

    #[error("{field} must be at least 1")]
    ZeroCount { field: String },

    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: u64 },

    #[error("clone.memory must be a positive whole number of MiB, got {0} bytes")]
    InvalidMemory(u64),

    #[error("{field} = {value} is not an HTTP status code")]
    InvalidStatus { field: String, value: u16 },

    #[error("no password configured for user '{0}' (set PRISMCTL_PASSWORD)")]
    MissingPassword(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_cluster(config)?;
    validate_paths(config)?;
    validate_transport(config)?;
    validate_batch(config)?;
    validate_clone(config)?;
    Ok(())
}

/// Commands that talk to a cluster need a password for the configured user
pub fn require_credentials(config: &Config) -> Result<(), ValidationError> {
    match &config.cluster.password {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(ValidationError::MissingPassword(config.cluster.username.clone())),
    }
}

fn validate_cluster(config: &Config) -> Result<(), ValidationError> {
    if config.cluster.host.trim().is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    if config.cluster.port == 0 {
        return Err(ValidationError::InvalidPort);
    }
    if !matches!(config.cluster.scheme.as_str(), "http" | "https") {
        return Err(ValidationError::InvalidScheme(config.cluster.scheme.clone()));
    }
    Ok(())
}

fn validate_paths(config: &Config) -> Result<(), ValidationError> {
    let paths = [
        ("api.v2_base", &config.api.v2_base),
        ("api.v3_base", &config.api.v3_base),
        ("api.batch_path", &config.api.batch_path),
        ("listing.collection_field", &config.listing.collection_field),
        ("listing.name_field", &config.listing.name_field),
        ("listing.id_field", &config.listing.id_field),
    ];

    for (field, value) in paths {
        if !value.starts_with('/') {
            return Err(ValidationError::RelativePath {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    }

    if config.api.vm_collection.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            field: "api.vm_collection".to_string(),
        });
    }

    Ok(())
}

fn validate_transport(config: &Config) -> Result<(), ValidationError> {
    if config.transport.max_retries == 0 {
        return Err(ValidationError::ZeroCount {
            field: "transport.max_retries".to_string(),
        });
    }
    if config.transport.max_retries > MAX_RETRIES {
        return Err(ValidationError::TooLarge {
            field: "transport.max_retries".to_string(),
            max: u64::from(MAX_RETRIES),
        });
    }
    Ok(())
}

fn validate_batch(config: &Config) -> Result<(), ValidationError> {
    let statuses = [
        ("batch.success_status", config.batch.success_status),
        ("batch.accepted_status", config.batch.accepted_status),
    ];

    for (field, value) in statuses {
        if !(100..=599).contains(&value) {
            return Err(ValidationError::InvalidStatus {
                field: field.to_string(),
                value,
            });
        }
    }
    Ok(())
}

fn validate_clone(config: &Config) -> Result<(), ValidationError> {
    let memory = config.clone.memory;
    if memory.as_u64() == 0 || !memory.is_whole_mib() {
        return Err(ValidationError::InvalidMemory(memory.as_u64()));
    }

    let counts = [
        ("clone.num_vcpus", config.clone.num_vcpus as usize),
        ("clone.num_cores_per_vcpu", config.clone.num_cores_per_vcpu as usize),
        ("clone.max_concurrency", config.clone.max_concurrency),
    ];

    for (field, value) in counts {
        if value == 0 {
            return Err(ValidationError::ZeroCount {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}
