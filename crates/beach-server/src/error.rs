use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid value for {env_var}: {reason}")]
    InvalidValue { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets a dotted configuration key,
/// e.g. `provider.api_key` -> `BEACH_PROVIDER__API_KEY`.
pub fn to_env_var(field_path: &str) -> String {
    format!("BEACH_{}", field_path.to_uppercase().replace('.', "__"))
}
