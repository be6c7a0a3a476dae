use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings path back to the environment variable a user must
/// set, e.g. `provider.api_key` to `HANDBOOK_PROVIDER__API_KEY`.
pub fn to_env_var(field: &str) -> String {
    format!("HANDBOOK_{}", field.replace('.', "__").to_uppercase())
}
