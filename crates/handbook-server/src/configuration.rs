use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use handbook::providers::configs::{
    MistralProviderConfig, MISTRAL_CHAT_MODEL, MISTRAL_EMBED_MODEL, MISTRAL_HOST,
};
use handbook::retrieval::VectorStoreConfig;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_host")]
    pub host: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> MistralProviderConfig {
        MistralProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            embed_model: self.embed_model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VectorStoreSettings {
    pub host: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_query_fn")]
    pub query_fn: String,
}

impl VectorStoreSettings {
    pub fn into_config(self) -> VectorStoreConfig {
        VectorStoreConfig {
            host: self.host,
            api_key: self.api_key,
            table: self.table,
            query_fn: self.query_fn,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub vector_store: VectorStoreSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Defaults first, then environment variables layered on top
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("provider.host", default_provider_host())?
            .set_default("provider.model", default_model())?
            .set_default("provider.embed_model", default_embed_model())?
            .set_default("vector_store.table", default_table())?
            .set_default("vector_store.query_fn", default_query_fn())?
            .add_source(
                Environment::with_prefix("HANDBOOK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Missing field errors are reported as the environment variable the
        // user needs to set, not as a deserialization failure.
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches("`");
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_provider_host() -> String {
    MISTRAL_HOST.to_string()
}

fn default_model() -> String {
    MISTRAL_CHAT_MODEL.to_string()
}

fn default_embed_model() -> String {
    MISTRAL_EMBED_MODEL.to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.7)
}

fn default_table() -> String {
    "handbook_documents".to_string()
}

fn default_query_fn() -> String {
    "match_handbook_documents".to_string()
}
