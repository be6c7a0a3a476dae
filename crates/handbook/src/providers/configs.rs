/// Configuration for the Mistral provider. Constructed explicitly at
/// startup and injected into the client; there is no ambient global.
#[derive(Debug, Clone)]
pub struct MistralProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub embed_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

pub const MISTRAL_HOST: &str = "https://api.mistral.ai";
pub const MISTRAL_CHAT_MODEL: &str = "mistral-large-latest";
pub const MISTRAL_EMBED_MODEL: &str = "mistral-embed";

impl MistralProviderConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            host: MISTRAL_HOST.to_string(),
            api_key,
            model: MISTRAL_CHAT_MODEL.to_string(),
            embed_model: MISTRAL_EMBED_MODEL.to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }
}
