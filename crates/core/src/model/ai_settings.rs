use thiserror::Error;
use url::Url;

/// Default endpoint for OpenAI-compatible chat completions.
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model used for content generation.
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Validated connection settings for the content generation provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AiSettings {
    api_key: String,
    model: String,
    base_url: Url,
}

#[derive(Clone, Debug, Default)]
pub struct AiSettingsDraft {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AiSettingsError {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl AiSettingsDraft {
    /// Validate and normalize the draft, filling in default model and endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AiSettingsError::MissingApiKey` if no key is present and
    /// `AiSettingsError::InvalidBaseUrl` if the endpoint does not parse.
    pub fn validate(self) -> Result<AiSettings, AiSettingsError> {
        let api_key = normalize_optional(self.api_key).ok_or(AiSettingsError::MissingApiKey)?;
        let model = normalize_optional(self.model).unwrap_or_else(|| DEFAULT_AI_MODEL.into());
        let raw_url =
            normalize_optional(self.base_url).unwrap_or_else(|| DEFAULT_AI_BASE_URL.into());
        let base_url = match Url::parse(&raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Err(AiSettingsError::InvalidBaseUrl(raw_url)),
        };

        Ok(AiSettings {
            api_key,
            model,
            base_url,
        })
    }
}

impl AiSettings {
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the chat completions endpoint.
    #[must_use]
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
