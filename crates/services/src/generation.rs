use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tellect_core::model::{AiSettings, AiSettingsDraft, AiSettingsError, MindmapDraft, Subject};

use crate::error::GenerationError;

/// Environment variable holding the provider API key. Generation is disabled without it.
pub const API_KEY_ENV: &str = "TELLECT_AI_API_KEY";
pub const BASE_URL_ENV: &str = "TELLECT_AI_BASE_URL";
pub const MODEL_ENV: &str = "TELLECT_AI_MODEL";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const FLASHCARD_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Flashcards,
    Mindmap,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Flashcards => "flashcards",
            ContentKind::Mindmap => "mindmap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFlashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFlashcards {
    pub flashcards: Vec<GeneratedFlashcard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMindmap {
    pub mindmap: MindmapDraft,
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub settings: AiSettings,
    pub temperature: f32,
}

impl GenerationConfig {
    #[must_use]
    pub fn new(settings: AiSettings) -> Self {
        Self {
            settings,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Read provider settings from the environment.
    ///
    /// Returns `Ok(None)` when no API key is set.
    ///
    /// # Errors
    ///
    /// Returns `AiSettingsError::InvalidBaseUrl` if the configured endpoint is not an http(s) URL.
    pub fn from_env() -> Result<Option<Self>, AiSettingsError> {
        let draft = AiSettingsDraft {
            api_key: env::var(API_KEY_ENV).ok(),
            model: env::var(MODEL_ENV).ok(),
            base_url: env::var(BASE_URL_ENV).ok(),
        };
        match draft.validate() {
            Ok(settings) => Ok(Some(Self::new(settings))),
            Err(AiSettingsError::MissingApiKey) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Generates flashcards and mindmaps through an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct GenerationService {
    client: Client,
    config: Option<GenerationConfig>,
}

impl GenerationService {
    /// Build from environment settings. An invalid endpoint disables generation.
    #[must_use]
    pub fn from_env() -> Self {
        let config = GenerationConfig::from_env().unwrap_or_else(|e| {
            log::warn!("content generation disabled: {e}");
            None
        });
        Self::new(config)
    }

    #[must_use]
    pub fn new(config: Option<GenerationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the provider for flashcards on a topic.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the service is disabled, the topic is blank,
    /// the request fails, or the response cannot be parsed.
    pub async fn generate_flashcards(
        &self,
        topic: &str,
        subject: Subject,
    ) -> Result<GeneratedFlashcards, GenerationError> {
        let raw = self.complete(ContentKind::Flashcards, topic, subject).await?;
        parse_flashcards(&raw)
    }

    /// Ask the provider for a mindmap on a topic.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the service is disabled, the topic is blank,
    /// the request fails, or the response cannot be parsed.
    pub async fn generate_mindmap(
        &self,
        topic: &str,
        subject: Subject,
    ) -> Result<GeneratedMindmap, GenerationError> {
        let raw = self.complete(ContentKind::Mindmap, topic, subject).await?;
        let mut generated = parse_mindmap(&raw)?;
        if generated.mindmap.title.trim().is_empty() {
            generated.mindmap.title = topic.trim().to_string();
        }
        Ok(generated)
    }

    async fn complete(
        &self,
        kind: ContentKind,
        topic: &str,
        subject: Subject,
    ) -> Result<String, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::EmptyTopic);
        }

        let payload = ChatRequest {
            model: config.settings.model().to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(kind, topic, subject),
                },
                ChatMessage {
                    role: "user",
                    content: topic.to_string(),
                },
            ],
            temperature: config.temperature,
        };

        log::debug!("requesting {} for {topic:?}", kind.as_str());
        let response = self
            .client
            .post(config.settings.chat_completions_url())
            .bearer_auth(config.settings.api_key())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

pub(crate) fn system_prompt(kind: ContentKind, topic: &str, subject: Subject) -> String {
    let subject = subject.as_str();
    match kind {
        ContentKind::Flashcards => format!(
            r#"You are an educational content creator. Generate flashcards for the topic "{topic}" in the subject "{subject}".
Return exactly {FLASHCARD_COUNT} flashcards in this JSON format:
{{
  "flashcards": [
    {{"question": "Question text", "answer": "Answer text"}},
    {{"question": "Question text", "answer": "Answer text"}}
  ]
}}
Make questions clear and answers concise but complete."#
        ),
        ContentKind::Mindmap => format!(
            r#"You are an educational content creator. Generate a mindmap structure for the topic "{topic}" in the subject "{subject}".
Return a mindmap in this JSON format:
{{
  "mindmap": {{
    "title": "{topic}",
    "nodes": [
      {{"id": "1", "label": "Central Topic", "position": {{"x": 0, "y": 0}}, "type": "central"}},
      {{"id": "2", "label": "Subtopic 1", "position": {{"x": -200, "y": -100}}, "type": "branch"}},
      {{"id": "3", "label": "Subtopic 2", "position": {{"x": 200, "y": -100}}, "type": "branch"}}
    ],
    "edges": [
      {{"id": "e1-2", "source": "1", "target": "2"}},
      {{"id": "e1-3", "source": "1", "target": "3"}}
    ]
  }}
}}
Create 5-8 nodes with meaningful connections. Position nodes logically around the central topic."#
        ),
    }
}

/// Drop a surrounding Markdown code fence (with or without a language tag).
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // skip the info string, e.g. "json", which may run straight into the payload
    let info_len = if body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        body.find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(body.len())
    } else {
        0
    };
    body[info_len..].trim()
}

pub(crate) fn parse_flashcards(raw: &str) -> Result<GeneratedFlashcards, GenerationError> {
    Ok(serde_json::from_str(strip_code_fence(raw))?)
}

pub(crate) fn parse_mindmap(raw: &str) -> Result<GeneratedMindmap, GenerationError> {
    Ok(serde_json::from_str(strip_code_fence(raw))?)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
