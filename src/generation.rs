//! LLM-backed suggestion generator.
//!
//! [`LlmGenerator`] implements [`SuggestionGenerator`] against two hosted
//! providers, selected by `llm.provider`:
//!
//! - **`anthropic`**: `POST https://api.anthropic.com/v1/messages`
//! - **`openai`**: `POST https://api.openai.com/v1/chat/completions`
//!
//! The model is asked for a fixed number of short completions separated by
//! [`SUGGESTION_DELIMITER`]; [`parse_suggestions`] splits the reply back
//! into a ranked batch.
//!
//! There is no retry. A failed call surfaces as a [`GenerationError`] and
//! the pipeline shows nothing; the next trigger is the retry.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{Config, LlmConfig};
use crate::error::GenerationError;
use crate::models::Suggestion;
use crate::traits::SuggestionGenerator;

pub const SUGGESTION_DELIMITER: &str = "---SUGGESTION---";

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "\
You are a contextual autocomplete assistant. Your job is to suggest short, \
relevant completions for text the user is currently typing in a chat interface.

Rules:
- Generate exactly {num_suggestions} distinct suggestions
- Each suggestion should be 1-2 sentences maximum
- Suggestions should naturally continue or complete the user's current input
- Use the provided context to make suggestions relevant to the conversation
- Do not repeat what the user has already typed
- Do not include meta-commentary, just the completion text
- Separate each suggestion with the delimiter: ---SUGGESTION---
- Output ONLY the suggestions separated by the delimiter, nothing else
";

const USER_PROMPT: &str = "\
Context from the current session:
{context}

Currently typing in: {app_name}
Current input so far:
{current_input}

Generate {num_suggestions} short completions for this input.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn parse(name: &str) -> Result<Self, GenerationError> {
        match name {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            other => Err(GenerationError::UnknownProvider(other.to_string())),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }
}

/// System and user messages for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(
    current_input: &str,
    context: &str,
    app_name: &str,
    num_suggestions: usize,
) -> Prompt {
    let n = num_suggestions.to_string();
    let context = if context.is_empty() {
        "(no context yet)"
    } else {
        context
    };
    let vars = [
        ("num_suggestions", n.as_str()),
        ("context", context),
        ("app_name", app_name),
        ("current_input", current_input),
    ];
    Prompt {
        system: fill(SYSTEM_PROMPT, &vars),
        user: fill(USER_PROMPT, &vars),
    }
}

/// Single-pass `{name}` substitution; substituted text is never rescanned.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars.iter().find_map(|(key, value)| {
            tail.strip_prefix(key)
                .and_then(|r| r.strip_prefix('}'))
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Split a model reply on the delimiter. Parts are trimmed, empty parts are
/// dropped, and ranks follow output order.
pub fn parse_suggestions(raw: &str) -> Vec<Suggestion> {
    Suggestion::ranked(
        raw.split(SUGGESTION_DELIMITER)
            .map(str::trim)
            .filter(|part| !part.is_empty()),
    )
}

pub struct LlmGenerator {
    config: LlmConfig,
    num_suggestions: usize,
    client: reqwest::Client,
}

impl LlmGenerator {
    pub fn new(config: &Config) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.llm.clone(),
            num_suggestions: config.suggestions.num_suggestions,
            client,
        })
    }

    async fn call_anthropic(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .anthropic_api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey("ANTHROPIC_API_KEY"))?;

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": prompt.system,
            "messages": [{ "role": "user", "content": prompt.user }],
        });

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(Provider::Anthropic, response).await?;
        parse_anthropic_response(&json)
    }

    async fn call_openai(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .openai_api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey("OPENAI_API_KEY"))?;

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        });

        let response = self
            .client
            .post(OPENAI_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(Provider::OpenAi, response).await?;
        parse_openai_response(&json)
    }
}

#[async_trait]
impl SuggestionGenerator for LlmGenerator {
    async fn generate(
        &self,
        current_input: &str,
        context: &str,
        app_name: &str,
    ) -> Result<Vec<Suggestion>, GenerationError> {
        if current_input.trim().is_empty() {
            return Ok(Vec::new());
        }
        let provider = Provider::parse(&self.config.provider)?;
        let prompt = build_prompt(current_input, context, app_name, self.num_suggestions);

        let raw = match provider {
            Provider::Anthropic => self.call_anthropic(&prompt).await?,
            Provider::OpenAi => self.call_openai(&prompt).await?,
        };
        Ok(parse_suggestions(&raw))
    }
}

async fn read_json(
    provider: Provider,
    response: reqwest::Response,
) -> Result<serde_json::Value, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Api {
            provider: provider.label(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

fn parse_anthropic_response(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|block| block.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            GenerationError::MalformedResponse("Anthropic response missing content[0].text".into())
        })
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String, GenerationError> {
    let message = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| {
            GenerationError::MalformedResponse("OpenAI response missing choices[0].message".into())
        })?;
    // A null content is an empty completion, not a malformed reply
    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}
