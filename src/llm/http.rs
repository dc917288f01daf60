use super::{GenerationRequest, TextGenerator};
use crate::config::LlmConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// Wire format spoken by the generation server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `POST /api/generate`
    Ollama,
    /// `POST /v1/chat/completions`
    OpenAi,
}

impl Backend {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Backend::Ollama),
            "openai" => Ok(Backend::OpenAi),
            other => bail!("Unknown generation backend '{}'", other),
        }
    }
}

/// Text generator backed by an HTTP completion API
pub struct HttpGenerator {
    client: reqwest::Client,
    backend: Backend,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    /// Build a generator from configuration
    ///
    /// For the OpenAI format the API key is read from the environment variable
    /// named by `api_key_env`; a missing key is only an error once the server
    /// rejects the request.
    pub fn connect(config: &LlmConfig) -> Result<Self> {
        let backend = Backend::from_name(&config.backend)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let api_key = match backend {
            Backend::OpenAi => std::env::var(&config.api_key_env).ok(),
            Backend::Ollama => None,
        };

        let endpoint = endpoint_for(backend, &config.base_url);
        tracing::info!(
            "Connected generation backend {:?} at {} (model: {})",
            backend,
            endpoint,
            config.model_id
        );

        Ok(Self {
            client,
            backend,
            endpoint,
            model: config.model_id.clone(),
            api_key,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_for(backend: Backend, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match backend {
        Backend::Ollama => format!("{}/api/generate", base),
        Backend::OpenAi if base.ends_with("/v1") => format!("{}/chat/completions", base),
        Backend::OpenAi => format!("{}/v1/chat/completions", base),
    }
}

fn request_body(backend: Backend, model: &str, request: &GenerationRequest) -> Value {
    match backend {
        Backend::Ollama => {
            let mut options = json!({ "num_predict": request.max_output_tokens });
            if request.deterministic {
                options["temperature"] = json!(0);
            }
            json!({
                "model": model,
                "prompt": request.prompt,
                "stream": false,
                "options": options,
            })
        }
        Backend::OpenAi => {
            let mut body = json!({
                "model": model,
                "messages": [{ "role": "user", "content": request.prompt }],
                "max_tokens": request.max_output_tokens,
            });
            if request.deterministic {
                body["temperature"] = json!(0);
            }
            body
        }
    }
}

fn parse_response(backend: Backend, json: &Value) -> Result<String> {
    let text = match backend {
        Backend::Ollama => json.get("response").and_then(|r| r.as_str()),
        Backend::OpenAi => json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str()),
    };
    text.map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid {:?} response: missing generated text", backend))
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = request_body(self.backend, &self.model, request);

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            "Requesting completion ({} prompt chars, max {} tokens, deterministic: {})",
            request.prompt.len(),
            request.max_output_tokens,
            request.deterministic
        );

        let response = builder
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Generation API error {}: {}", status, body_text);
        }

        let json: Value = response
            .json()
            .await
            .context("Failed to decode generation response")?;
        parse_response(self.backend, &json)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
