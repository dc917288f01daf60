//! Chunked structure synthesis
//!
//! A model's output limit may cut the structure markup short, so synthesis
//! keeps asking for more until the closing marker appears or the iteration
//! budget runs out. Each follow-up request quotes the tail of what has been
//! written so far.

use crate::config::GenerationConfig;
use crate::error::WikiError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::prompts;
use tokio_util::sync::CancellationToken;

const CLOSING_MARKER: &str = "</wiki_structure>";

/// Limits for one synthesis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub max_output_tokens: usize,
    pub max_iterations: usize,
    /// Trailing characters of the buffer quoted in a continuation prompt
    pub continuation_window: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 4096,
            max_iterations: 5,
            continuation_window: 500,
        }
    }
}

impl From<&GenerationConfig> for SynthesisConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_output_tokens: config.structure_max_tokens,
            max_iterations: config.structure_max_iterations,
            continuation_window: config.continuation_window,
        }
    }
}

/// How a synthesis run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The buffer contains the closing marker
    ClosingMarker,
    /// The iteration budget ran out first
    MaxIterations,
}

/// Result of a synthesis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutput {
    /// Everything the model wrote, trimmed
    pub markup: String,
    pub termination: Termination,
    /// Number of model calls made
    pub iterations: usize,
}

enum State {
    Requesting(String),
    Accumulating(String),
    CheckTermination,
    Continuing,
    Done,
    MaxReached,
}

/// Drives a [`TextGenerator`] until it has produced a complete structure
pub struct StructureSynthesizer<'a> {
    generator: &'a dyn TextGenerator,
    config: SynthesisConfig,
}

impl<'a> StructureSynthesizer<'a> {
    pub fn new(generator: &'a dyn TextGenerator, config: SynthesisConfig) -> Self {
        Self { generator, config }
    }

    /// Run the loop starting from `prompt`
    pub async fn synthesize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<SynthesisOutput, WikiError> {
        let max_iterations = self.config.max_iterations.max(1);
        let mut buffer = String::new();
        let mut iterations = 0usize;
        let mut state = State::Requesting(prompt.to_string());

        loop {
            state = match state {
                State::Requesting(prompt) => {
                    iterations += 1;
                    tracing::debug!(
                        "Structure request {}/{} ({} chars of prompt)",
                        iterations,
                        max_iterations,
                        prompt.len()
                    );
                    let reply = self.request(&prompt, cancel).await?;
                    State::Accumulating(reply)
                }
                State::Accumulating(reply) => {
                    buffer.push_str(&reply);
                    State::CheckTermination
                }
                State::CheckTermination => {
                    if contains_closing_marker(&buffer) {
                        State::Done
                    } else if iterations >= max_iterations {
                        State::MaxReached
                    } else {
                        State::Continuing
                    }
                }
                State::Continuing => {
                    let tail = continuation_tail(&buffer, self.config.continuation_window);
                    State::Requesting(prompts::continuation_prompt(&tail))
                }
                State::Done => {
                    tracing::info!("Structure complete after {} request(s)", iterations);
                    return Ok(finish(buffer, Termination::ClosingMarker, iterations));
                }
                State::MaxReached => {
                    tracing::warn!(
                        "Structure still open after {} request(s); using partial output",
                        iterations
                    );
                    return Ok(finish(buffer, Termination::MaxIterations, iterations));
                }
            };
        }
    }

    async fn request(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, WikiError> {
        let request = GenerationRequest::deterministic(prompt, self.config.max_output_tokens);
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("Structure synthesis cancelled");
                return Err(WikiError::EmptyModelResponse);
            }
            reply = self.generator.generate(&request) => reply,
        };

        match reply {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                tracing::warn!("Model returned an empty structure response");
                Err(WikiError::EmptyModelResponse)
            }
            Err(e) => {
                tracing::warn!("Structure request failed: {:#}", e);
                Err(WikiError::EmptyModelResponse)
            }
        }
    }
}

fn finish(buffer: String, termination: Termination, iterations: usize) -> SynthesisOutput {
    SynthesisOutput {
        markup: buffer.trim().to_string(),
        termination,
        iterations,
    }
}

fn contains_closing_marker(buffer: &str) -> bool {
    buffer
        .as_bytes()
        .windows(CLOSING_MARKER.len())
        .any(|w| w.eq_ignore_ascii_case(CLOSING_MARKER.as_bytes()))
}

/// Last `window` characters of `buffer` with line breaks collapsed to spaces
pub fn continuation_tail(buffer: &str, window: usize) -> String {
    let char_count = buffer.chars().count();
    buffer
        .chars()
        .skip(char_count.saturating_sub(window))
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
