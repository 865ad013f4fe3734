//! Real `TaggerClient` implementation backed by an OpenAI-compatible chat
//! completion call. Only compiled with the `tagger-llm` feature.
//!
//! A CLI invocation is synchronous; this bridges to the async
//! `async-openai` client with a short-lived single-threaded runtime, the
//! same shape the teacher would reach for to make one blocking call out of
//! an otherwise-sync binary.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;

use super::{TaggerClient, TaggerError};

const SYSTEM_PROMPT: &str =
    "Return 5 to 10 short, lowercase, hyphenated topical tags for the given conversation transcript. \
     Respond with one tag per line, nothing else.";

/// Tagger backed by a chat completion call.
pub struct OpenAiTagger {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTagger {
    /// Builds a tagger using the default `OPENAI_API_KEY`-based config.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
        }
    }

    fn tag_async(&self, transcript: &str) -> Result<Vec<String>, TaggerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TaggerError(e.to_string()))?;

        runtime.block_on(async {
            let request = CreateChatCompletionRequestArgs::default()
                .model(&self.model)
                .messages(vec![
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(SYSTEM_PROMPT)
                        .build()
                        .map_err(|e| TaggerError(e.to_string()))?
                        .into(),
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(transcript)
                        .build()
                        .map_err(|e| TaggerError(e.to_string()))?
                        .into(),
                ])
                .build()
                .map_err(|e| TaggerError(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| TaggerError(e.to_string()))?;

            let text = response
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .ok_or_else(|| TaggerError("empty response".to_string()))?;

            Ok(text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| l.trim_start_matches(['-', '*', ' ']).to_lowercase())
                .collect())
        })
    }
}

impl TaggerClient for OpenAiTagger {
    fn tag(&self, transcript: &str) -> Result<Vec<String>, TaggerError> {
        self.tag_async(transcript)
    }
}
