//! services/api/src/adapters/matcher_llm.rs
//!
//! This module contains the adapter for the multimodal model that identifies a recitation.
//! It implements the `RecitationMatcher` port from the `core` crate by calling an
//! OpenAI-compatible chat-completions endpoint (Gemini's, by default) with the audio inline.

const MATCHER_INSTRUCTIONS: &str = r#"You are helping a hafiz student check a Quran recitation.

Listen to the attached audio and identify which surah and verse is being recited.

Respond with ONLY a JSON array, no prose and no Markdown. Each element must be:
{"surah_no": <1-114>, "verse_no": <verse number>, "surah_name": "<surah name>", "arabic": "<the recited Arabic text>", "translation": "<Turkish meal of the verse>"}

Rules:
- If the recited words occur verbatim in more than one place in the Quran (mutashabih verses), return ONE element for EVERY place they occur, not just the most likely one.
- If you are not confident, or the audio is not Quran recitation, return [] exactly.
- Never guess a verse you did not hear."#;

const USER_INPUT: &str = "Identify the recitation in this audio.";

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartAudio, ChatCompletionRequestMessageContentPartText,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, InputAudio, InputAudioFormat,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use hafiz_core::{
    domain::AudioClip,
    ports::{PortError, PortResult, RecitationMatcher},
};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `RecitationMatcher` using an OpenAI-compatible multimodal model.
#[derive(Clone)]
pub struct GeminiMatcherAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GeminiMatcherAdapter {
    /// Creates a new `GeminiMatcherAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Maps a declared MIME type onto the audio formats the chat endpoint accepts.
    fn audio_format(mime_type: &str) -> PortResult<InputAudioFormat> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Ok(InputAudioFormat::Wav),
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" | "audio/x-mpeg-3" => Ok(InputAudioFormat::Mp3),
            other => Err(PortError::UnsupportedMedia(other.to_string())),
        }
    }
}

//=========================================================================================
// `RecitationMatcher` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecitationMatcher for GeminiMatcherAdapter {
    /// Sends the recording inline and returns the model's text reply untouched.
    async fn match_recitation(&self, audio: &AudioClip) -> PortResult<String> {
        let format = Self::audio_format(&audio.mime_type)?;
        let encoded = general_purpose::STANDARD.encode(&audio.bytes);

        let user_content = ChatCompletionRequestUserMessageContent::Array(vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: USER_INPUT.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::InputAudio(
                ChatCompletionRequestMessageContentPartAudio {
                    input_audio: InputAudio {
                        data: encoded,
                        format,
                    },
                },
            ),
        ]);

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(MATCHER_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_content)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Matcher response contained no text content.".to_string())
            })?;

        debug!("Matcher replied with {} characters", text.len());
        Ok(text)
    }
}
