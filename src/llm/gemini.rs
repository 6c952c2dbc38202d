//! Gemini `generateContent` backend with the `google_search` grounding tool.
//!
//! Gemini's REST API is stateless, so every call carries the whole
//! conversation. Grounding metadata is read from the first candidate only.

use super::types::{
    GroundingChunk, GroundingMetadata, GroundingSupport, ModelReply, Role, Tool, Turn,
};
use super::ChatBackend;
use crate::config::{GenerationConfig, LlmConfig};
use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiBackend {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            generation: config.generation.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, history: &[Turn], tools: &[Tool]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: history
                .iter()
                .map(|turn| Content {
                    role: turn.role,
                    parts: vec![Part {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            tools: tools
                .iter()
                .map(|tool| match tool {
                    Tool::GoogleSearch => ToolSpec {
                        google_search: GoogleSearchConfig {},
                    },
                })
                .collect(),
            generation_config: GenerationParams {
                temperature: self.generation.temperature,
                top_p: self.generation.top_p,
                top_k: self.generation.top_k,
                max_output_tokens: self.generation.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn generate(
        &self,
        history: &[Turn],
        tools: &[Tool],
    ) -> Result<ModelReply, UpstreamError> {
        let request = self.build_request(history, tools);
        log::debug!(
            "Sending {} turn(s) to {} with {} tool(s)",
            request.contents.len(),
            self.model,
            request.tools.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| UpstreamError::Request {
                message: format!("Gemini API request failed: {err}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|err| UpstreamError::Decode {
                message: err.to_string(),
            })?;
        let reply = parsed.into_reply()?;
        log::debug!(
            "Received {} byte answer with {} grounding chunk(s)",
            reply.text.len(),
            reply.grounding.as_ref().map_or(0, |g| g.chunks.len())
        );
        Ok(reply)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<ToolSpec>,
    generation_config: GenerationParams,
}

#[derive(Serialize)]
struct Content {
    role: Role,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct ToolSpec {
    google_search: GoogleSearchConfig,
}

#[derive(Serialize)]
struct GoogleSearchConfig {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireChunk>,
    #[serde(default)]
    grounding_supports: Vec<WireSupport>,
}

#[derive(Deserialize)]
struct WireChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSupport {
    segment: Option<Segment>,
    #[serde(default)]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Deserialize)]
struct Segment {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_reply(self) -> Result<ModelReply, UpstreamError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match block_reason {
                Some(reason) => UpstreamError::Blocked { reason },
                None => UpstreamError::Empty,
            });
        };

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = candidate
                .finish_reason
                .filter(|reason| reason != "STOP" && reason != "MAX_TOKENS")
            {
                return Err(UpstreamError::Blocked { reason });
            }
        }

        let grounding = candidate.grounding_metadata.map(|metadata| GroundingMetadata {
            chunks: metadata
                .grounding_chunks
                .into_iter()
                .map(|chunk| match chunk.web {
                    Some(web) => GroundingChunk {
                        uri: web.uri,
                        title: web.title,
                    },
                    None => GroundingChunk::default(),
                })
                .collect(),
            supports: metadata
                .grounding_supports
                .into_iter()
                .map(|support| GroundingSupport {
                    chunk_indices: support.grounding_chunk_indices,
                    text: support.segment.and_then(|s| s.text).unwrap_or_default(),
                })
                .collect(),
        });

        Ok(ModelReply { text, grounding })
    }
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> UpstreamError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    UpstreamError::Status {
        status: status.as_u16(),
        message,
    }
}
