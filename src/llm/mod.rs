pub mod gemini;
pub mod types;

pub use gemini::GeminiBackend;
pub use types::{GroundingChunk, GroundingMetadata, GroundingSupport, ModelReply, Role, Tool, Turn};

use crate::error::UpstreamError;
use async_trait::async_trait;

/// A hosted chat model. Implementations are stateless; the full history is
/// supplied on every call.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    async fn generate(&self, history: &[Turn], tools: &[Tool]) -> Result<ModelReply, UpstreamError>;
}

/// An ongoing exchange with the model: the enabled tools plus every turn sent
/// and received so far.
#[derive(Debug, Clone)]
pub struct Conversation {
    tools: Vec<Tool>,
    history: Vec<Turn>,
}

impl Conversation {
    pub fn start(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            history: Vec::new(),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Sends `text` as the next user turn. History only grows when the model
    /// answers successfully.
    pub async fn send_turn(
        &mut self,
        backend: &dyn ChatBackend,
        text: &str,
    ) -> Result<ModelReply, UpstreamError> {
        let mut request = self.history.clone();
        request.push(Turn::user(text));

        let reply = backend.generate(&request, &self.tools).await?;

        request.push(Turn::model(reply.text.clone()));
        self.history = request;
        Ok(reply)
    }
}
