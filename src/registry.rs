use crate::error::{SearchError, SearchResult};
use crate::llm::{ChatBackend, Conversation, ModelReply, Tool};
use crate::session::{SessionId, SessionStore};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Opens model conversations and routes follow-up turns to them.
#[derive(Clone)]
pub struct ConversationRegistry {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn SessionStore>,
    tools: Vec<Tool>,
}

impl ConversationRegistry {
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            backend,
            store,
            tools: vec![Tool::GoogleSearch],
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Starts a web-search conversation with `query` as its first turn and
    /// registers it under a new session id. Nothing is stored if the model
    /// call fails.
    pub async fn open(&self, query: &str) -> SearchResult<(SessionId, ModelReply)> {
        require("query", query)?;

        let mut conversation = Conversation::start(self.tools.clone());
        let reply = conversation.send_turn(self.backend.as_ref(), query).await?;

        let session_id = SessionId::generate();
        self.store
            .insert(session_id.clone(), Arc::new(Mutex::new(conversation)));
        log::info!(
            "Opened session {} ({} active)",
            session_id,
            self.store.len()
        );

        Ok((session_id, reply))
    }

    /// Sends `query` as the next turn of an existing session.
    pub async fn continue_session(
        &self,
        session_id: &SessionId,
        query: &str,
    ) -> SearchResult<ModelReply> {
        require("sessionId", session_id.as_str())?;
        require("query", query)?;

        let conversation = self
            .store
            .get(session_id)
            .ok_or_else(|| SearchError::NotFound("Chat session not found".to_string()))?;

        let mut conversation = conversation.lock().await;
        let reply = conversation
            .send_turn(self.backend.as_ref(), query)
            .await?;
        log::debug!(
            "Session {} now holds {} turns",
            session_id,
            conversation.history().len()
        );
        Ok(reply)
    }
}

fn require(field: &str, value: &str) -> SearchResult<()> {
    if value.trim().is_empty() {
        return Err(SearchError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}
