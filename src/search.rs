use crate::error::SearchResult;
use crate::format::format_answer;
use crate::llm::ModelReply;
use crate::registry::ConversationRegistry;
use crate::session::SessionId;
use crate::sources::{SourceRecord, collect_sources};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub session_id: SessionId,
    pub summary: String,
    pub sources: Vec<SourceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpResponse {
    pub summary: String,
    pub sources: Vec<SourceRecord>,
}

/// Rendered answer for one model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAnswer {
    pub summary: String,
    pub sources: Vec<SourceRecord>,
}

impl RenderedAnswer {
    pub fn from_reply(reply: &ModelReply) -> Self {
        Self {
            summary: format_answer(&reply.text),
            sources: collect_sources(reply.grounding.as_ref()),
        }
    }
}

#[derive(Clone)]
pub struct SearchService {
    registry: ConversationRegistry,
}

impl SearchService {
    pub fn new(registry: ConversationRegistry) -> Self {
        Self { registry }
    }

    pub async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
        let (session_id, reply) = self.registry.open(query).await?;
        let answer = RenderedAnswer::from_reply(&reply);
        Ok(SearchResponse {
            session_id,
            summary: answer.summary,
            sources: answer.sources,
        })
    }

    pub async fn follow_up(
        &self,
        session_id: &SessionId,
        query: &str,
    ) -> SearchResult<FollowUpResponse> {
        let reply = self.registry.continue_session(session_id, query).await?;
        let answer = RenderedAnswer::from_reply(&reply);
        Ok(FollowUpResponse {
            summary: answer.summary,
            sources: answer.sources,
        })
    }
}
