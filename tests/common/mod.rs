#![allow(dead_code)]

use async_trait::async_trait;
use grounded_search::UpstreamError;
use grounded_search::llm::{
    ChatBackend, GroundingChunk, GroundingMetadata, GroundingSupport, ModelReply, Tool, Turn,
};
use std::sync::Mutex;

type Responder = dyn Fn(&[Turn]) -> Result<ModelReply, UpstreamError> + Send + Sync;

/// In-process stand-in for the model API that records every history it is
/// sent and answers with a caller-supplied function.
pub struct MockBackend {
    respond: Box<Responder>,
    calls: Mutex<Vec<Vec<Turn>>>,
}

impl MockBackend {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&[Turn]) -> Result<ModelReply, UpstreamError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every turn with a labelled summary and two chunks citing the
    /// same URL.
    pub fn grounded() -> Self {
        Self::new(|history| {
            let question = &history.last().expect("history is never empty").text;
            Ok(ModelReply {
                text: format!("Summary: answer to {question}\r\n\r\n• first point\r\n• second point"),
                grounding: Some(GroundingMetadata {
                    chunks: vec![
                        GroundingChunk::web("https://a.example", "A"),
                        GroundingChunk::web("https://b.example", "B"),
                        GroundingChunk::web("https://a.example", "A again"),
                    ],
                    supports: vec![
                        GroundingSupport {
                            chunk_indices: vec![0],
                            text: "cited by a".to_string(),
                        },
                        GroundingSupport {
                            chunk_indices: vec![2],
                            text: "cited by a again".to_string(),
                        },
                    ],
                }),
            })
        })
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| {
            Err(UpstreamError::Request {
                message: message.clone(),
            })
        })
    }

    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn generate(
        &self,
        history: &[Turn],
        tools: &[Tool],
    ) -> Result<ModelReply, UpstreamError> {
        assert_eq!(tools, &[Tool::GoogleSearch]);
        self.calls.lock().unwrap().push(history.to_vec());
        (self.respond)(history)
    }
}
