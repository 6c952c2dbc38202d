use crate::llm::GroundingMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cited web page as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Deduplicates grounding chunks by URL, keeping first-seen order.
///
/// A chunk's snippet joins the text of every support that cites the chunk's
/// own index. Later chunks repeating a URL are ignored entirely, so their
/// supports never reach the output. Chunks without a URL or title are skipped.
pub fn collect_sources(grounding: Option<&GroundingMetadata>) -> Vec<SourceRecord> {
    let Some(grounding) = grounding else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for (index, chunk) in grounding.chunks.iter().enumerate() {
        let (Some(url), Some(title)) = (non_empty(&chunk.uri), non_empty(&chunk.title)) else {
            continue;
        };
        if !seen.insert(url) {
            continue;
        }

        let snippet = grounding
            .supports
            .iter()
            .filter(|support| support.chunk_indices.contains(&index))
            .map(|support| support.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        sources.push(SourceRecord {
            title: title.to_string(),
            url: url.to_string(),
            snippet,
        });
    }

    sources
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
