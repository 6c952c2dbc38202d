use crate::llm::Conversation;
use dashmap::DashMap;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::Mutex;

const SESSION_ID_LEN: usize = 10;

/// A conversation handle shared between the store and in-flight requests.
pub type SharedConversation = Arc<Mutex<Conversation>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Short random token. Collisions are not checked.
    pub fn generate() -> Self {
        let token = Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LEN);
        Self(token.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps session identifiers to live conversations.
pub trait SessionStore: Send + Sync + 'static {
    fn insert(&self, id: SessionId, conversation: SharedConversation);

    fn get(&self, id: &SessionId) -> Option<SharedConversation>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime in-memory store. Entries are never evicted.
#[derive(Default, Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<SessionId, SharedConversation>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn insert(&self, id: SessionId, conversation: SharedConversation) {
        self.inner.insert(id, conversation);
    }

    fn get(&self, id: &SessionId) -> Option<SharedConversation> {
        self.inner.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
