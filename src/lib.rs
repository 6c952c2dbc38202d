pub mod config;
pub mod error;
pub mod format;
pub mod llm;
pub mod logging;
pub mod registry;
pub mod search;
pub mod server;
pub mod session;
pub mod sources;

pub use error::{ApiError, SearchError, SearchResult, UpstreamError};
pub use registry::ConversationRegistry;
pub use search::{FollowUpResponse, SearchResponse, SearchService};
pub use session::{MemorySessionStore, SessionId, SessionStore};
pub use sources::SourceRecord;
