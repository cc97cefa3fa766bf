pub mod session;
pub mod store;

pub use session::ChatSession;
pub use store::{sanitize_session_name, FileTranscriptStore, TranscriptStore};
