pub mod types;
pub mod traits;
pub mod streaming;
pub mod groq;
pub mod mock;

pub use traits::{ChatClient, ChatRequest, ChatResponse, DeltaStream};

pub use streaming::{Delta, ChatStreamChunk, parse_chat_sse_stream};
pub use groq::{GroqClient, GroqConfig, DEFAULT_MODEL};
pub use mock::{ScriptedClient, Step};
pub use types::Message;
