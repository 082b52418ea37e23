pub mod fragment;
pub mod sse;
pub mod lines;
pub mod prompt;
pub mod api;
pub mod state;

pub use fragment::{Fragment, RelayPayload};
pub use sse::{encode_event, DecodedLine, SseDecoder, DATA_MARKER};
pub use lines::{LineBuffer, LineOverflow, MAX_LINE_BYTES};
pub use prompt::{PostType, Prompt, PromptError};
pub use api::{FailureResponse, GenerateRequest, GenerateResponse, PROCESSING_FAILURE};
pub use state::{GenerationState, TransitionError};
