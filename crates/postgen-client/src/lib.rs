pub mod error;
pub mod reader;
pub mod session;

pub use error::ClientError;
pub use reader::{FragmentStream, RelayClient};
pub use session::{GenerationSession, ERROR_PREFIX};
