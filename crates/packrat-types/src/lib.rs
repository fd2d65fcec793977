pub mod error;
pub mod event;
pub mod session;
pub mod signature;
pub mod source;

pub use error::{Error, Result};
pub use event::{AgentEvent, EventPayload};
pub use session::{repo_name_from_cwd, sort_most_recent_first, EventCount, Session};
pub use signature::FileSignature;
pub use source::SessionSource;
