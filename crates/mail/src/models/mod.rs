//! Domain models: message summaries and sessions

mod message;
mod session;

pub use message::{EmailAddress, MessageId, MessageSummary, UNKNOWN_SENDER};
pub use session::{REFRESH_BUFFER_SECS, Session, SessionId, SessionState, TokenSet};
