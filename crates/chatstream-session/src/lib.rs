//! Incremental accumulation and reconciliation of one streamed chat answer.
//!
//! [`StreamSession`] is the synchronous state machine; [`drive`] feeds it
//! from an [`EventStream`](chatstream_client::EventStream) on the drain,
//! completion and settle clocks configured in [`SessionConfig`].

pub mod config;
pub mod driver;
pub mod error;
pub mod normalize;
pub mod session;
pub mod timeline;
pub mod transcript;

pub use config::SessionConfig;
pub use driver::{drive, spawn_drive};
pub use error::{Result, SessionError};
pub use normalize::normalize_chunk;
pub use session::{Outcome, SessionPhase, SessionUpdate, StreamSession, TRANSPORT_FAILURE_MESSAGE};
pub use timeline::TimelineLog;
pub use transcript::Transcript;
