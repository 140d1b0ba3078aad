// Use cases layer: matchmaking, session lifecycle and registry workflows.

pub mod engine;
pub mod game;
pub mod matchmaker;
pub mod registry;
pub mod session;
pub mod types;

pub use engine::{JoinOutcome, SessionEngine};
pub use registry::{RegistrySettings, SessionHandle, SessionRegistry};
pub use types::{EndReason, SessionEvent, SessionStatus, SessionUpdate};
