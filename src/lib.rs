//! Stemcast Server Library
//!
//! Turns music tracks into branded stem videos published across multiple
//! channels. This library exposes the internal modules for testing and
//! potential reuse; the binary in `main.rs` wires them into a running
//! server.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod media;
pub mod progress;
pub mod providers;
pub mod publish;
pub mod server;
pub mod stems;

// Re-export commonly used types for convenience
pub use dispatch::{BatchRequest, BatchScheduler, FailureLog, TrackDispatcher};
pub use progress::{ProgressRecord, ProgressStore};
pub use server::{run_server, ServerState};
pub use stems::{SeparationEngine, StemValidator};
