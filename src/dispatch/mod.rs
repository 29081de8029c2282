//! Track dispatching: per-track orchestration, batch scheduling, and the
//! failure log.

mod dispatcher;
mod fail_log;
mod models;
mod scheduler;

pub use dispatcher::TrackDispatcher;
pub use fail_log::{FailureEntry, FailureLog};
pub use models::{
    DispatchError, DispatchOptions, DispatchSummary, FailureReason, TrackOverrides, TrackRecord,
    UploadOptions,
};
pub use scheduler::{BatchRequest, BatchScheduler};
