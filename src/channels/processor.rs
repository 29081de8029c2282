//! Channel processor capability interface.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::dispatch::{DispatchOptions, TrackRecord};

/// Why a channel's processing failed. Fatal only to that channel: the
/// dispatcher logs it and continues with the next channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("shared audio path missing: {}", .0.display())]
    AudioMissing(PathBuf),

    #[error("no usable stems found under {}", .0.display())]
    NoUsableStems(PathBuf),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything a channel processor needs for one track: the shared argument
/// bundle assembled by the dispatcher.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    pub track_id: String,
    pub session_id: String,
    pub track: TrackRecord,
    /// Validated stem output directory.
    pub stem_dir: PathBuf,
    /// Source audio the stems were separated from.
    pub audio_path: PathBuf,
    /// Cache key for this track's media.
    pub uid: String,
    pub options: DispatchOptions,
}

/// A publishing destination's content processor.
///
/// The dispatcher knows nothing about what happens inside beyond this one
/// entry point and its error.
#[async_trait]
pub trait ChannelProcessor: Send + Sync {
    fn key(&self) -> &str;

    async fn process(&self, ctx: &ChannelContext) -> Result<(), ChannelError>;
}
