//! Publishing channels: specs, the processor capability interface, and the
//! registry mapping channel keys to constructed processor instances.

pub mod naming;
mod processor;
mod spec;
mod stem_processor;

pub use naming::{folder_title, sanitize_name, stem_title, track_folder};
pub use processor::{ChannelContext, ChannelError, ChannelProcessor};
pub use spec::{default_channels, ChannelSpec, StemKind};
pub use stem_processor::{MediaDirs, StemChannelProcessor};

use std::collections::HashMap;
use std::sync::Arc;

use crate::media::{StemTagger, ThumbnailFetcher, VideoRenderer};
use crate::progress::ProgressStore;
use crate::publish::PublishPipeline;

/// Channel-key to processor-instance registry, populated once at startup.
///
/// Dispatch requests reference channels by key; an unknown key is a request
/// error handled by the dispatcher, never a dynamic lookup failure.
pub struct ChannelRegistry {
    processors: HashMap<String, Arc<dyn ChannelProcessor>>,
}

impl ChannelRegistry {
    /// Build one processor per configured channel spec.
    pub fn from_specs(
        specs: Vec<ChannelSpec>,
        dirs: MediaDirs,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        tagger: Arc<dyn StemTagger>,
        renderer: Arc<dyn VideoRenderer>,
        publish: Arc<PublishPipeline>,
        progress: Arc<ProgressStore>,
    ) -> Self {
        let mut processors: HashMap<String, Arc<dyn ChannelProcessor>> = HashMap::new();
        for spec in specs {
            let key = spec.key.clone();
            let processor = StemChannelProcessor::new(
                spec,
                dirs.clone(),
                thumbnails.clone(),
                tagger.clone(),
                renderer.clone(),
                publish.clone(),
                progress.clone(),
            );
            processors.insert(key, Arc::new(processor));
        }
        Self { processors }
    }

    /// Registry over arbitrary processors, for tests and custom channels.
    pub fn from_processors(processors: Vec<Arc<dyn ChannelProcessor>>) -> Self {
        Self {
            processors: processors
                .into_iter()
                .map(|p| (p.key().to_string(), p))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ChannelProcessor>> {
        self.processors.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.processors.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.processors.keys().cloned().collect();
        keys.sort();
        keys
    }
}
