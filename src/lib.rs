pub mod config;
pub mod decode;
pub mod digest;
pub mod error;
pub mod extractor;
pub mod hasher;
pub mod identify;
pub mod ingest;
pub mod matcher;
pub mod models;
pub mod peaks;
pub mod preprocess;
pub mod schema;
pub mod spectrogram;
pub mod store;

use crate::config::ServiceConfig;
use crate::decode::{Decoder, SymphoniaDecoder};
use crate::error::Result;
use crate::extractor::Extractor;
use crate::ingest::NewRecording;
use crate::models::{IdentifyOutcome, IngestOutcome, RecordingMetadata, StoreStats};
use crate::store::FingerprintStore;
use std::sync::Arc;

/// Everything the HTTP and CLI front doors need, built once at startup and
/// shared behind `Arc` rather than reached for through a global singleton.
pub struct AppContext {
    config: ServiceConfig,
    decoder: Box<dyn Decoder>,
    extractor: Extractor,
    store: Arc<dyn FingerprintStore>,
}

impl AppContext {
    pub fn new(config: ServiceConfig, store: Arc<dyn FingerprintStore>) -> Self {
        let extractor = Extractor::new(config.extractor);
        Self {
            config,
            decoder: Box::new(SymphoniaDecoder),
            extractor,
            store,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn ingest(&self, recording: NewRecording) -> Result<IngestOutcome> {
        crate::ingest::ingest_recording(
            self.decoder.as_ref(),
            &self.extractor,
            self.store.as_ref(),
            recording,
        )
    }

    pub fn identify(&self, bytes: &[u8], filename_hint: &str) -> Result<IdentifyOutcome> {
        crate::identify::identify_clip(
            self.decoder.as_ref(),
            &self.extractor,
            &self.config.matcher,
            self.store.as_ref(),
            bytes,
            filename_hint,
        )
    }

    pub fn get_recording(&self, id: i64) -> Result<RecordingMetadata> {
        self.store.get_recording(id)
    }

    pub fn list_recordings(&self) -> Result<Vec<RecordingMetadata>> {
        self.store.list_recordings()
    }

    pub fn delete_recording(&self, id: i64) -> Result<()> {
        self.store.delete_recording(id)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }
}
