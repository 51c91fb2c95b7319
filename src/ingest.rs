//! Ingest orchestrator: decode → extract → store (spec §4.6, §6).

use crate::decode::Decoder;
use crate::digest::digest_bytes;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::models::{IngestOutcome, NewRecordingMeta, PutOutcome};
use crate::store::FingerprintStore;
use tracing::{debug, info};

pub struct NewRecording {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub filename_hint: String,
    pub bytes: Vec<u8>,
}

/// Decodes and fingerprints `recording`'s raw bytes, then stores the result.
///
/// The content digest is computed on the raw, pre-decode bytes, so two
/// uploads of the same file are recognised as duplicates even before either
/// is decoded.
pub fn ingest_recording(
    decoder: &dyn Decoder,
    extractor: &Extractor,
    store: &dyn FingerprintStore,
    recording: NewRecording,
) -> Result<IngestOutcome> {
    debug!(filename_hint = %recording.filename_hint, byte_count = recording.bytes.len(), "ingest started");
    let content_digest = digest_bytes(&recording.bytes);

    let pcm = decoder.decode(
        &recording.bytes,
        &recording.filename_hint,
        extractor.config().sample_rate,
    )?;
    let tuples = extractor.extract(&pcm)?;
    let tuple_count = tuples.len();

    let meta = NewRecordingMeta {
        title: recording.title,
        artist: recording.artist,
        album: recording.album,
        duration_s: Some(pcm.len() as f64 / extractor.config().sample_rate as f64),
        content_digest,
    };

    let outcome = store.put_recording(meta, &tuples, extractor.config().epoch())?;
    match outcome {
        PutOutcome::Created(id) => info!(recording_id = id, tuple_count, "ingest created recording"),
        PutOutcome::Duplicate(id) => info!(recording_id = id, tuple_count, "ingest found duplicate content"),
    }
    Ok(IngestOutcome { outcome, tuple_count })
}
