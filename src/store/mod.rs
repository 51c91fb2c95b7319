//! Storage collaborator boundary (spec §4.4): everything the core needs from
//! a durable fingerprint catalogue, independent of the backing engine.

pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::models::{FingerprintTuple, NewRecordingMeta, PutOutcome, RecordingMetadata, StoreStats};

/// A catalogue of recordings and their fingerprint tuples.
///
/// Implementations must treat `put_recording` as transactional: either every
/// tuple lands alongside the recording row, or none do.
pub trait FingerprintStore: Send + Sync {
    /// Inserts a recording and its fingerprint tuples, or returns the id of
    /// an existing recording with the same `content_digest` (spec §4.6).
    fn put_recording(
        &self,
        meta: NewRecordingMeta,
        tuples: &[FingerprintTuple],
        config_epoch: u64,
    ) -> Result<PutOutcome>;

    /// Removes a recording and its fingerprints. Errors with
    /// [`crate::error::EchoidError::NotFound`] if it doesn't exist.
    fn delete_recording(&self, id: i64) -> Result<()>;

    /// Looks up every stored `(recording_id, anchor_time)` pair for each
    /// requested hash, grouped by hash.
    fn lookup(&self, hashes: &[u64]) -> Result<std::collections::HashMap<u64, Vec<(i64, u32)>>>;

    fn get_recording(&self, id: i64) -> Result<RecordingMetadata>;

    fn list_recordings(&self) -> Result<Vec<RecordingMetadata>>;

    fn stats(&self) -> Result<StoreStats>;

    /// Config epoch recorded at the catalogue's first ingest, or `None` if
    /// the catalogue is empty (spec §4.4, §9: epoch drift check).
    fn config_epoch(&self) -> Result<Option<u64>>;
}
