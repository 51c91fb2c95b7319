use std::time::SystemTime;

/// Stable identifier for a catalogued recording.
pub type RecordingId = i64;

/// Display metadata supplied on ingest (spec §3, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecordingMeta {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration_s: Option<f64>,
    pub content_digest: String,
}

/// An immutable catalogue entry as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingMetadata {
    pub id: RecordingId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration_s: Option<f64>,
    pub content_digest: String,
    pub created_at: Option<SystemTime>,
}

/// A `(hash, anchor_time)` pair emitted by the hasher, still missing the
/// `recording_id` it will be stored under (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintTuple {
    pub hash: u64,
    pub anchor_time: u32,
}

/// Aggregate catalogue statistics (spec §4.4). Always recomputed from the
/// backing store — see the stats-cache bug note in DESIGN.md for why this
/// type carries no caching of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub recording_count: u64,
    pub tuple_count: u64,
}

/// The result of `put_recording`: either a freshly created recording or the
/// id of a pre-existing one with the same content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created(RecordingId),
    Duplicate(RecordingId),
}

impl PutOutcome {
    pub fn id(self) -> RecordingId {
        match self {
            PutOutcome::Created(id) | PutOutcome::Duplicate(id) => id,
        }
    }
}

/// The result of an ingest: the store outcome plus how many fingerprint
/// tuples were extracted from the clip (spec §6), regardless of whether the
/// recording turned out to be a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub outcome: PutOutcome,
    pub tuple_count: usize,
}

/// The outcome of an identify call (spec §4.5, §6).
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifyOutcome {
    Match {
        recording: RecordingMetadata,
        score: u32,
        alignment_offset: i32,
        confidence_pct: f64,
    },
    NoMatch,
}
