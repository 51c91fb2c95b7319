//! In-process [`FingerprintStore`] test double, used by unit/integration
//! tests and the CLI's offline mode. Mirrors the Postgres store's semantics
//! (digest dedup, not-found errors) without a database dependency.

use super::FingerprintStore;
use crate::error::{EchoidError, Result};
use crate::models::{FingerprintTuple, NewRecordingMeta, PutOutcome, RecordingMetadata, StoreStats};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

struct Recording {
    meta: RecordingMetadata,
    config_epoch: u64,
    tuples: Vec<FingerprintTuple>,
}

#[derive(Default)]
struct Inner {
    recordings: HashMap<i64, Recording>,
    next_id: i64,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                recordings: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl FingerprintStore for MemoryStore {
    fn put_recording(
        &self,
        meta: NewRecordingMeta,
        tuples: &[FingerprintTuple],
        config_epoch: u64,
    ) -> Result<PutOutcome> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .recordings
            .values()
            .find(|r| r.meta.content_digest == meta.content_digest)
        {
            return Ok(PutOutcome::Duplicate(existing.meta.id));
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let recording = Recording {
            meta: RecordingMetadata {
                id,
                title: meta.title,
                artist: meta.artist,
                album: meta.album,
                duration_s: meta.duration_s,
                content_digest: meta.content_digest,
                created_at: Some(SystemTime::now()),
            },
            config_epoch,
            tuples: tuples.to_vec(),
        };
        inner.recordings.insert(id, recording);

        Ok(PutOutcome::Created(id))
    }

    fn delete_recording(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .recordings
            .remove(&id)
            .map(|_| ())
            .ok_or(EchoidError::NotFound(id))
    }

    fn lookup(&self, hashes: &[u64]) -> Result<HashMap<u64, Vec<(i64, u32)>>> {
        let inner = self.inner.lock().unwrap();
        let wanted: std::collections::HashSet<u64> = hashes.iter().copied().collect();

        let mut map: HashMap<u64, Vec<(i64, u32)>> = HashMap::new();
        for recording in inner.recordings.values() {
            for tuple in &recording.tuples {
                if wanted.contains(&tuple.hash) {
                    map.entry(tuple.hash)
                        .or_default()
                        .push((recording.meta.id, tuple.anchor_time));
                }
            }
        }
        Ok(map)
    }

    fn get_recording(&self, id: i64) -> Result<RecordingMetadata> {
        let inner = self.inner.lock().unwrap();
        inner
            .recordings
            .get(&id)
            .map(|r| r.meta.clone())
            .ok_or(EchoidError::NotFound(id))
    }

    fn list_recordings(&self) -> Result<Vec<RecordingMetadata>> {
        let inner = self.inner.lock().unwrap();
        let mut metas: Vec<RecordingMetadata> = inner.recordings.values().map(|r| r.meta.clone()).collect();
        metas.sort_by_key(|m| m.id);
        Ok(metas)
    }

    fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.lock().unwrap();
        let recording_count = inner.recordings.len() as u64;
        let tuple_count = inner.recordings.values().map(|r| r.tuples.len() as u64).sum();
        Ok(StoreStats {
            recording_count,
            tuple_count,
        })
    }

    fn config_epoch(&self) -> Result<Option<u64>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .recordings
            .values()
            .min_by_key(|r| r.meta.id)
            .map(|r| r.config_epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(digest: &str) -> NewRecordingMeta {
        NewRecordingMeta {
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            album: None,
            duration_s: Some(180.0),
            content_digest: digest.to_string(),
        }
    }

    #[test]
    fn duplicate_digest_returns_existing_id() {
        let store = MemoryStore::default();
        let first = store.put_recording(meta("abc"), &[], 1).unwrap();
        let second = store.put_recording(meta("abc"), &[], 1).unwrap();
        assert_eq!(first.id(), second.id());
        assert!(matches!(second, PutOutcome::Duplicate(_)));
    }

    #[test]
    fn delete_missing_recording_errors() {
        let store = MemoryStore::default();
        assert!(matches!(store.delete_recording(99), Err(EchoidError::NotFound(99))));
    }

    #[test]
    fn lookup_returns_only_requested_hashes() {
        let store = MemoryStore::default();
        let tuples = vec![
            FingerprintTuple { hash: 1, anchor_time: 0 },
            FingerprintTuple { hash: 2, anchor_time: 5 },
        ];
        store.put_recording(meta("x"), &tuples, 1).unwrap();
        let found = store.lookup(&[1]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&1));
    }

    #[test]
    fn stats_reflect_inserted_tuples() {
        let store = MemoryStore::default();
        let tuples = vec![FingerprintTuple { hash: 1, anchor_time: 0 }];
        store.put_recording(meta("x"), &tuples, 1).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.recording_count, 1);
        assert_eq!(stats.tuple_count, 1);
    }

    #[test]
    fn config_epoch_pins_to_first_ingest() {
        let store = MemoryStore::default();
        assert_eq!(store.config_epoch().unwrap(), None);
        store.put_recording(meta("x"), &[], 42).unwrap();
        store.put_recording(meta("y"), &[], 99).unwrap();
        assert_eq!(store.config_epoch().unwrap(), Some(42));
    }
}
