//! Time-coherent histogram matcher (spec §4.5), grounded in the teacher's
//! `vote_best_matches` offset-histogram approach but generalised to subsample
//! long queries, batch store lookups, and stop early once a candidate is
//! convincingly ahead.

use crate::config::MatcherConfig;
use crate::error::{EchoidError, Result};
use crate::models::{FingerprintTuple, IdentifyOutcome};
use crate::store::FingerprintStore;
use std::collections::HashMap;
use tracing::{debug, info};

/// Matches a query's fingerprint tuples against the catalogue.
///
/// `query_epoch` must equal the catalogue's recorded epoch (spec §9): a
/// mismatch means the query was extracted with different `ExtractorConfig`
/// parameters than the catalogue was built with, and any match would be
/// meaningless.
pub fn identify(
    store: &dyn FingerprintStore,
    config: &MatcherConfig,
    query_tuples: &[FingerprintTuple],
    query_epoch: u64,
) -> Result<IdentifyOutcome> {
    if let Some(catalogue_epoch) = store.config_epoch()? {
        if catalogue_epoch != query_epoch {
            return Err(EchoidError::InvalidParameters(format!(
                "query extractor epoch {query_epoch:#x} does not match catalogue epoch {catalogue_epoch:#x}"
            )));
        }
    }

    let subsampled = subsample(query_tuples, config.max_query);
    debug!(
        query_tuple_count = query_tuples.len(),
        subsampled_count = subsampled.len(),
        "matcher started"
    );

    // recording_id -> (delta_t -> vote count)
    let mut histograms: HashMap<i64, HashMap<i64, u32>> = HashMap::new();
    let mut best_score = 0u32;

    'batches: for (batch_index, batch) in subsampled.chunks(config.batch_size).enumerate() {
        let hashes: Vec<u64> = batch.iter().map(|t| t.hash).collect();
        let hash_count = hashes.len();
        let matches = store.lookup(&hashes)?;

        for query_tuple in batch {
            let Some(candidates) = matches.get(&query_tuple.hash) else {
                continue;
            };
            for &(recording_id, db_time) in candidates {
                let delta_t = db_time as i64 - query_tuple.anchor_time as i64;
                let histogram = histograms.entry(recording_id).or_default();
                let count = histogram.entry(delta_t).or_insert(0);
                *count += 1;
                if *count > best_score {
                    best_score = *count;
                }
            }
        }

        debug!(batch_index, hash_count, best_score, "matcher batch processed");

        if best_score > config.early_exit {
            debug!(batch_index, best_score, "matcher early-exit threshold cleared");
            break 'batches;
        }
    }

    let Some((&winner_id, winner_histogram)) = histograms
        .iter()
        .max_by_key(|&(&id, ref hist)| (hist.values().copied().max().unwrap_or(0), std::cmp::Reverse(id)))
    else {
        info!(best_score, "matcher found no candidate recording");
        return Ok(IdentifyOutcome::NoMatch);
    };

    let (&alignment_offset, &score) = winner_histogram
        .iter()
        .max_by_key(|&(&offset, &count)| (count, std::cmp::Reverse(offset)))
        .expect("non-empty histogram");

    if score < config.min_peak {
        info!(winner_id, score, "matcher rejected candidate below min_peak");
        return Ok(IdentifyOutcome::NoMatch);
    }

    let confidence_pct = (score as f64 * 100.0 / config.good_match_baseline as f64).min(100.0);
    if confidence_pct < config.min_confidence_pct {
        info!(
            winner_id,
            score, confidence_pct, "matcher rejected candidate below min_confidence_pct"
        );
        return Ok(IdentifyOutcome::NoMatch);
    }

    let recording = store.get_recording(winner_id)?;
    info!(
        recording_id = winner_id,
        score, alignment_offset, confidence_pct, "matcher accepted candidate"
    );
    Ok(IdentifyOutcome::Match {
        recording,
        score,
        alignment_offset: alignment_offset as i32,
        confidence_pct,
    })
}

/// Evenly strides the query's tuples down to at most `max_query` entries,
/// keeping temporal spread across the clip rather than the first N hashes.
fn subsample(tuples: &[FingerprintTuple], max_query: usize) -> Vec<FingerprintTuple> {
    if tuples.len() <= max_query || max_query == 0 {
        return tuples.to_vec();
    }
    let stride = tuples.len() as f64 / max_query as f64;
    (0..max_query)
        .map(|i| tuples[(i as f64 * stride) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecordingMeta;
    use crate::store::memory::MemoryStore;

    fn tuple(hash: u64, t: u32) -> FingerprintTuple {
        FingerprintTuple { hash, anchor_time: t }
    }

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
    fn aligned_query_matches_catalogued_recording() {
        let store = MemoryStore::default();
        let catalogued: Vec<FingerprintTuple> = (0..20).map(|i| tuple(i, i as u32 * 10)).collect();
        store.put_recording(meta("x"), &catalogued, 1).unwrap();

        // Query is the same landmark sequence offset by a constant 3 frames,
        // simulating a clip clipped from partway through the track.
        let query: Vec<FingerprintTuple> = (0..20).map(|i| tuple(i, i as u32 * 10 - 3)).collect();

        let config = MatcherConfig::default();
        let outcome = identify(&store, &config, &query, 1).unwrap();
        match outcome {
            IdentifyOutcome::Match {
                alignment_offset,
                score,
                ..
            } => {
                assert_eq!(alignment_offset, 3);
                assert!(score >= config.min_peak);
            }
            IdentifyOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn unrelated_query_does_not_match() {
        let store = MemoryStore::default();
        let catalogued: Vec<FingerprintTuple> = (0..20).map(|i| tuple(i, i as u32 * 10)).collect();
        store.put_recording(meta("x"), &catalogued, 1).unwrap();

        let query: Vec<FingerprintTuple> = (0..20).map(|i| tuple(1000 + i, i as u32 * 10)).collect();

        let config = MatcherConfig::default();
        let outcome = identify(&store, &config, &query, 1).unwrap();
        assert_eq!(outcome, IdentifyOutcome::NoMatch);
    }

    #[test]
    fn epoch_mismatch_is_rejected() {
        let store = MemoryStore::default();
        store.put_recording(meta("x"), &[tuple(1, 0)], 1).unwrap();

        let config = MatcherConfig::default();
        let err = identify(&store, &config, &[tuple(1, 0)], 2).unwrap_err();
        assert!(matches!(err, EchoidError::InvalidParameters(_)));
    }

    #[test]
    fn empty_catalogue_is_no_match() {
        let store = MemoryStore::default();
        let config = MatcherConfig::default();
        let outcome = identify(&store, &config, &[tuple(1, 0)], 1).unwrap();
        assert_eq!(outcome, IdentifyOutcome::NoMatch);
    }

    #[test]
    fn tiebreak_prefers_smallest_recording_id() {
        let store = MemoryStore::default();
        let tuples = vec![tuple(5, 0), tuple(6, 1), tuple(7, 2), tuple(8, 3), tuple(9, 4)];
        let first = store.put_recording(meta("a"), &tuples, 1).unwrap().id();
        let second = store.put_recording(meta("b"), &tuples, 1).unwrap().id();
        assert!(first < second);

        let config = MatcherConfig::default();
        let outcome = identify(&store, &config, &tuples, 1).unwrap();
        match outcome {
            IdentifyOutcome::Match { recording, .. } => assert_eq!(recording.id, first),
            IdentifyOutcome::NoMatch => panic!("expected a match"),
        }
    }
}
