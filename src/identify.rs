//! Identify orchestrator: decode → condition → extract → match (spec §4.7, §6).

use crate::config::MatcherConfig;
use crate::decode::Decoder;
use crate::error::{EchoidError, Result};
use crate::extractor::Extractor;
use crate::matcher;
use crate::models::IdentifyOutcome;
use crate::preprocess::condition_query;
use crate::store::FingerprintStore;
use tracing::debug;

/// Identifies a query clip's raw bytes against the catalogue.
///
/// Unlike ingest, a query is silence-trimmed and peak-normalised before
/// extraction, since a query's leading silence and recording gain are
/// uncontrolled (spec §4.7).
pub fn identify_clip(
    decoder: &dyn Decoder,
    extractor: &Extractor,
    matcher_config: &MatcherConfig,
    store: &dyn FingerprintStore,
    bytes: &[u8],
    filename_hint: &str,
) -> Result<IdentifyOutcome> {
    debug!(filename_hint, byte_count = bytes.len(), "identify started");
    let pcm = decoder.decode(bytes, filename_hint, extractor.config().sample_rate)?;
    let conditioned = condition_query(&pcm);
    if conditioned.is_empty() {
        return Err(EchoidError::Unfingerprintable(
            "query clip is silent".to_string(),
        ));
    }

    let tuples = extractor.extract(&conditioned)?;
    let hash_count = tuples.len();
    let outcome = matcher::identify(store, matcher_config, &tuples, extractor.config().epoch())?;
    debug!(hash_count, "identify finished");
    Ok(outcome)
}
