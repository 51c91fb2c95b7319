//! Query-side PCM conditioning: silence trimming and peak normalisation
//! (spec §4.7). Ingest-side audio is fingerprinted as decoded; only queries
//! pass through this stage, since a query clip's recording gain and leading
//! silence are unknown ahead of time.

/// Amplitude below this level (relative to the clip's own peak, in dB) is
/// treated as silence for trimming purposes.
const SILENCE_THRESHOLD_DB: f64 = -20.0;

/// Trims leading/trailing silence and peak-normalises to unit amplitude.
///
/// Returns an empty vector when the clip is silent throughout.
pub fn condition_query(pcm: &[f64]) -> Vec<f64> {
    let peak = pcm.iter().fold(0.0f64, |acc, &s| acc.max(s.abs()));
    if peak <= 0.0 {
        return Vec::new();
    }

    let threshold = peak * db_to_linear(SILENCE_THRESHOLD_DB);

    let start = pcm.iter().position(|&s| s.abs() >= threshold);
    let end = pcm.iter().rposition(|&s| s.abs() >= threshold);

    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        _ => return Vec::new(),
    };

    pcm[start..=end].iter().map(|&s| s / peak).collect()
}

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
