//! Orchestrates the pure computation pipeline (spectrogram → peaks → hashes)
//! behind a single entry point shared by ingest and identify (spec §4).

use crate::config::ExtractorConfig;
use crate::error::{EchoidError, Result};
use crate::hasher::generate_hashes;
use crate::models::FingerprintTuple;
use crate::peaks::pick_peaks;
use crate::spectrogram::SpectrogramBuilder;
use tracing::debug;

/// Builds and owns a planned [`SpectrogramBuilder`] for one `ExtractorConfig`,
/// so ingest and identify calls within a process share the FFT plan.
pub struct Extractor {
    config: ExtractorConfig,
    spectrogram_builder: SpectrogramBuilder,
    lo_bin: usize,
    hi_bin: usize,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let spectrogram_builder = SpectrogramBuilder::new(config.fft_size, config.hop);
        let lo_bin = spectrogram_builder.bin_for_freq(config.freq_lo, config.sample_rate);
        let hi_bin = spectrogram_builder.bin_for_freq(config.freq_hi, config.sample_rate);
        Self {
            config,
            spectrogram_builder,
            lo_bin,
            hi_bin,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Runs PCM at the configured sample rate through the full landmark and
    /// hashing pipeline.
    ///
    /// Fails with [`EchoidError::Unfingerprintable`] when the clip is too
    /// short to spectrogram, yields no landmarks, or yields no hashable
    /// landmark pairs.
    pub fn extract(&self, pcm: &[f64]) -> Result<Vec<FingerprintTuple>> {
        debug!(sample_count = pcm.len(), "extractor started");
        let spectrogram = self.spectrogram_builder.build(pcm);
        if spectrogram.is_empty() {
            return Err(EchoidError::Unfingerprintable(
                "clip is shorter than one analysis window".to_string(),
            ));
        }

        let landmarks = pick_peaks(
            &spectrogram,
            self.config.peak_radius,
            self.config.amp_percentile,
            self.lo_bin,
            self.hi_bin,
        );
        if landmarks.is_empty() {
            return Err(EchoidError::Unfingerprintable(
                "no landmarks found above the amplitude threshold".to_string(),
            ));
        }

        let hashes = generate_hashes(
            &landmarks,
            self.config.fan_size,
            self.config.target_zone_start,
            self.config.target_zone_width,
        );
        if hashes.is_empty() {
            return Err(EchoidError::Unfingerprintable(
                "landmarks did not yield any hashable pairs".to_string(),
            ));
        }

        debug!(
            frame_count = spectrogram.num_frames,
            landmark_count = landmarks.len(),
            hash_count = hashes.len(),
            "extractor finished"
        );
        Ok(hashes)
    }
}
