//! Short-time Fourier transform spectrogram builder (spec §4.1).

use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use std::sync::Arc;

/// Magnitude-in-decibels spectrogram, stored as a flat row-major buffer of
/// shape `(num_frames, num_bins)` rather than `Vec<Vec<f64>>` to keep the
/// extractor's allocation profile predictable.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub num_frames: usize,
    pub num_bins: usize,
    data: Vec<f64>,
}

/// Cells with zero magnitude map to this floor instead of `-inf`.
pub const DB_FLOOR: f64 = -120.0;

impl Spectrogram {
    fn empty() -> Self {
        Spectrogram {
            num_frames: 0,
            num_bins: 0,
            data: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    #[inline]
    pub fn get(&self, frame: usize, bin: usize) -> f64 {
        self.data[frame * self.num_bins + bin]
    }

    #[inline]
    fn set(&mut self, frame: usize, bin: usize, value: f64) {
        self.data[frame * self.num_bins + bin] = value;
    }

    pub fn frame(&self, frame: usize) -> &[f64] {
        let start = frame * self.num_bins;
        &self.data[start..start + self.num_bins]
    }
}

/// Builds spectrograms with a fixed window `fft_size` and hop `hop`.
///
/// Owns a planned `rustfft` forward plan and the Hann window coefficients so
/// repeated calls (ingest followed by identify within one process) don't
/// replan the FFT.
pub struct SpectrogramBuilder {
    fft_size: usize,
    hop: usize,
    window: Vec<f64>,
    fft: Arc<dyn rustfft::Fft<f64>>,
}

impl SpectrogramBuilder {
    pub fn new(fft_size: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft_size,
            hop,
            window: hann_window(fft_size),
            fft,
        }
    }

    /// Transforms mono PCM in `[-1, 1]` into a log-amplitude spectrogram.
    ///
    /// Returns an empty spectrogram (`is_empty() == true`) when there are
    /// fewer samples than one window, signalling "unfingerprintable" to the
    /// caller (spec §4.1).
    pub fn build(&self, pcm: &[f64]) -> Spectrogram {
        if pcm.len() < self.fft_size {
            return Spectrogram::empty();
        }

        let num_frames = (pcm.len() - self.fft_size) / self.hop + 1;
        let num_bins = self.fft_size / 2 + 1;
        let mut spec = Spectrogram {
            num_frames,
            num_bins,
            data: vec![0.0; num_frames * num_bins],
        };

        let mut scratch = vec![Complex64::new(0.0, 0.0); self.fft_size];
        let mut global_max = 0.0f64;
        let mut magnitudes = vec![0.0f64; num_frames * num_bins];

        for t in 0..num_frames {
            let start = t * self.hop;
            let chunk = &pcm[start..start + self.fft_size];
            for (i, (&sample, &w)) in chunk.iter().zip(self.window.iter()).enumerate() {
                scratch[i] = Complex64::new(sample * w, 0.0);
            }

            self.fft.process(&mut scratch);

            for f in 0..num_bins {
                let mag = scratch[f].norm();
                magnitudes[t * num_bins + f] = mag;
                if mag > global_max {
                    global_max = mag;
                }
            }
        }

        for t in 0..num_frames {
            for f in 0..num_bins {
                let mag = magnitudes[t * num_bins + f];
                let db = if global_max > 0.0 && mag > 0.0 {
                    20.0 * (mag / global_max).log10()
                } else {
                    DB_FLOOR
                };
                spec.set(t, f, db.max(DB_FLOOR));
            }
        }

        spec
    }

    /// Converts a frequency in Hz to the nearest bin index for this builder's
    /// `fft_size`/sample-rate pairing.
    pub fn bin_for_freq(&self, freq_hz: f64, sample_rate: u32) -> usize {
        let bin = (freq_hz * self.fft_size as f64 / sample_rate as f64).round();
        bin.clamp(0.0, (self.fft_size / 2) as f64) as usize
    }
}

fn hann_window(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f64 / (len as f64 - 1.0)).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f64 / sample_rate as f64).sin())
            .collect()
    }

    #[test]
    fn short_input_is_empty() {
        let builder = SpectrogramBuilder::new(2048, 512);
        let spec = builder.build(&vec![0.0; 100]);
        assert!(spec.is_empty());
    }

    #[test]
    fn deterministic_for_same_input() {
        let builder = SpectrogramBuilder::new(2048, 512);
        let pcm = sine(440.0, 22_050, 22_050);
        let a = builder.build(&pcm);
        let b = builder.build(&pcm);
        assert_eq!(a.num_frames, b.num_frames);
        for i in 0..a.num_frames * a.num_bins {
            assert_eq!(a.data[i], b.data[i]);
        }
    }

    #[test]
    fn max_db_is_zero() {
        let builder = SpectrogramBuilder::new(2048, 512);
        let pcm = sine(1000.0, 22_050, 22_050);
        let spec = builder.build(&pcm);
        let max = (0..spec.num_frames * spec.num_bins)
            .map(|i| spec.data[i])
            .fold(f64::MIN, f64::max);
        assert!((max - 0.0).abs() < 1e-9);
    }

    #[test]
    fn pure_tone_peaks_at_expected_bin() {
        let builder = SpectrogramBuilder::new(2048, 512);
        let pcm = sine(1000.0, 22_050, 22_050);
        let spec = builder.build(&pcm);
        let expected_bin = builder.bin_for_freq(1000.0, 22_050);
        let mid_frame = spec.num_frames / 2;
        let row = spec.frame(mid_frame);
        let (argmax, _) = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert!((argmax as i64 - expected_bin as i64).abs() <= 1);
    }
}
