//! Container decoding: the external "decode to mono PCM at rate R" collaborator
//! (spec §2, §6). The core never parses container formats itself — it only
//! depends on the [`Decoder`] trait.

use crate::config::SUPPORTED_EXTENSIONS;
use crate::error::{EchoidError, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decodes an arbitrary supported container to mono PCM at a target sample
/// rate, in `[-1, 1]` float range.
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8], filename_hint: &str, target_sample_rate: u32)
    -> Result<Vec<f64>>;
}

/// Checks the file extension against the cheap pre-decode allow-list
/// (`{mp3, wav, flac, ogg, m4a}`), independent of any particular decoder.
pub fn check_supported_extension(filename_hint: &str) -> Result<()> {
    let extension = std::path::Path::new(filename_hint)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(EchoidError::UnsupportedFormat { extension })
    }
}

/// Symphonia-backed [`Decoder`], mirroring the probe/decode pipeline the
/// teacher's original mic-capture harness used, generalised to decode from an
/// in-memory byte buffer and to resample to a caller-chosen target rate.
pub struct SymphoniaDecoder;

impl Default for SymphoniaDecoder {
    fn default() -> Self {
        Self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(
        &self,
        bytes: &[u8],
        filename_hint: &str,
        target_sample_rate: u32,
    ) -> Result<Vec<f64>> {
        check_supported_extension(filename_hint)?;

        if bytes.is_empty() {
            return Err(EchoidError::DecodeFailed("empty input".to_string()));
        }

        let cursor = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| EchoidError::DecodeFailed(format!("probe failed: {e}")))?;

        let mut format = probed.format;
        let codec_params = &format
            .tracks()
            .first()
            .ok_or_else(|| EchoidError::DecodeFailed("no audio track".to_string()))?
            .codec_params;

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| EchoidError::DecodeFailed("unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(codec_params, &DecoderOptions::default())
            .map_err(|e| EchoidError::DecodeFailed(format!("no codec for track: {e}")))?;

        let mut mono = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(e.into()),
            };

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e.into()),
            };

            let num_channels = decoded.spec().channels.count().max(1);
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
            sample_buf.copy_interleaved_ref(decoded);

            for i in (0..sample_buf.len()).step_by(num_channels) {
                let frame = &sample_buf.samples()[i..i + num_channels];
                let mono_sample = frame.iter().sum::<f32>() / num_channels as f32;
                mono.push(mono_sample as f64);
            }
        }

        if mono.is_empty() {
            return Err(EchoidError::Unfingerprintable(
                "decoder produced no samples".to_string(),
            ));
        }

        Ok(resample_linear(&mono, sample_rate, target_sample_rate))
    }
}

/// Linear-interpolation resampler, reused verbatim in spirit from the
/// teacher's own `resample_linear` helper.
fn resample_linear(samples: &[f64], from_rate: u32, to_rate: u32) -> Vec<f64> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio) as usize;
    let mut resampled = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let in_idx_float = i as f64 * ratio;
        let in_idx = in_idx_float.floor() as usize;
        let frac = in_idx_float.fract();

        if in_idx + 1 < samples.len() {
            let p1 = samples[in_idx];
            let p2 = samples[in_idx + 1];
            resampled.push(p1 + frac * (p2 - p1));
        } else if in_idx < samples.len() {
            resampled.push(samples[in_idx]);
        } else {
            break;
        }
    }

    resampled
}
