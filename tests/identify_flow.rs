//! End-to-end coverage through the real decode path: synthesises WAV bytes
//! with `hound` (mirroring the teacher's own `save_as_wav` helper), then
//! exercises ingest and identify against an in-memory catalogue.

use echoid::config::{ExtractorConfig, MatcherConfig, ServiceConfig};
use echoid::ingest::NewRecording;
use echoid::models::{IdentifyOutcome, PutOutcome};
use echoid::store::memory::MemoryStore;
use echoid::AppContext;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::f64::consts::PI;
use std::io::Cursor;
use std::sync::Arc;

fn wav_bytes(samples: &[f64], sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            let amplitude = i16::MAX as f64;
            writer.write_sample((s * amplitude) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn chirp(sample_rate: u32, seconds: f64) -> Vec<f64> {
    let n = (sample_rate as f64 * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let freq = 300.0 + 4000.0 * t / seconds;
            (2.0 * PI * freq * t).sin() * 0.8
        })
        .collect()
}

fn test_context() -> (AppContext, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let config = ServiceConfig {
        extractor: ExtractorConfig::default(),
        matcher: MatcherConfig::default(),
        http_addr: "127.0.0.1:0".to_string(),
        log_filter: "off".to_string(),
    };
    let ctx = AppContext::new(config, store.clone());
    (ctx, store)
}

#[test]
fn ingested_recording_is_identified_from_a_clipped_excerpt() {
    let (ctx, _store) = test_context();
    let sample_rate = 22_050;
    let full = chirp(sample_rate, 12.0);
    let bytes = wav_bytes(&full, sample_rate);

    let outcome = ctx
        .ingest(NewRecording {
            title: "Sweep".to_string(),
            artist: "Test Artist".to_string(),
            album: None,
            filename_hint: "sweep.wav".to_string(),
            bytes,
        })
        .unwrap();
    let recording_id = outcome.outcome.id();

    let excerpt = &full[(sample_rate as usize * 4)..(sample_rate as usize * 9)];
    let query_bytes = wav_bytes(excerpt, sample_rate);

    let identified = ctx.identify(&query_bytes, "query.wav").unwrap();
    match identified {
        IdentifyOutcome::Match { recording, .. } => assert_eq!(recording.id, recording_id),
        IdentifyOutcome::NoMatch => panic!("expected the excerpt to match the ingested recording"),
    }
}

#[test]
fn unrelated_clip_does_not_match() {
    let (ctx, _store) = test_context();
    let sample_rate = 22_050;
    let full = chirp(sample_rate, 10.0);
    let bytes = wav_bytes(&full, sample_rate);

    ctx.ingest(NewRecording {
        title: "Sweep".to_string(),
        artist: "Test Artist".to_string(),
        album: None,
        filename_hint: "sweep.wav".to_string(),
        bytes,
    })
    .unwrap();

    let noise: Vec<f64> = (0..sample_rate as usize * 5)
        .map(|i| ((i * 2654435761u32 as usize) % 1000) as f64 / 500.0 - 1.0)
        .collect();
    let query_bytes = wav_bytes(&noise, sample_rate);

    let identified = ctx.identify(&query_bytes, "query.wav").unwrap();
    assert_eq!(identified, IdentifyOutcome::NoMatch);
}

#[test]
fn re_ingesting_identical_bytes_is_a_duplicate() {
    let (ctx, _store) = test_context();
    let sample_rate = 22_050;
    let bytes = wav_bytes(&chirp(sample_rate, 6.0), sample_rate);

    let first = ctx
        .ingest(NewRecording {
            title: "Sweep".to_string(),
            artist: "Test Artist".to_string(),
            album: None,
            filename_hint: "sweep.wav".to_string(),
            bytes: bytes.clone(),
        })
        .unwrap();
    let second = ctx
        .ingest(NewRecording {
            title: "Sweep".to_string(),
            artist: "Test Artist".to_string(),
            album: None,
            filename_hint: "sweep.wav".to_string(),
            bytes,
        })
        .unwrap();

    assert_eq!(first.outcome.id(), second.outcome.id());
    assert!(matches!(second.outcome, PutOutcome::Duplicate(_)));
}

#[test]
fn deleted_recording_is_no_longer_identified() {
    let (ctx, _store) = test_context();
    let sample_rate = 22_050;
    let full = chirp(sample_rate, 8.0);
    let bytes = wav_bytes(&full, sample_rate);

    let outcome = ctx
        .ingest(NewRecording {
            title: "Sweep".to_string(),
            artist: "Test Artist".to_string(),
            album: None,
            filename_hint: "sweep.wav".to_string(),
            bytes,
        })
        .unwrap();

    ctx.delete_recording(outcome.outcome.id()).unwrap();

    let excerpt = &full[(sample_rate as usize)..(sample_rate as usize * 5)];
    let query_bytes = wav_bytes(excerpt, sample_rate);
    let identified = ctx.identify(&query_bytes, "query.wav").unwrap();
    assert_eq!(identified, IdentifyOutcome::NoMatch);
}

#[test]
fn stats_reflect_the_catalogue_without_caching() {
    let (ctx, _store) = test_context();
    assert_eq!(ctx.stats().unwrap().recording_count, 0);

    let sample_rate = 22_050;
    let bytes = wav_bytes(&chirp(sample_rate, 6.0), sample_rate);
    ctx.ingest(NewRecording {
        title: "Sweep".to_string(),
        artist: "Test Artist".to_string(),
        album: None,
        filename_hint: "sweep.wav".to_string(),
        bytes,
    })
    .unwrap();

    let stats = ctx.stats().unwrap();
    assert_eq!(stats.recording_count, 1);
    assert!(stats.tuple_count > 0);
}
