//! Audio cache and fingerprint properties
//!
//! The codec-dependent paths run against a forced-unavailable codec so
//! results do not depend on ffmpeg being installed; compression tests
//! are gated on detection.

use tempfile::TempDir;
use vox_cli::audio::OpusCodec;
use vox_cli::cache::{AudioCache, CacheKey};
use vox_cli::synthesis::SynthesisRequest;

fn raw_cache(dir: &TempDir) -> AudioCache {
    AudioCache::with_codec(dir.path().to_path_buf(), OpusCodec::unavailable())
}

fn request() -> SynthesisRequest {
    let mut request = SynthesisRequest::new("m1", "Cherry", "hello");
    request.speech_rate = 1.0;
    request
}

/// A few hundred samples of fake PCM
fn sample_pcm() -> Vec<u8> {
    (0..600u16).flat_map(|i| (i as i16).to_le_bytes()).collect()
}

#[tokio::test]
async fn lookup_before_store_is_miss() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);

    assert!(cache.lookup(&request().fingerprint()).await.is_none());
}

#[tokio::test]
async fn store_then_lookup_returns_stored_content() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);
    let key = request().fingerprint();
    let pcm = sample_pcm();

    cache.store(&key, &pcm).await;
    assert_eq!(cache.lookup(&key).await.as_deref(), Some(pcm.as_slice()));
}

#[tokio::test]
async fn codec_absence_falls_back_to_raw_entry() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);
    let key = request().fingerprint();

    cache.store(&key, &sample_pcm()).await;

    // No compressed entry was written, only the legacy raw one
    assert!(!dir.path().join(format!("{}.opus", key.hex())).exists());
    assert!(dir.path().join(format!("{}.pcm", key.hex())).exists());
}

#[tokio::test]
async fn undecodable_compressed_entry_falls_back_to_raw() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);
    let key = request().fingerprint();
    let pcm = sample_pcm();

    std::fs::write(dir.path().join(format!("{}.opus", key.hex())), b"not opus").unwrap();
    std::fs::write(dir.path().join(format!("{}.pcm", key.hex())), &pcm).unwrap();

    assert_eq!(cache.lookup(&key).await.as_deref(), Some(pcm.as_slice()));
}

#[tokio::test]
async fn empty_payload_is_not_stored() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);
    let key = request().fingerprint();

    cache.store(&key, &[]).await;
    assert!(cache.lookup(&key).await.is_none());
}

#[tokio::test]
async fn compressed_entry_round_trips_when_ffmpeg_present() {
    let codec = OpusCodec::detect();
    if !codec.is_available() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let cache = AudioCache::with_codec(dir.path().to_path_buf(), codec);
    let key = request().fingerprint();
    // One second of a ramp at 24 kHz
    let pcm: Vec<u8> = (0..24_000u32)
        .flat_map(|i| ((i % 8192) as i16).to_le_bytes())
        .collect();

    cache.store(&key, &pcm).await;
    if !dir.path().join(format!("{}.opus", key.hex())).exists() {
        return; // ffmpeg without libopus; the raw fallback already took over
    }

    // Opus is lossy, so assert presence and comparable duration rather
    // than byte equality
    let decoded = cache.lookup(&key).await.expect("compressed entry readable");
    let ratio = decoded.len() as f64 / pcm.len() as f64;
    assert!(ratio > 0.9 && ratio < 1.1, "duration drifted: {ratio}");
}

#[test]
fn equal_requests_yield_equal_keys() {
    assert_eq!(request().fingerprint(), request().fingerprint());
}

#[test]
fn every_field_changes_the_fingerprint() {
    let base = request().fingerprint();

    let mut changed = request();
    changed.model = "m2".to_string();
    assert_ne!(changed.fingerprint(), base, "model");

    let mut changed = request();
    changed.voice = "Ethan".to_string();
    assert_ne!(changed.fingerprint(), base, "voice");

    let mut changed = request();
    changed.text = "hello!".to_string();
    assert_ne!(changed.fingerprint(), base, "text");

    let mut changed = request();
    changed.language = "English".to_string();
    assert_ne!(changed.fingerprint(), base, "language");

    let mut changed = request();
    changed.instruction = Some("whisper".to_string());
    assert_ne!(changed.fingerprint(), base, "instruction");

    let mut changed = request();
    changed.speech_rate = 1.5;
    assert_ne!(changed.fingerprint(), base, "speech rate");
}

#[test]
fn transcript_cache_round_trips() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);
    let key = CacheKey::digest(b"some wav bytes:domain context");

    assert!(cache.lookup_transcript(&key).is_none());
    cache.store_transcript(&key, "hello world");
    assert_eq!(cache.lookup_transcript(&key).as_deref(), Some("hello world"));
}

#[tokio::test]
async fn status_and_clear_count_entries() {
    let dir = TempDir::new().unwrap();
    let cache = raw_cache(&dir);

    cache.store(&request().fingerprint(), &sample_pcm()).await;
    cache.store_transcript(&CacheKey::digest(b"x"), "text");

    let (files, bytes) = cache.status().unwrap();
    assert_eq!(files, 2);
    assert!(bytes > 0);

    assert_eq!(cache.clear().unwrap(), 2);
    let (files, bytes) = cache.status().unwrap();
    assert_eq!(files, 0);
    assert_eq!(bytes, 0);
}
