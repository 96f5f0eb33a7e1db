//! WAV container interchange
//!
//! Wraps raw 16-bit LE mono PCM in a standard RIFF/WAVE header for
//! file export and for one-shot recognition uploads.

use std::io::Cursor;
use std::path::Path;

use crate::{Error, Result};

/// Wrap raw PCM bytes in a WAV container at the given sample rate
///
/// # Errors
///
/// Returns error if the PCM length is not sample-aligned or encoding fails
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    if pcm.len() % 2 != 0 {
        return Err(Error::Audio("PCM byte length is not sample-aligned".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;
        for bytes in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Write raw PCM to a WAV file
///
/// # Errors
///
/// Returns error if encoding or the write fails
pub fn write_wav_file(path: &Path, pcm: &[u8], sample_rate: u32) -> Result<()> {
    let wav = pcm_to_wav(pcm, sample_rate)?;
    std::fs::write(path, wav)?;
    Ok(())
}
