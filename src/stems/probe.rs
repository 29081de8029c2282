//! In-process audio inspection for stem validation.

use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Duration and loudness of a decoded audio file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioStats {
    pub duration_secs: f64,
    /// Root-mean-square amplitude on the 16-bit integer sample scale
    /// (0..=32768), so a digital-silence file reports ~0.
    pub rms: f64,
}

/// Decodes an audio file far enough to judge whether it contains real signal.
pub trait AudioProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<AudioStats>;
}

/// Symphonia-backed probe. Decodes the whole file and accumulates sample
/// statistics; works for the mp3/wav output the separation tool produces.
#[derive(Debug, Default)]
pub struct SymphoniaProbe;

impl AudioProbe for SymphoniaProbe {
    fn probe(&self, path: &Path) -> Result<AudioStats> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("Failed to probe audio file: {}", path.display()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found in file")?;
        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.context("Sample rate unknown")? as f64;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(1)
            .max(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .with_context(|| format!("Failed to create decoder for: {}", path.display()))?;

        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut frames: u64 = 0;
        let mut sum_squares: f64 = 0.0;
        let mut sample_count: u64 = 0;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            // A single bad packet should not discard the rest of the file.
            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(anyhow::anyhow!("Failed to decode packet: {}", e)),
            };

            if sample_buf.is_none() {
                sample_buf = Some(SampleBuffer::<f32>::new(
                    decoded.capacity() as u64,
                    *decoded.spec(),
                ));
            }
            frames += decoded.frames() as u64;
            if let Some(buf) = &mut sample_buf {
                buf.copy_interleaved_ref(decoded);
                for &sample in buf.samples() {
                    let scaled = sample as f64 * 32768.0;
                    sum_squares += scaled * scaled;
                    sample_count += 1;
                }
            }
        }

        let duration_secs = frames as f64 / sample_rate;
        let rms = if sample_count == 0 {
            0.0
        } else {
            (sum_squares / sample_count as f64).sqrt()
        };

        tracing::debug!(
            path = %path.display(),
            duration_secs = format!("{:.2}", duration_secs),
            rms = format!("{:.1}", rms),
            channels,
            "Probed stem audio"
        );

        Ok(AudioStats { duration_secs, rms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_missing_file_is_error() {
        let result = SymphoniaProbe.probe(Path::new("/nonexistent/stem.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_probe_garbage_bytes_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.mp3");
        std::fs::write(&path, b"this is not audio at all").unwrap();
        assert!(SymphoniaProbe.probe(&path).is_err());
    }
}
