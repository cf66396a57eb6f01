//! Video decomposition into an audio track and periodic still frames.

use super::{has_audio_stream, probe_duration, run_ffmpeg, write_input, TARGET_SAMPLE_RATE};
use crate::config::IngestionSettings;
use crate::error::{within, MosaicError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Offsets (seconds) at which frames are sampled: `i * interval` for
/// `i in 0..ceil(duration / interval)`, never fewer than one.
pub fn frame_offsets(duration_seconds: f64, interval_seconds: f64) -> Vec<f64> {
    if interval_seconds.is_nan()
        || interval_seconds <= 0.0
        || !duration_seconds.is_finite()
        || duration_seconds <= 0.0
    {
        return vec![0.0];
    }

    let count = ((duration_seconds / interval_seconds).ceil() as usize).max(1);
    (0..count).map(|i| i as f64 * interval_seconds).collect()
}

/// One sampled still and its ordinal `i` in the offset sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub index: u32,
    pub jpeg: Vec<u8>,
}

/// Both halves of a decomposed video. Each half succeeds or fails on its own.
#[derive(Debug)]
pub struct VideoParts {
    /// Probed container duration, `0.0` when it could not be read.
    pub duration_seconds: f64,
    /// Mono 16 kHz WAV of the audio track, `None` when the clip is silent.
    pub audio: Result<Option<Vec<u8>>>,
    /// JPEG frames in offset order.
    pub frames: Result<Vec<VideoFrame>>,
    /// Ordinals that produced no frame while others did.
    pub missing_frames: Vec<u32>,
}

struct FrameSample {
    duration: f64,
    frames: Vec<VideoFrame>,
    missing: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct VideoDecomposer {
    frame_interval: f64,
    decode_timeout: Duration,
}

impl VideoDecomposer {
    pub fn new(settings: &IngestionSettings) -> Self {
        Self {
            frame_interval: settings.frame_interval_seconds,
            decode_timeout: settings.timeouts.decode(),
        }
    }

    pub fn frame_interval(&self) -> f64 {
        self.frame_interval
    }

    /// Split a video into its audio track and sampled frames.
    ///
    /// The two extractions run concurrently against the same scratch copy.
    #[instrument(skip(self, bytes, scratch_dir), fields(bytes = bytes.len()))]
    pub async fn decompose(&self, bytes: &[u8], extension: &str, scratch_dir: &Path) -> VideoParts {
        let input = match write_input(scratch_dir, "video", extension, bytes).await {
            Ok(path) => path,
            Err(e) => {
                let message = e.to_string();
                return VideoParts {
                    duration_seconds: 0.0,
                    audio: Err(MosaicError::DecodeFailure(message.clone())),
                    frames: Err(MosaicError::DecodeFailure(message)),
                    missing_frames: Vec::new(),
                };
            }
        };

        let (audio, frames) = tokio::join!(
            within("decode", self.decode_timeout, self.extract_audio(&input, scratch_dir)),
            within("decode", self.decode_timeout, self.extract_frames(&input, scratch_dir)),
        );

        let (duration_seconds, frames, missing_frames) = match frames {
            Ok(sample) => (sample.duration, Ok(sample.frames), sample.missing),
            Err(e) => (0.0, Err(e), Vec::new()),
        };

        info!(
            duration = duration_seconds,
            audio_ok = audio.is_ok(),
            frames = frames.as_ref().map(|f| f.len()).unwrap_or(0),
            missing = missing_frames.len(),
            "Video decomposed"
        );

        VideoParts {
            duration_seconds,
            audio,
            frames,
            missing_frames,
        }
    }

    async fn extract_audio(&self, input: &Path, scratch_dir: &Path) -> Result<Option<Vec<u8>>> {
        if !has_audio_stream(input).await? {
            debug!("Video has no audio stream");
            return Ok(None);
        }

        let output = scratch_dir.join("video-audio.wav");
        let rate = TARGET_SAMPLE_RATE.to_string();
        let args: Vec<&OsStr> = vec![
            OsStr::new("-i"), input.as_os_str(),
            OsStr::new("-vn"),
            OsStr::new("-ac"), OsStr::new("1"),
            OsStr::new("-ar"), OsStr::new(&rate),
            OsStr::new("-c:a"), OsStr::new("pcm_s16le"),
            output.as_os_str(),
        ];
        run_ffmpeg(args).await?;

        Ok(Some(tokio::fs::read(&output).await?))
    }

    async fn extract_frames(&self, input: &Path, scratch_dir: &Path) -> Result<FrameSample> {
        let duration = probe_duration(input).await?;
        let offsets = frame_offsets(duration, self.frame_interval);
        debug!(count = offsets.len(), "Sampling frames");

        let mut frames = Vec::with_capacity(offsets.len());
        let mut missing = Vec::new();
        let mut first_error = None;

        for (i, offset) in offsets.iter().enumerate() {
            let index = i as u32;
            let output = scratch_dir.join(format!("frame_{:05}.jpg", i));
            let at = format!("{:.3}", offset);
            let args: Vec<&OsStr> = vec![
                OsStr::new("-ss"), OsStr::new(&at),
                OsStr::new("-i"), input.as_os_str(),
                OsStr::new("-frames:v"), OsStr::new("1"),
                OsStr::new("-q:v"), OsStr::new("2"),
                output.as_os_str(),
            ];

            match run_ffmpeg(args).await {
                Ok(()) => match tokio::fs::read(&output).await {
                    Ok(jpeg) if !jpeg.is_empty() => frames.push(VideoFrame { index, jpeg }),
                    // Seeking at the very end of a stream can yield nothing.
                    _ => {
                        warn!(offset, "No frame produced");
                        missing.push(index);
                    }
                },
                Err(e @ MosaicError::ToolNotFound(_)) => return Err(e),
                Err(e) => {
                    warn!(offset, "Frame extraction failed: {}", e);
                    missing.push(index);
                    first_error.get_or_insert(e);
                }
            }
        }

        match (frames.is_empty(), first_error) {
            (true, Some(e)) => Err(e),
            (true, None) => Err(MosaicError::DecodeFailure("no frames could be extracted".into())),
            _ => Ok(FrameSample {
                duration,
                frames,
                missing,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_offsets_cover_duration() {
        assert_eq!(frame_offsets(12.0, 5.0), vec![0.0, 5.0, 10.0]);
        assert_eq!(frame_offsets(10.0, 5.0), vec![0.0, 5.0]);
        assert_eq!(frame_offsets(60.0, 5.0).len(), 12);
    }

    #[test]
    fn test_frame_offsets_at_least_one() {
        assert_eq!(frame_offsets(0.4, 5.0), vec![0.0]);
        assert_eq!(frame_offsets(0.0, 5.0), vec![0.0]);
        assert_eq!(frame_offsets(f64::NAN, 5.0), vec![0.0]);
        assert_eq!(frame_offsets(30.0, 0.0), vec![0.0]);
    }

    #[test]
    fn test_frame_count_is_ceiling() {
        for (duration, interval) in [(1.0f64, 5.0f64), (5.01, 5.0), (99.9, 2.5), (3600.0, 5.0)] {
            let expected = (duration / interval).ceil() as usize;
            assert_eq!(frame_offsets(duration, interval).len(), expected.max(1));
        }
    }

    #[tokio::test]
    async fn test_bogus_video_fails_both_halves() {
        let dir = tempfile::tempdir().unwrap();
        let decomposer = VideoDecomposer::new(&IngestionSettings::default());

        let parts = decomposer
            .decompose(b"this is not an mp4", ".mp4", dir.path())
            .await;

        assert!(parts.audio.is_err());
        assert!(parts.frames.is_err());
        assert!(parts.missing_frames.is_empty());
        assert_eq!(parts.duration_seconds, 0.0);
    }
}
