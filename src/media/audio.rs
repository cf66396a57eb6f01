//! Audio normalization to mono 16 kHz PCM16 WAV, with optional denoising.

use super::{run_ffmpeg, write_input, TARGET_SAMPLE_RATE};
use crate::config::IngestionSettings;
use crate::error::{within, MosaicError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PCM_FORMAT: u16 = 1;
const WAV_HEADER_LEN: usize = 44;

/// The parts of a RIFF/WAVE header the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Byte offset of the first sample.
    pub data_offset: usize,
    /// Length of the sample data in bytes, clipped to the buffer.
    pub data_len: usize,
}

impl WavHeader {
    /// Walk the RIFF chunks for `fmt ` and `data`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(MosaicError::DecodeFailure("not a RIFF/WAVE file".into()));
        }

        let mut fmt: Option<(u16, u16, u32, u16)> = None;
        let mut pos = 12;
        while pos + 8 <= bytes.len() {
            let id = &bytes[pos..pos + 4];
            let size = read_u32(bytes, pos + 4) as usize;
            let body = pos + 8;

            match id {
                b"fmt " => {
                    if size < 16 || body + 16 > bytes.len() {
                        return Err(MosaicError::DecodeFailure("truncated fmt chunk".into()));
                    }
                    fmt = Some((
                        read_u16(bytes, body),
                        read_u16(bytes, body + 2),
                        read_u32(bytes, body + 4),
                        read_u16(bytes, body + 14),
                    ));
                }
                b"data" => {
                    let (audio_format, channels, sample_rate, bits_per_sample) = fmt
                        .ok_or_else(|| {
                            MosaicError::DecodeFailure("data chunk before fmt chunk".into())
                        })?;
                    let data_len = size.min(bytes.len() - body);
                    return Ok(Self {
                        audio_format,
                        channels,
                        sample_rate,
                        bits_per_sample,
                        data_offset: body,
                        data_len,
                    });
                }
                _ => {}
            }

            // Chunks are word aligned.
            pos = body.saturating_add(size).saturating_add(size & 1);
        }

        Err(MosaicError::DecodeFailure("WAV has no data chunk".into()))
    }

    /// Mono, 16 kHz, 16-bit integer PCM.
    pub fn is_normalized(&self) -> bool {
        self.audio_format == PCM_FORMAT
            && self.channels == 1
            && self.sample_rate == TARGET_SAMPLE_RATE
            && self.bits_per_sample == 16
    }

    fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Wrap little-endian PCM16 sample data in a canonical 44-byte WAV header.
pub fn wav_from_pcm(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let block_align = channels * 2;
    let byte_rate = sample_rate * block_align as u32;
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + pcm.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

/// Encode PCM16 samples as a WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    wav_from_pcm(&pcm, sample_rate, channels)
}

/// A verified mono 16 kHz PCM16 WAV.
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    wav: Vec<u8>,
    header: WavHeader,
}

impl NormalizedAudio {
    /// Accept `wav` only if its header is already normalized.
    pub fn from_wav(wav: Vec<u8>) -> Result<Self> {
        let header = WavHeader::parse(&wav)?;
        if !header.is_normalized() {
            return Err(MosaicError::DecodeFailure(format!(
                "expected mono 16 kHz PCM16, got {} channel(s) at {} Hz, {} bit (format {})",
                header.channels, header.sample_rate, header.bits_per_sample, header.audio_format
            )));
        }
        Ok(Self { wav, header })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.wav
    }

    pub fn duration_seconds(&self) -> f64 {
        self.header.data_len as f64 / self.header.bytes_per_second() as f64
    }

    fn pcm(&self) -> &[u8] {
        &self.wav[self.header.data_offset..self.header.data_offset + self.header.data_len]
    }

    /// Split into standalone WAV files of at most `max_seconds` each.
    ///
    /// Audio that already fits comes back as a single segment.
    pub fn segments(&self, max_seconds: u32) -> Vec<Vec<u8>> {
        let window = (max_seconds.max(1) as usize) * self.header.bytes_per_second();
        if self.header.data_len <= window {
            return vec![self.wav.clone()];
        }

        self.pcm()
            .chunks(window)
            .map(|pcm| wav_from_pcm(pcm, self.header.sample_rate, self.header.channels))
            .collect()
    }
}

/// Converts arbitrary audio containers to [`NormalizedAudio`].
#[derive(Debug, Clone)]
pub struct AudioNormalizer {
    denoise: bool,
    noise_floor_db: f32,
    decode_timeout: Duration,
    denoise_timeout: Duration,
}

impl AudioNormalizer {
    pub fn new(settings: &IngestionSettings) -> Self {
        Self {
            denoise: settings.denoise,
            noise_floor_db: settings.noise_floor_db,
            decode_timeout: settings.timeouts.decode(),
            denoise_timeout: settings.timeouts.denoise(),
        }
    }

    pub fn with_denoise(mut self, enabled: bool) -> Self {
        self.denoise = enabled;
        self
    }

    /// Decode, resample and optionally denoise `bytes`.
    ///
    /// Input that is already mono 16 kHz PCM16 skips decoding. Denoising is
    /// best-effort: on failure the undenoised signal is kept.
    #[instrument(skip(self, bytes, scratch_dir), fields(bytes = bytes.len()))]
    pub async fn normalize(
        &self,
        bytes: &[u8],
        extension: &str,
        scratch_dir: &Path,
    ) -> Result<NormalizedAudio> {
        let work = tempfile::Builder::new()
            .prefix("audio-")
            .tempdir_in(scratch_dir)?;
        let normalized_path = work.path().join("normalized.wav");

        let already_normalized = WavHeader::parse(bytes)
            .map(|h| h.is_normalized())
            .unwrap_or(false);

        let wav = if already_normalized {
            debug!("Input already mono 16 kHz PCM16, skipping decode");
            bytes.to_vec()
        } else {
            let input = write_input(work.path(), "input", extension, bytes).await?;
            let rate = TARGET_SAMPLE_RATE.to_string();
            let args: Vec<&OsStr> = vec![
                OsStr::new("-i"), input.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-ac"), OsStr::new("1"),
                OsStr::new("-ar"), OsStr::new(&rate),
                OsStr::new("-c:a"), OsStr::new("pcm_s16le"),
                OsStr::new("-f"), OsStr::new("wav"),
                normalized_path.as_os_str(),
            ];
            within("decode", self.decode_timeout, run_ffmpeg(args)).await?;
            tokio::fs::read(&normalized_path).await?
        };

        let wav = if self.denoise {
            match self.denoise(&wav, work.path()).await {
                Ok(clean) => clean,
                Err(e) => {
                    warn!("Denoise failed, using undenoised audio: {}", e);
                    wav
                }
            }
        } else {
            wav
        };

        let audio = NormalizedAudio::from_wav(wav)?;
        info!(duration = audio.duration_seconds(), "Audio normalized");
        Ok(audio)
    }

    async fn denoise(&self, wav: &[u8], work: &Path) -> Result<Vec<u8>> {
        let noisy = work.join("pre-denoise.wav");
        let clean = work.join("denoised.wav");
        tokio::fs::write(&noisy, wav).await?;

        let filter = format!("afftdn=nf={}", self.noise_floor_db);
        let rate = TARGET_SAMPLE_RATE.to_string();
        let args: Vec<&OsStr> = vec![
            OsStr::new("-i"), noisy.as_os_str(),
            OsStr::new("-af"), OsStr::new(&filter),
            OsStr::new("-ac"), OsStr::new("1"),
            OsStr::new("-ar"), OsStr::new(&rate),
            OsStr::new("-c:a"), OsStr::new("pcm_s16le"),
            clean.as_os_str(),
        ];
        within("denoise", self.denoise_timeout, run_ffmpeg(args)).await?;

        let denoised = tokio::fs::read(&clean).await?;
        // A filter that produced something other than normalized PCM is a failure.
        NormalizedAudio::from_wav(denoised).map(NormalizedAudio::into_bytes)
    }
}
