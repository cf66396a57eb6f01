//! Media processing through ffmpeg and ffprobe.
//!
//! The normalizer and the video decomposer write their input into a scratch
//! directory and shell out to ffmpeg; this module holds the shared process plumbing.

pub mod audio;
pub mod video;

pub use audio::{AudioNormalizer, NormalizedAudio, WavHeader};
pub use video::{frame_offsets, VideoDecomposer, VideoFrame, VideoParts};

use crate::error::{MosaicError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Sample rate of normalized audio.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Write `bytes` to `<dir>/<stem><extension>` so ffmpeg can sniff the container.
pub(crate) async fn write_input(
    dir: &Path,
    stem: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    let ext = extension.trim_start_matches('.');
    let path = if ext.is_empty() {
        dir.join(stem)
    } else {
        dir.join(format!("{}.{}", stem, ext))
    };
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Run ffmpeg with `args`, quiet and overwriting outputs.
///
/// A missing binary is [`MosaicError::ToolNotFound`]; a non-zero exit is a
/// [`MosaicError::DecodeFailure`] carrying ffmpeg's stderr.
pub(crate) async fn run_ffmpeg<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let result = Command::new("ffmpeg")
        .arg("-hide_banner")
        .arg("-nostdin")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(MosaicError::DecodeFailure(format!("ffmpeg failed: {}", err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MosaicError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(MosaicError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

async fn run_ffprobe(path: &Path, args: &[&str]) -> Result<serde_json::Value> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .args(args)
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MosaicError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => return Err(MosaicError::ToolFailed(format!("ffprobe failed: {e}"))),
    };

    if !output.status.success() {
        return Err(MosaicError::DecodeFailure(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|_| MosaicError::DecodeFailure("Invalid ffprobe output".into()))
}

/// Container duration in seconds.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let parsed = run_ffprobe(path, &["-show_format"]).await?;

    let duration = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MosaicError::DecodeFailure("Could not determine media duration".into()))?;

    debug!(path = %path.display(), duration, "Probed duration");
    Ok(duration)
}

/// Whether the container carries at least one audio stream.
pub async fn has_audio_stream(path: &Path) -> Result<bool> {
    let parsed = run_ffprobe(path, &["-show_streams", "-select_streams", "a"]).await?;

    Ok(parsed["streams"]
        .as_array()
        .is_some_and(|streams| !streams.is_empty()))
}

/// Check that ffmpeg and ffprobe can be launched.
pub async fn tools_available() -> Vec<(&'static str, bool)> {
    let mut found = Vec::new();
    for tool in ["ffmpeg", "ffprobe"] {
        let ok = Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        found.push((tool, ok));
    }
    found
}
