use std::ffi::OsStr;
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};
use crate::probe::command_for_display;

/// A single captured video frame in RGBA format, already scaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Captures one frame at `at_seconds`, scaled to exactly `width`x`height`.
///
/// Seeks past the last decodable frame (the tail end of a clip) fall back to
/// the final frame of the last second.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::capture_frame_at_seconds;
///
/// let frame = capture_frame_at_seconds("sample.mp4", 0.5, 89, 50)
///     .expect("capture should succeed");
/// assert_eq!(frame.rgba.len(), 89 * 50 * 4);
/// ```
pub fn capture_frame_at_seconds(
    input: impl AsRef<OsStr>,
    at_seconds: f64,
    width: u32,
    height: u32,
) -> Result<CapturedFrame> {
    if !at_seconds.is_finite() || at_seconds < 0.0 {
        return Err(MediaFfmpegError::InvalidTimestampSeconds(at_seconds));
    }
    if width == 0 || height == 0 {
        return Err(MediaFfmpegError::InvalidFrameSize { width, height });
    }

    let input = input.as_ref();
    let frame_size = width as usize * height as usize * 4;
    let seek = format!("{at_seconds:.3}");

    let mut rgba = run_rawvideo_capture(input, ["-ss", seek.as_str()], width, height, Some(1))?;
    if rgba.is_empty() {
        rgba = run_rawvideo_capture(input, ["-sseof", "-1"], width, height, None)?;
        if rgba.len() > frame_size {
            rgba.drain(..last_frame_offset(rgba.len(), frame_size));
        }
    }

    if rgba.is_empty() {
        return Err(MediaFfmpegError::NoFrameDecoded {
            input: input.to_string_lossy().into_owned(),
            at_seconds,
        });
    }
    if rgba.len() != frame_size {
        return Err(MediaFfmpegError::Parse {
            context: "captured rgba size",
            value: format!("expected {frame_size} bytes, got {}", rgba.len()),
        });
    }

    Ok(CapturedFrame {
        width,
        height,
        rgba,
    })
}

fn run_rawvideo_capture(
    input: &OsStr,
    seek_args: [&str; 2],
    width: u32,
    height: u32,
    max_frames: Option<u32>,
) -> Result<Vec<u8>> {
    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error"])
        .args(seek_args)
        .arg("-i")
        .arg(input)
        .arg("-an")
        .arg("-vf")
        .arg(format!("scale={width}:{height}"));
    if let Some(frames) = max_frames {
        command.arg("-frames:v").arg(frames.to_string());
    }
    let output = command
        .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"])
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffmpeg frame capture",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: command_for_display("ffmpeg frame capture", input),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}

fn last_frame_offset(len: usize, frame_size: usize) -> usize {
    let whole_frames = len / frame_size;
    whole_frames.saturating_sub(1) * frame_size
}
