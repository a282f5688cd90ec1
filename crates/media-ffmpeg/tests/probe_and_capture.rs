use std::path::PathBuf;
use std::process::Command;

use media_ffmpeg::{MediaFfmpegError, capture_frame_at_seconds, probe_media};

fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    })
}

fn make_sample_video(name: &str) -> PathBuf {
    let output = std::env::temp_dir().join(format!(
        "cliprange-{name}-{}-{}.mp4",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock must be after unix epoch")
            .as_nanos()
    ));

    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=160x90:rate=30",
            "-t",
            "1.2",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&output)
        .output()
        .expect("ffmpeg should start");

    assert!(
        status.status.success(),
        "ffmpeg command must succeed: {}",
        String::from_utf8_lossy(&status.stderr)
    );
    output
}

#[test]
fn probe_media_reports_dimensions_and_duration() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }
    let sample = make_sample_video("probe");

    let info = probe_media(&sample).expect("probe should succeed");

    assert_eq!(info.video_dimensions(), Some((160, 90)));
    let duration = info.duration_seconds.expect("duration should be known");
    assert!((duration - 1.2).abs() < 0.1, "duration was {duration}");
    let rate = info
        .first_video()
        .and_then(|video| video.r_frame_rate)
        .expect("frame rate should be known");
    assert_eq!(rate.as_f64(), 30.0);

    let _ = std::fs::remove_file(sample);
}

#[test]
fn capture_scales_frame_to_requested_size() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }
    let sample = make_sample_video("capture");

    let frame = capture_frame_at_seconds(&sample, 0.5, 89, 50).expect("capture should succeed");

    assert_eq!((frame.width, frame.height), (89, 50));
    assert_eq!(frame.rgba.len(), 89 * 50 * 4);

    let _ = std::fs::remove_file(sample);
}

#[test]
fn capture_at_clip_end_falls_back_to_last_frame() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }
    let sample = make_sample_video("tail");
    let info = probe_media(&sample).expect("probe should succeed");
    let duration = info.duration_seconds.expect("duration should be known");

    let frame = capture_frame_at_seconds(&sample, duration - 0.01, 32, 18)
        .expect("tail capture should succeed");

    assert_eq!(frame.rgba.len(), 32 * 18 * 4);

    let _ = std::fs::remove_file(sample);
}

#[test]
fn probe_of_missing_file_is_a_command_failure() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }

    let error = probe_media("/definitely/not/here.mp4").expect_err("probe should fail");

    assert!(matches!(error, MediaFfmpegError::CommandFailed { .. }));
}
