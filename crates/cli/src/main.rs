mod args;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use engine::{Event, FileBlob, TimelineConfig, TimelineController, VideoFrame, VideoSource};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use args::Args;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity);

    let config = build_config(&args)?;
    let source = if args.as_blob {
        VideoSource::File(
            FileBlob::read(&args.input)
                .with_context(|| format!("read {}", args.input.display()))?,
        )
    } else {
        VideoSource::Path(args.input.clone())
    };

    let mut timeline = TimelineController::with_ffmpeg(config).context("create timeline")?;
    let frames = extract(&mut timeline, source)?;

    if let Some(range) = args.range {
        timeline.set_selected_range(range);
    }
    if let Some(seconds) = args.current_time {
        timeline.set_current_time(seconds);
    }
    timeline.render().context("render timeline")?;
    let surface = timeline.surface().context("timeline surface is gone")?;
    surface
        .pixels()
        .save(&args.output)
        .with_context(|| format!("write {}", args.output.display()))?;
    info!(output = %args.output.display(), "timeline written");

    if let Some(dir) = &args.frames_dir {
        write_frames(dir, &frames)?;
    }

    let range = timeline.selected_range();
    println!(
        "{} frames over {:.2}s, range {:.2}..{:.2}, wrote {}",
        frames.len(),
        timeline.duration(),
        range.start,
        range.end,
        args.output.display()
    );
    timeline.dispose();
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(args: &Args) -> Result<TimelineConfig> {
    let mut config = match &args.config {
        Some(path) => TimelineConfig::from_json_file(path)?,
        None => TimelineConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(interval) = args.frame_interval {
        config.frame_interval = interval;
    }
    if let Some(frame_height) = args.frame_height {
        config.frame_height = frame_height;
    }
    if let Some(pixel_ratio) = args.pixel_ratio {
        config.pixel_ratio = pixel_ratio;
    }
    if args.no_scale {
        config.show_scale = false;
    }
    config.validate()?;
    Ok(config)
}

fn extract<M, P>(
    timeline: &mut TimelineController<M, P>,
    source: VideoSource,
) -> Result<Vec<VideoFrame>>
where
    M: engine::MediaBackend,
    P: engine::PointerCapture,
{
    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .context("progress bar template")?
            .progress_chars("#>-"),
    );
    progress.set_message(source.display_name());

    let mut pending = timeline.load(source);
    loop {
        for event in pending.drain(..) {
            match event {
                Event::DurationChanged(duration) => {
                    info!(duration, "clip duration resolved");
                }
                Event::ExtractionProgress(percent) => progress.set_position(u64::from(percent)),
                Event::FramesExtracted(frames) => {
                    progress.finish_with_message("frames extracted");
                    return Ok(frames);
                }
                Event::Error(error) => {
                    progress.abandon_with_message("extraction failed");
                    bail!("{:?}: {}", error.kind, error.message);
                }
                _ => {}
            }
        }
        progress.tick();
        pending = timeline.wait(POLL_INTERVAL);
    }
}

fn write_frames(dir: &Path, frames: &[VideoFrame]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    for (index, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("frame_{index:03}_{:.2}s.jpg", frame.time));
        fs::write(&path, frame.image.encoded())
            .with_context(|| format!("write {}", path.display()))?;
    }
    info!(dir = %dir.display(), count = frames.len(), "frames written");
    Ok(())
}
