//! Drives a preview session with synthetic frames and reports throughput.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use deltaview::frame::synthetic::{ChromaLayout, SyntheticSource};
use deltaview::preview::sink::scale_to_fit;
use deltaview::{DisplaySink, PipelineConfig, PreviewSession, Raster, RasterBuffer, SourceFrame};

#[derive(Debug, Parser)]
#[command(name = "deltaview-probe", about = "Run the frame-delta pipeline on synthetic video")]
struct Args {
    /// Frame width in pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Number of frames to generate.
    #[arg(long, default_value_t = 300)]
    frames: u64,

    /// Source frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Rotation hint attached to every frame (0, 90, 180 or 270).
    #[arg(long, default_value_t = 0)]
    rotation: i32,

    /// Extra bytes at the end of every plane row.
    #[arg(long, default_value_t = 0)]
    padding: usize,

    /// Deliver chroma as one interleaved buffer (pixel stride 2).
    #[arg(long)]
    semi_planar: bool,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Downscale the last delta to fit this many pixels per side.
    #[arg(long, default_value_t = 160)]
    preview_size: u32,
}

/// Logs FPS readings and keeps the latest raster.
struct ProbeSink {
    buffer: RasterBuffer,
}

impl DisplaySink for ProbeSink {
    fn present(&self, raster: Raster) {
        self.buffer.present(raster);
    }

    fn report_fps(&self, fps: u32) {
        log::info!("pipeline fps: {fps}");
        self.buffer.report_fps(fps);
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => match PipelineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };
    log::info!("{}x{} @ {} fps, config {config:?}", args.width, args.height, args.fps);

    let layout = if args.semi_planar {
        ChromaLayout::SemiPlanar
    } else {
        ChromaLayout::Planar
    };
    let mut source = SyntheticSource::new(args.width, args.height)
        .with_row_padding(args.padding)
        .with_layout(layout);

    let sink = Arc::new(ProbeSink {
        buffer: RasterBuffer::new(1),
    });
    let mut session = PreviewSession::start(config, sink.clone());

    let interval = Duration::from_secs(1) / args.fps.max(1);
    let started = Instant::now();
    let mut due = started;
    for _ in 0..args.frames {
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
        due += interval;
        session.submit(SourceFrame {
            frame: source.next_frame(),
            rotation_degrees: args.rotation,
            timestamp_ms: started.elapsed().as_millis() as u64,
        });
    }
    // let the worker drain the last frame
    std::thread::sleep(interval * 2);
    session.stop();

    if let Some(latest) = sink.buffer.latest() {
        let raster = Raster::clone(&latest);
        match scale_to_fit(raster, args.preview_size, args.preview_size) {
            Ok(preview) => {
                let moving = preview.pixels().iter().filter(|px| px.r | px.g | px.b != 0).count();
                log::info!(
                    "last delta {}x{} (preview {}x{}, {moving} changed pixels)",
                    latest.width(),
                    latest.height(),
                    preview.width(),
                    preview.height()
                );
            }
            Err(e) => log::warn!("preview scaling failed: {e}"),
        }
    }

    match serde_json::to_string_pretty(&session.diagnostics()) {
        Ok(json) => println!("{json}"),
        Err(e) => log::warn!("failed to serialise diagnostics: {e}"),
    }
    ExitCode::SUCCESS
}
