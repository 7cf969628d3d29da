//! canvas-tiles - Render a zoomable canvas viewport from multi-resolution tiles.
//!
//! This binary renders one viewport over several frames while a worker pool
//! produces procedural tiles, then writes the last frame as a PNG.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canvas_tiles::{
    config::Config,
    error::RenderError,
    producer::{PatternConfig, PatternProducer, ProductionWorker},
    pyramid::FrameReport,
    surface::RasterSurface,
    viewer::Viewer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<(), RenderError> {
    let scale = config.scale()?;
    let mut viewer = Viewer::new(config.viewer_config())?;

    info!("Configuration:");
    info!("  Scale: {} (canonical floor {})", scale, scale.floor_pow2());
    info!(
        "  Viewport: {}x{} at ({}, {})",
        config.viewport.width(),
        config.viewport.height(),
        config.viewport.x0,
        config.viewport.y0
    );
    info!(
        "  Cache: {} tiles, {}MB, {}px cells",
        config.cache_entries,
        config.cache_bytes / (1024 * 1024),
        config.tile_size
    );
    info!("  Workers: {}", config.workers);

    let producer = PatternProducer::new(PatternConfig {
        tint_by_scale: config.tint,
        latency: config.latency(),
        ..PatternConfig::default()
    });
    let worker = ProductionWorker::spawn(
        Arc::clone(viewer.cache()),
        Arc::new(producer),
        config.worker_config(),
    );

    let (width, height) = config.surface_size();
    let mut surface = RasterSurface::new(width, height);
    let mut reports: Vec<FrameReport> = Vec::new();

    for frame in 0..config.frames {
        surface.clear([0, 0, 0, 0]);
        let report = viewer.render(scale, config.viewport, &mut surface)?;
        info!(
            "  Frame {}: {} exact, {} borrowed, {} blank, {} requests",
            frame,
            report.tiles_drawn,
            report.cells_borrowed,
            report.cells_missing,
            report.requests.len()
        );

        let complete = report.is_complete();
        reports.push(report);
        if complete {
            break;
        }
        tokio::time::sleep(config.frame_interval()).await;
    }

    let stats = worker.shutdown().await;
    info!(
        "  Produced {} tiles ({} failed, {} discarded)",
        stats.produced, stats.failed, stats.discarded
    );

    surface.save_png(&config.output)?;
    info!("Wrote {}", config.output.display());

    if config.json {
        let json = serde_json::json!({
            "scale": scale,
            "frames": reports,
            "workers": stats,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    Ok(())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "canvas_tiles=debug"
    } else {
        "canvas_tiles=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
