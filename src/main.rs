//! Daily Portrait - main entry point for the GUI application.
//!
//! # Overview
//!
//! The binary initializes:
//! - Logging (daily rotating file, plus standard output with `--debug`)
//! - A tokio runtime for camera start-up, photo I/O and the encoder subprocess
//! - The settings store ([`ConfigStore`])
//! - The presenter and the Slint GUI controller ([`GuiController`])
//!
//! Threading model:
//! - **Main thread**: the Slint event loop and the presentation tick
//! - **Capture thread**: reads the camera and offers frames to a bounded channel
//! - **Tokio workers**: photo saving, counting, the encoder probe and encodes
//!
//! # Execution Flow
//!
//! 1. Parse the command line and resolve per-user paths
//! 2. Initialize logging under `<config dir>/logs`
//! 3. Create the tokio runtime
//! 4. Load settings and create the photos directory
//! 5. Start the presenter (camera, photo count, today check, encoder probe)
//! 6. Run the Slint event loop until the window is closed
//! 7. Stop capture, flush settings, shut the runtime down with a 5s timeout

use anyhow::{Context, Result};
use clap::Parser;
use daily_portrait::cli::Cli;
use daily_portrait::logging::{LOG_PREFIX, setup_logging};
use daily_portrait::services::photos::ensure_directory;
use daily_portrait::ui::{GuiController, Presenter};
use daily_portrait::{
    APP_NAME, AppPaths, ConfigStore, TimelapseOrchestrator, TimelapseService, VERSION,
};
use std::time::Duration;

const WORKER_THREADS: usize = 2;
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = AppPaths::discover()?;

    // Held until main returns so buffered log lines are flushed
    let _guard = setup_logging(&paths.log_dir, LOG_PREFIX, cli.debug)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::debug!("Paths: {:?}", paths);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("daily-portrait-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    tracing::info!(
        "Tokio runtime initialized with {} worker threads",
        WORKER_THREADS
    );

    let config = ConfigStore::load(
        &paths.config_file,
        &paths.default_photos_dir,
        runtime.handle().clone(),
    );

    let photos_directory = config.photos_directory();
    if let Err(e) = ensure_directory(&photos_directory) {
        tracing::error!("{}", e);
    }

    let orchestrator = TimelapseOrchestrator::new(TimelapseService::default());
    let mut presenter = Presenter::new(config, orchestrator, runtime.handle().clone());
    presenter.startup();

    let gui_controller = GuiController::new(presenter)?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed; capture is stopped and settings
    // flushed before it returns
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
