use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;
use parking_lot::Mutex;
use rfb_session::{event_loop, FramebufferStore, SessionHandle, ViewerConfig};
use rfbviewer::app::{AppControls, ViewerApp};
use rfbviewer::args::Args;
use rfbviewer::demo_session::{self, DemoConfig};
use rfbviewer::Viewer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn init_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rfbviewer={0},rfb_session={0},rfb_display={0},platform_input={0}",
                    log_level
                )
                .into()
            }),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".config/rfbviewer/config.toml"))
}

/// File configuration with command-line overrides applied.
fn load_config(args: &Args) -> Result<ViewerConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = match &path {
        Some(path) if path.exists() => {
            let config = ViewerConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        Some(path) if args.config.is_some() => {
            return Err(anyhow!("configuration file {} not found", path.display()));
        }
        _ => ViewerConfig::default(),
    };

    if let Some(zoom) = args.zoom {
        config.display.zoom_percent = zoom;
    }
    config.display.flash_updates |= args.flash_updates;
    config.input.read_only |= args.read_only;
    config.selector.point_mode |= args.point_mode;
    config.run.unattended |= args.unattended;
    if args.capture_dir.is_some() {
        config.run.capture_dir = args.capture_dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(args.verbose)?;

    info!("Starting rfbviewer {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    let (width, height) = args.geometry;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rfbviewer-worker")
        .build()
        .context("creating tokio runtime")?;

    let store = Arc::new(FramebufferStore::new(
        width,
        height,
        config.zoom()?,
        config.display.filter,
    ));
    let (session_tx, session_rx) = flume::unbounded();
    let (viewer_tx, viewer_rx) = flume::unbounded();
    let (command_tx, command_rx) = flume::unbounded();

    {
        let _guard = runtime.enter();
        demo_session::spawn(
            DemoConfig {
                width,
                height,
                ..DemoConfig::default()
            },
            session_tx,
            command_rx,
        );
        event_loop::spawn(store.clone(), session_rx, viewer_tx);
    }

    let session = SessionHandle::new(command_tx, store.clone());
    let (controls, host_requests) = AppControls::new();
    let viewer = Viewer::new(&config, store, viewer_rx, Arc::new(session.clone()), controls)?;

    let failure = Arc::new(Mutex::new(None));
    let app = ViewerApp::new(
        viewer,
        session,
        host_requests,
        config.run.capture_dir.clone(),
        config.run.unattended,
        failure.clone(),
        runtime,
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 800.0])
            .with_min_inner_size([320.0, 240.0]),
        vsync: true,
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    info!("Launching GUI");
    if let Err(e) = eframe::run_native(
        "Remote Framebuffer Viewer",
        options,
        Box::new(move |_cc| Box::new(app)),
    ) {
        warn!("Application exited with error: {}", e);
        return Err(anyhow!("{}", e));
    }

    if let Some(message) = failure.lock().take() {
        return Err(anyhow!("unattended run failed: {}", message));
    }
    info!("Application exited normally");
    Ok(())
}
