//! # ivi-controller - layer management daemon
//!
//! Runs the controller over the headless layout and serves clients on a
//! Unix socket.

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use ivi_controller::scene::ContentInfo;
use ivi_controller::{HeadlessLayout, IpcServer, IviConfig, IviController};

#[derive(Parser)]
#[command(name = "ivi-controller")]
#[command(about = "Layer management controller for ivi-shell style compositors")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/ivi-controller/ivi.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Socket path, overrides the configuration
    #[arg(short, long)]
    socket: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration first, so its log level can seed the logger
    let loaded = IviConfig::load(&cli.config);

    let default_filter = match (&loaded, cli.debug) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.general.log_level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    info!("🚀 Starting ivi-controller");
    info!(
        "📄 Version: {} ({}, built {})",
        ivi_controller::VERSION,
        env!("GIT_COMMIT"),
        env!("BUILD_DATE")
    );

    let mut config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            IviConfig::default()
        }
    };

    if let Some(socket) = cli.socket {
        config.controller.socket_path = socket;
    }

    let mut layout = HeadlessLayout::new(config.screen_infos());
    let mut surfaces = Vec::new();
    for surface in &config.headless.surfaces {
        let content = ContentInfo::new(surface.width, surface.height, surface.pixel_format);
        layout.add_surface(surface.id, content, surface.pid, &surface.process_name);
        surfaces.push((surface.id, content));
    }

    let mut controller = IviController::new(layout, &config.controller);
    for (id, content) in surfaces {
        controller.surface_content_available(id, content);
    }

    let server = IpcServer::bind(config.controller.socket_path())?;

    tokio::select! {
        result = server.serve(controller) => {
            if let Err(e) = &result {
                error!("❌ IPC server failed: {:#}", e);
            }
            result
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("⚠️ Failed to listen for shutdown signal: {}", e);
            }
            info!("👋 Shutting down");
            Ok(())
        }
    }
}
