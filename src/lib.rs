//! # IVI Controller Library
//!
//! Layer management for ivi-shell style compositors: clients arrange
//! application surfaces into layers, layers onto screens, and commit the
//! whole arrangement atomically.
//!
//! ## Architecture
//!
//! - `scene`: surfaces, layers and screens with pending/current state
//! - `transform`: surface-to-screen transforms
//! - `controller`: bindings, request handling and event fan-out
//! - `protocol`: decoded requests and events
//! - `layout`: the compositor seam and the headless implementation
//! - `config`: configuration parsing and management
//! - `ipc`: JSON-lines transport over a Unix socket
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ivi_controller::{HeadlessLayout, IpcServer, IviConfig, IviController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IviConfig::default();
//!     let layout = HeadlessLayout::new(config.screen_infos());
//!     let controller = IviController::new(layout, &config.controller);
//!     IpcServer::bind(config.controller.socket_path())?
//!         .serve(controller)
//!         .await
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod ipc;
pub mod layout;
pub mod protocol;
pub mod scene;
pub mod transform;

// Re-export main types for easy access
pub use config::IviConfig;
pub use controller::IviController;
pub use error::ControllerError;
pub use ipc::IpcServer;
pub use layout::{HeadlessLayout, LayoutBackend};
pub use scene::Scene;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
