//! Layout backend interface
//!
//! The controller never talks to a renderer directly. Everything it needs
//! from the compositor goes through [`LayoutBackend`]: output enumeration,
//! per-surface statistics, the resolved paint order, repaint scheduling and
//! screenshots. Compositor-side events (surface content appearing, being
//! resized or disappearing) flow the other way, as calls on
//! [`IviController`](crate::controller::IviController).
//!
//! [`HeadlessLayout`] is the in-process implementation used by the daemon
//! and by tests.

pub mod headless;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scene::{PaintEntry, ScreenInfo};

pub use headless::HeadlessLayout;

/// Errors reported by a layout backend
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Nothing to capture: {0}")]
    NothingToCapture(String),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode screenshot: {0}")]
    Encoding(#[from] png::EncodingError),
}

impl LayoutError {
    /// Whether the failure stems from writing the output file
    pub fn is_file_error(&self) -> bool {
        matches!(self, LayoutError::Io { .. } | LayoutError::Encoding(_))
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        LayoutError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Counters reported by `send_stats`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceStats {
    pub redraw_count: u32,
    pub frame_count: u32,
    pub update_count: u32,
    pub pid: u32,
    pub process_name: String,
}

/// The compositor side of the controller.
pub trait LayoutBackend {
    /// Outputs available at start-up
    fn screens(&self) -> Vec<ScreenInfo>;

    /// Statistics of a backed surface, `None` if the compositor has none
    fn surface_stats(&self, id_surface: u32) -> Option<SurfaceStats>;

    /// Receives the back-to-front paint order of one screen
    fn apply_paint_order(&mut self, id_screen: u32, entries: &[PaintEntry]);

    /// Destroys the compositor object behind a surface
    fn destroy_surface(&mut self, id_surface: u32);

    /// Requests one repaint of all outputs
    fn schedule_repaint(&mut self);

    fn dump_surface(&mut self, id_surface: u32, path: &Path) -> Result<(), LayoutError>;

    fn dump_layer(&mut self, id_layer: u32, path: &Path) -> Result<(), LayoutError>;

    fn dump_screen(&mut self, id_screen: u32, path: &Path) -> Result<(), LayoutError>;
}
