//! Controller-side screen state

use serde::{Deserialize, Serialize};

use super::properties::EventMask;
use super::render_order::RenderOrder;
use crate::transform::SurfaceTransform;

/// Physical output description reported by the layout backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// One entry of a screen's resolved paint order
#[derive(Debug, Clone, PartialEq)]
pub struct PaintEntry {
    pub id_surface: u32,
    pub id_layer: u32,
    pub transform: SurfaceTransform,
    /// Surface opacity multiplied by layer opacity
    pub opacity: f64,
}

/// A physical display with its ordered layers
#[derive(Debug, Clone)]
pub struct Screen {
    info: ScreenInfo,
    pub(crate) pending_layers: RenderOrder,
    pub(crate) current_layers: RenderOrder,
    pub(crate) mask: EventMask,
    pub(crate) paint_order: Vec<PaintEntry>,
}

impl Screen {
    pub(crate) fn new(info: ScreenInfo) -> Self {
        Self {
            info,
            pending_layers: RenderOrder::new(),
            current_layers: RenderOrder::new(),
            mask: EventMask::NONE,
            paint_order: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.info.id
    }

    pub fn info(&self) -> &ScreenInfo {
        &self.info
    }

    pub fn current_layers(&self) -> &[u32] {
        self.current_layers.ids()
    }

    pub fn pending_layers(&self) -> &[u32] {
        self.pending_layers.ids()
    }

    /// Back-to-front entries produced by the last commit
    pub fn paint_order(&self) -> &[PaintEntry] {
        &self.paint_order
    }

    pub(crate) fn add_layer(&mut self, id_layer: u32) {
        self.pending_layers.push(id_layer);
        self.mask |= EventMask::RENDER_ORDER;
    }

    pub(crate) fn set_layers(&mut self, order: RenderOrder) {
        self.pending_layers = order;
        self.mask |= EventMask::RENDER_ORDER;
    }
}
