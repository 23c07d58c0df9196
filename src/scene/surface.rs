//! Controller-side surface state

use serde::{Deserialize, Serialize};

use super::properties::{DoubleBuffered, EventMask, PixelFormat, PropertyRecord};
use super::Lifecycle;

/// What the layout backend knows about a surface's content buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl ContentInfo {
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A surface as seen by the controller
#[derive(Debug, Clone)]
pub struct Surface {
    id: u32,
    pub(crate) props: DoubleBuffered,
    pub(crate) content: Option<ContentInfo>,
    /// Layers whose current member list holds this surface
    pub(crate) layers: Vec<u32>,
    pub(crate) lifecycle: Lifecycle,
}

impl Surface {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            props: DoubleBuffered::new(PropertyRecord::default()),
            content: None,
            layers: Vec::new(),
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn current(&self) -> &PropertyRecord {
        self.props.current()
    }

    pub fn pending(&self) -> &PropertyRecord {
        self.props.pending()
    }

    pub fn pending_mask(&self) -> EventMask {
        self.props.mask()
    }

    /// `None` while no compositor surface backs this id
    pub fn content(&self) -> Option<&ContentInfo> {
        self.content.as_ref()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.content
            .map(|c| c.pixel_format)
            .unwrap_or(PixelFormat::Unknown)
    }

    pub fn layers(&self) -> &[u32] {
        &self.layers
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn props_mut(&mut self) -> &mut DoubleBuffered {
        &mut self.props
    }

    pub(crate) fn link_layer(&mut self, id_layer: u32) {
        if !self.layers.contains(&id_layer) {
            self.layers.push(id_layer);
        }
        self.props.mark(EventMask::RENDER_ORDER);
    }

    pub(crate) fn unlink_layer(&mut self, id_layer: u32) {
        let before = self.layers.len();
        self.layers.retain(|&l| l != id_layer);
        if self.layers.len() != before {
            self.props.mark(EventMask::RENDER_ORDER);
        }
    }
}
