//! Controller-side layer state

use super::properties::{DoubleBuffered, EventMask, PropertyRecord};
use super::render_order::RenderOrder;

/// An ordered, transformed group of surfaces
#[derive(Debug, Clone)]
pub struct Layer {
    id: u32,
    width: u32,
    height: u32,
    pub(crate) props: DoubleBuffered,
    pub(crate) pending_surfaces: RenderOrder,
    pub(crate) current_surfaces: RenderOrder,
    /// Screens whose current member list holds this layer
    pub(crate) screens: Vec<u32>,
}

impl Layer {
    pub(crate) fn new(id: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            props: DoubleBuffered::new(PropertyRecord::with_size(width, height)),
            pending_surfaces: RenderOrder::new(),
            current_surfaces: RenderOrder::new(),
            screens: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Size the layer was created with
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
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

    pub fn current_surfaces(&self) -> &[u32] {
        self.current_surfaces.ids()
    }

    pub fn pending_surfaces(&self) -> &[u32] {
        self.pending_surfaces.ids()
    }

    pub fn screens(&self) -> &[u32] {
        &self.screens
    }

    pub fn props_mut(&mut self) -> &mut DoubleBuffered {
        &mut self.props
    }

    pub(crate) fn add_surface(&mut self, id_surface: u32) {
        self.pending_surfaces.push(id_surface);
        self.props.mark(EventMask::RENDER_ORDER);
    }

    pub(crate) fn remove_surface(&mut self, id_surface: u32) {
        self.pending_surfaces.remove(id_surface);
        self.props.mark(EventMask::RENDER_ORDER);
    }

    pub(crate) fn set_surfaces(&mut self, order: RenderOrder) {
        self.pending_surfaces = order;
        self.props.mark(EventMask::RENDER_ORDER);
    }

    pub(crate) fn link_screen(&mut self, id_screen: u32) {
        if !self.screens.contains(&id_screen) {
            self.screens.push(id_screen);
        }
        self.props.mark(EventMask::RENDER_ORDER);
    }

    pub(crate) fn unlink_screen(&mut self, id_screen: u32) {
        let before = self.screens.len();
        self.screens.retain(|&s| s != id_screen);
        if self.screens.len() != before {
            self.props.mark(EventMask::RENDER_ORDER);
        }
    }
}
