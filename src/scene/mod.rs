//! Scene graph of surfaces, layers and screens
//!
//! The scene owns every controller-side entity, indexed by its protocol id.
//! Back-references (surface → layers, layer → screens) are stored as ids and
//! kept in sync by the commit pipeline.
//!
//! Requests only ever touch pending state. [`Scene::commit`] is the single
//! point where pending state becomes current:
//!
//! 1. surface property records
//! 2. layer property records and member-surface lists
//! 3. screen member-layer lists
//! 4. transforms of every (layer, surface) pair
//! 5. paint order of every screen
//!
//! and returns the per-object change masks the notification fan-out consumes.

pub mod layer;
pub mod properties;
pub mod render_order;
pub mod screen;
pub mod surface;

use log::{debug, warn};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{ControllerError, Result};
use crate::transform::{self, SurfaceTransform};

pub use layer::Layer;
pub use properties::{EventMask, Orientation, PixelFormat, PropertyRecord, Rectangle};
pub use render_order::RenderOrder;
pub use screen::{PaintEntry, Screen, ScreenInfo};
pub use surface::{ContentInfo, Surface};

/// Lifecycle of a surface.
///
/// Layers have no deferred state: they live until destroyed. Freed entities
/// are simply gone from the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Lifecycle {
    /// Backed by the compositor (or awaiting content), accepts new bindings
    Active,
    /// Content gone; kept alive for its bindings
    PendingRemoval,
}

/// Addressable scene entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SceneObject {
    Surface(u32),
    Layer(u32),
    Screen(u32),
}

/// Accumulated change mask of one object, produced by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub object: SceneObject,
    pub mask: EventMask,
}

/// Outcome of [`Scene::commit`]
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Objects with a non-empty change mask, surfaces first, then layers
    pub changes: Vec<Change>,
    /// Screens in id order; their paint order was rebuilt
    pub screens: Vec<u32>,
}

/// How new content relates to an existing surface entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAttach {
    /// No entry existed for the id
    Created,
    /// A placeholder received its first content
    Backed,
    /// A surface pending removal got content again
    Reattached,
    /// Content of an already backed surface changed
    Updated,
}

#[derive(Debug, Default)]
pub struct Scene {
    surfaces: BTreeMap<u32, Surface>,
    layers: BTreeMap<u32, Layer>,
    screens: BTreeMap<u32, Screen>,
    transforms: HashMap<(u32, u32), SurfaceTransform>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // === Lookup ===

    pub fn surface(&self, id: u32) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn layer(&self, id: u32) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn screen(&self, id: u32) -> Option<&Screen> {
        self.screens.get(&id)
    }

    pub fn surface_mut(&mut self, id: u32) -> Result<&mut Surface> {
        self.surfaces
            .get_mut(&id)
            .ok_or(ControllerError::NoSuchSurface(id))
    }

    pub fn layer_mut(&mut self, id: u32) -> Result<&mut Layer> {
        self.layers.get_mut(&id).ok_or(ControllerError::NoSuchLayer(id))
    }

    fn screen_mut(&mut self, id: u32) -> Result<&mut Screen> {
        self.screens
            .get_mut(&id)
            .ok_or(ControllerError::NoSuchScreen(id))
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn screens(&self) -> impl Iterator<Item = &Screen> {
        self.screens.values()
    }

    /// Transform committed for `id_surface` shown on `id_layer`
    pub fn transform(&self, id_layer: u32, id_surface: u32) -> Option<&SurfaceTransform> {
        self.transforms.get(&(id_layer, id_surface))
    }

    // === Queries mirrored from the layout interface ===

    pub fn layers_under_surface(&self, id_surface: u32) -> Result<&[u32]> {
        self.surface(id_surface)
            .map(Surface::layers)
            .ok_or(ControllerError::NoSuchSurface(id_surface))
    }

    pub fn screens_under_layer(&self, id_layer: u32) -> Result<&[u32]> {
        self.layer(id_layer)
            .map(Layer::screens)
            .ok_or(ControllerError::NoSuchLayer(id_layer))
    }

    pub fn surfaces_on_layer(&self, id_layer: u32) -> Result<&[u32]> {
        self.layer(id_layer)
            .map(Layer::current_surfaces)
            .ok_or(ControllerError::NoSuchLayer(id_layer))
    }

    pub fn layers_on_screen(&self, id_screen: u32) -> Result<&[u32]> {
        self.screen(id_screen)
            .map(Screen::current_layers)
            .ok_or(ControllerError::NoSuchScreen(id_screen))
    }

    // === Entity lifecycle ===

    /// Registers an output. Returns `false` if the id is already known.
    pub fn add_screen(&mut self, info: ScreenInfo) -> bool {
        if self.screens.contains_key(&info.id) {
            return false;
        }
        debug!("Added screen {} ({}x{})", info.id, info.width, info.height);
        self.screens.insert(info.id, Screen::new(info));
        true
    }

    /// Creates a placeholder surface awaiting content.
    ///
    /// Returns `false` if the id is already in use.
    pub fn create_surface(&mut self, id: u32) -> bool {
        if self.surfaces.contains_key(&id) {
            return false;
        }
        debug!("Created surface {}", id);
        self.surfaces.insert(id, Surface::new(id));
        true
    }

    /// Records that the compositor backs `id` with content.
    pub fn attach_content(&mut self, id: u32, content: ContentInfo) -> SurfaceAttach {
        let surface = match self.surfaces.entry(id) {
            Entry::Vacant(slot) => {
                let mut surface = Surface::new(id);
                surface.content = Some(content);
                surface
                    .props
                    .mark(EventMask::PIXEL_FORMAT | EventMask::CONFIGURATION);
                slot.insert(surface);
                return SurfaceAttach::Created;
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let attach = match (surface.content, surface.lifecycle) {
            (None, Lifecycle::PendingRemoval) => SurfaceAttach::Reattached,
            (None, Lifecycle::Active) => SurfaceAttach::Backed,
            (Some(_), _) => SurfaceAttach::Updated,
        };

        let previous = surface.content.replace(content);
        if previous.map(|c| c.pixel_format) != Some(content.pixel_format) {
            surface.props.mark(EventMask::PIXEL_FORMAT);
        }
        if previous.map(|c| c.size()) != Some(content.size()) {
            surface.props.mark(EventMask::CONFIGURATION);
        }
        surface.lifecycle = Lifecycle::Active;
        attach
    }

    /// Records a content size change reported by the compositor.
    pub fn configure_content(&mut self, id: u32, width: u32, height: u32) -> Result<()> {
        let surface = self.surface_mut(id)?;
        match surface.content.as_mut() {
            Some(content) => {
                if content.size() != (width, height) {
                    content.width = width;
                    content.height = height;
                    surface.props.mark(EventMask::CONFIGURATION);
                }
            }
            None => {
                warn!("Configure for surface {} without content ignored", id);
            }
        }
        Ok(())
    }

    /// Drops the content of `id` and detaches it from every layer.
    ///
    /// The surface itself stays in the scene in `PendingRemoval`.
    pub fn detach_content(&mut self, id: u32) -> Result<()> {
        let surface = self.surface_mut(id)?;
        surface.content = None;
        surface.lifecycle = Lifecycle::PendingRemoval;
        self.unlink_surface_everywhere(id);
        Ok(())
    }

    /// Removes a surface entry for good.
    pub fn remove_surface(&mut self, id: u32) -> Option<Surface> {
        if !self.surfaces.contains_key(&id) {
            return None;
        }
        self.unlink_surface_everywhere(id);
        debug!("Removed surface {}", id);
        self.surfaces.remove(&id)
    }

    fn unlink_surface_everywhere(&mut self, id: u32) {
        for layer in self.layers.values_mut() {
            let listed = layer.pending_surfaces.remove(id).is_some();
            let shown = layer.current_surfaces.remove(id).is_some();
            if listed || shown {
                debug!("Surface {} dropped from layer {}", id, layer.id());
            }
        }
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.layers.clear();
        }
        self.transforms.retain(|&(_, s), _| s != id);
    }

    /// Creates a layer. Returns `false` if the id is already in use.
    pub fn create_layer(&mut self, id: u32, width: u32, height: u32) -> bool {
        if self.layers.contains_key(&id) {
            return false;
        }
        debug!("Created layer {} ({}x{})", id, width, height);
        self.layers.insert(id, Layer::new(id, width, height));
        true
    }

    /// Removes a layer from every screen and unlinks its surfaces.
    pub fn remove_layer(&mut self, id: u32) -> Option<Layer> {
        let layer = self.layers.remove(&id)?;

        for screen in self.screens.values_mut() {
            screen.pending_layers.remove(id);
            screen.current_layers.remove(id);
        }
        for id_surface in layer.current_surfaces.iter() {
            if let Some(surface) = self.surfaces.get_mut(&id_surface) {
                surface.unlink_layer(id);
            }
        }
        self.transforms.retain(|&(l, _), _| l != id);

        debug!("Removed layer {}", id);
        Some(layer)
    }

    // === Render order (pending) ===

    pub fn layer_add_surface(&mut self, id_layer: u32, id_surface: u32) -> Result<()> {
        if !self.surfaces.contains_key(&id_surface) {
            return Err(ControllerError::NoSuchSurface(id_surface));
        }
        self.layer_mut(id_layer)?.add_surface(id_surface);
        Ok(())
    }

    pub fn layer_remove_surface(&mut self, id_layer: u32, id_surface: u32) -> Result<()> {
        self.layer_mut(id_layer)?.remove_surface(id_surface);
        Ok(())
    }

    pub fn layer_clear_surfaces(&mut self, id_layer: u32) -> Result<()> {
        self.layer_mut(id_layer)?.set_surfaces(RenderOrder::new());
        Ok(())
    }

    /// Replaces the pending member list of a layer.
    ///
    /// Unknown ids and surfaces pending removal are skipped and returned;
    /// duplicates keep their first position.
    pub fn layer_set_render_order(&mut self, id_layer: u32, ids: &[u32]) -> Result<Vec<u32>> {
        let (known, unknown): (Vec<u32>, Vec<u32>) =
            ids.iter().copied().partition(|id| {
                self.surfaces
                    .get(id)
                    .is_some_and(|s| s.lifecycle == Lifecycle::Active)
            });
        self.layer_mut(id_layer)?
            .set_surfaces(RenderOrder::from_ids(known));
        Ok(unknown)
    }

    pub fn screen_add_layer(&mut self, id_screen: u32, id_layer: u32) -> Result<()> {
        if !self.layers.contains_key(&id_layer) {
            return Err(ControllerError::NoSuchLayer(id_layer));
        }
        self.screen_mut(id_screen)?.add_layer(id_layer);
        Ok(())
    }

    pub fn screen_clear(&mut self, id_screen: u32) -> Result<()> {
        self.screen_mut(id_screen)?.set_layers(RenderOrder::new());
        Ok(())
    }

    /// Replaces the pending layer list of a screen, like
    /// [`layer_set_render_order`](Self::layer_set_render_order).
    pub fn screen_set_render_order(&mut self, id_screen: u32, ids: &[u32]) -> Result<Vec<u32>> {
        let (known, unknown): (Vec<u32>, Vec<u32>) = ids
            .iter()
            .copied()
            .partition(|id| self.layers.contains_key(id));
        self.screen_mut(id_screen)?
            .set_layers(RenderOrder::from_ids(known));
        Ok(unknown)
    }

    // === Commit ===

    /// Promotes all pending state to current.
    pub fn commit(&mut self) -> CommitReport {
        for surface in self.surfaces.values_mut() {
            surface.props.commit();
        }

        for layer in self.layers.values_mut() {
            layer.props.commit();
            if !layer.props.mask().contains(EventMask::RENDER_ORDER) {
                continue;
            }

            let removed: Vec<u32> = layer
                .current_surfaces
                .missing_from(&layer.pending_surfaces)
                .collect();
            let added: Vec<u32> = layer
                .pending_surfaces
                .missing_from(&layer.current_surfaces)
                .collect();
            layer.current_surfaces = layer.pending_surfaces.clone();

            for id_surface in removed {
                if let Some(surface) = self.surfaces.get_mut(&id_surface) {
                    surface.unlink_layer(layer.id());
                }
            }
            for id_surface in added {
                if let Some(surface) = self.surfaces.get_mut(&id_surface) {
                    surface.link_layer(layer.id());
                }
            }
        }

        for screen in self.screens.values_mut() {
            if !screen.mask.contains(EventMask::RENDER_ORDER) {
                continue;
            }

            let removed: Vec<u32> = screen
                .current_layers
                .missing_from(&screen.pending_layers)
                .collect();
            let added: Vec<u32> = screen
                .pending_layers
                .missing_from(&screen.current_layers)
                .collect();
            screen.current_layers = screen.pending_layers.clone();

            for id_layer in removed {
                if let Some(layer) = self.layers.get_mut(&id_layer) {
                    layer.unlink_screen(screen.id());
                }
            }
            for id_layer in added {
                if let Some(layer) = self.layers.get_mut(&id_layer) {
                    layer.link_screen(screen.id());
                }
            }
        }

        self.update_transforms();
        let screens = self.resolve_paint_orders();

        let mut changes = Vec::new();
        for surface in self.surfaces.values_mut() {
            let mask = surface.props.take_mask();
            if !mask.is_empty() {
                changes.push(Change {
                    object: SceneObject::Surface(surface.id()),
                    mask,
                });
            }
        }
        for layer in self.layers.values_mut() {
            let mask = layer.props.take_mask();
            if !mask.is_empty() {
                changes.push(Change {
                    object: SceneObject::Layer(layer.id()),
                    mask,
                });
            }
        }
        for screen in self.screens.values_mut() {
            let mask = std::mem::take(&mut screen.mask);
            if !mask.is_empty() {
                changes.push(Change {
                    object: SceneObject::Screen(screen.id()),
                    mask,
                });
            }
        }

        debug!("Commit produced {} change(s)", changes.len());
        CommitReport { changes, screens }
    }

    /// Recomputes the transform of every current (layer, surface) pair.
    ///
    /// Pairs whose content size is unknown keep their previous transform.
    fn update_transforms(&mut self) {
        let mut live = HashSet::new();

        for layer in self.layers.values() {
            for id_surface in layer.current_surfaces.iter() {
                let Some(surface) = self.surfaces.get(&id_surface) else {
                    continue;
                };
                live.insert((layer.id(), id_surface));

                let size = surface.content.map(|c| c.size()).unwrap_or((0, 0));
                match transform::compute(layer.current(), surface.current(), size) {
                    Some(t) => {
                        self.transforms.insert((layer.id(), id_surface), t);
                    }
                    None => debug!(
                        "Content size of surface {} unknown, transform not updated",
                        id_surface
                    ),
                }
            }
        }

        self.transforms.retain(|key, _| live.contains(key));
    }

    /// Rebuilds each screen's back-to-front paint order from current state.
    ///
    /// Invisible layers and surfaces, surfaces without content and pairs
    /// without a transform are left out.
    pub fn resolve_paint_orders(&mut self) -> Vec<u32> {
        for screen in self.screens.values_mut() {
            let mut entries = Vec::new();

            for id_layer in screen.current_layers.iter() {
                let Some(layer) = self.layers.get(&id_layer) else {
                    continue;
                };
                if !layer.current().visibility {
                    continue;
                }

                for id_surface in layer.current_surfaces.iter() {
                    let Some(surface) = self.surfaces.get(&id_surface) else {
                        continue;
                    };
                    if !surface.current().visibility || surface.content.is_none() {
                        continue;
                    }
                    let Some(transform) = self.transforms.get(&(id_layer, id_surface)) else {
                        continue;
                    };

                    entries.push(PaintEntry {
                        id_surface,
                        id_layer,
                        transform: *transform,
                        opacity: surface.current().opacity * layer.current().opacity,
                    });
                }
            }

            screen.paint_order = entries;
        }

        self.screens.keys().copied().collect()
    }
}
