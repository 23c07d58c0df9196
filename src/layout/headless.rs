//! In-process layout backend without a GPU
//!
//! `HeadlessLayout` keeps the resolved paint order of every output, counts
//! repaint requests and frame statistics, and produces screenshots with a
//! flat-colour software composite of the painted surfaces.

use cgmath::{Point3, Transform};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::{LayoutBackend, LayoutError, SurfaceStats};
use crate::scene::{ContentInfo, PaintEntry, ScreenInfo};

#[derive(Debug, Clone)]
struct HeadlessSurface {
    content: ContentInfo,
    stats: SurfaceStats,
}

/// Layout backend that composites nothing but remembers everything
#[derive(Debug, Default)]
pub struct HeadlessLayout {
    screens: Vec<ScreenInfo>,
    surfaces: BTreeMap<u32, HeadlessSurface>,
    paint_orders: HashMap<u32, Vec<PaintEntry>>,
    destroyed: Vec<u32>,
    repaint_requests: u64,
}

impl HeadlessLayout {
    pub fn new(screens: Vec<ScreenInfo>) -> Self {
        Self {
            screens,
            ..Self::default()
        }
    }

    /// Registers client content; the caller forwards it to the controller.
    pub fn add_surface(&mut self, id_surface: u32, content: ContentInfo, pid: u32, process_name: &str) {
        let stats = SurfaceStats {
            pid,
            process_name: process_name.to_string(),
            ..SurfaceStats::default()
        };
        self.surfaces
            .insert(id_surface, HeadlessSurface { content, stats });
    }

    pub fn remove_surface(&mut self, id_surface: u32) -> bool {
        self.surfaces.remove(&id_surface).is_some()
    }

    /// Resizes client content; returns `false` for unknown ids.
    pub fn resize_surface(&mut self, id_surface: u32, width: u32, height: u32) -> bool {
        match self.surfaces.get_mut(&id_surface) {
            Some(surface) => {
                surface.content.width = width;
                surface.content.height = height;
                surface.stats.update_count += 1;
                true
            }
            None => false,
        }
    }

    pub fn content(&self, id_surface: u32) -> Option<ContentInfo> {
        self.surfaces.get(&id_surface).map(|s| s.content)
    }

    pub fn paint_order(&self, id_screen: u32) -> &[PaintEntry] {
        self.paint_orders
            .get(&id_screen)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn repaint_requests(&self) -> u64 {
        self.repaint_requests
    }

    pub fn destroyed_surfaces(&self) -> &[u32] {
        &self.destroyed
    }

    fn screen_info(&self, id_screen: u32) -> Option<&ScreenInfo> {
        self.screens.iter().find(|s| s.id == id_screen)
    }

    /// Draws `entries` onto a `width` x `height` RGBA canvas.
    fn composite<'a, I>(&self, width: u32, height: u32, entries: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a PaintEntry>,
    {
        let mut canvas = vec![0u8; (width as usize) * (height as usize) * 4];

        for entry in entries {
            let Some(surface) = self.surfaces.get(&entry.id_surface) else {
                continue;
            };
            let (w, h) = (surface.content.width as f32, surface.content.height as f32);
            let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
                .map(|(x, y)| entry.transform.matrix.transform_point(Point3::new(x, y, 0.0)));

            let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).max(0.0);
            let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).max(0.0);
            let max_x = corners
                .iter()
                .map(|p| p.x)
                .fold(f32::NEG_INFINITY, f32::max)
                .min(width as f32);
            let max_y = corners
                .iter()
                .map(|p| p.y)
                .fold(f32::NEG_INFINITY, f32::max)
                .min(height as f32);

            let color = surface_color(entry.id_surface);
            let alpha = entry.opacity.clamp(0.0, 1.0) as f32;

            for y in (min_y as u32)..(max_y.ceil() as u32).min(height) {
                for x in (min_x as u32)..(max_x.ceil() as u32).min(width) {
                    let i = ((y * width + x) * 4) as usize;
                    for c in 0..3 {
                        let dst = canvas[i + c] as f32;
                        canvas[i + c] = (color[c] as f32 * alpha + dst * (1.0 - alpha)) as u8;
                    }
                    canvas[i + 3] = 255;
                }
            }
        }

        canvas
    }
}

/// Stable flat colour per surface id
fn surface_color(id_surface: u32) -> [u8; 3] {
    [
        (id_surface.wrapping_mul(67) % 256) as u8,
        (id_surface.wrapping_mul(131) % 256) as u8,
        (id_surface.wrapping_mul(29) % 256) as u8,
    ]
}

fn write_png(path: &Path, width: u32, height: u32, data: &[u8]) -> Result<(), LayoutError> {
    let file = File::create(path).map_err(|e| LayoutError::io(path, e))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;
    writer.finish()?;

    info!("Saved screenshot: {}", path.display());
    Ok(())
}

impl LayoutBackend for HeadlessLayout {
    fn screens(&self) -> Vec<ScreenInfo> {
        self.screens.clone()
    }

    fn surface_stats(&self, id_surface: u32) -> Option<SurfaceStats> {
        self.surfaces.get(&id_surface).map(|s| s.stats.clone())
    }

    fn apply_paint_order(&mut self, id_screen: u32, entries: &[PaintEntry]) {
        debug!(
            "Screen {} paint order: {:?}",
            id_screen,
            entries.iter().map(|e| e.id_surface).collect::<Vec<_>>()
        );
        for entry in entries {
            if let Some(surface) = self.surfaces.get_mut(&entry.id_surface) {
                surface.stats.update_count += 1;
            }
        }
        self.paint_orders.insert(id_screen, entries.to_vec());
    }

    fn destroy_surface(&mut self, id_surface: u32) {
        self.surfaces.remove(&id_surface);
        for entries in self.paint_orders.values_mut() {
            entries.retain(|e| e.id_surface != id_surface);
        }
        self.destroyed.push(id_surface);
    }

    fn schedule_repaint(&mut self) {
        self.repaint_requests += 1;

        let painted: Vec<u32> = self
            .paint_orders
            .values()
            .flatten()
            .map(|e| e.id_surface)
            .collect();
        for id_surface in painted {
            if let Some(surface) = self.surfaces.get_mut(&id_surface) {
                surface.stats.redraw_count += 1;
                surface.stats.frame_count += 1;
            }
        }
    }

    fn dump_surface(&mut self, id_surface: u32, path: &Path) -> Result<(), LayoutError> {
        let surface = self
            .surfaces
            .get(&id_surface)
            .ok_or_else(|| LayoutError::NothingToCapture(format!("surface {}", id_surface)))?;
        let (width, height) = surface.content.size();
        if width == 0 || height == 0 {
            return Err(LayoutError::NothingToCapture(format!(
                "surface {} has no size",
                id_surface
            )));
        }

        let [r, g, b] = surface_color(id_surface);
        let data: Vec<u8> = std::iter::repeat([r, g, b, 255])
            .take((width as usize) * (height as usize))
            .flatten()
            .collect();
        write_png(path, width, height, &data)
    }

    fn dump_layer(&mut self, id_layer: u32, path: &Path) -> Result<(), LayoutError> {
        let screen = self
            .screens
            .iter()
            .find(|s| {
                self.paint_order(s.id)
                    .iter()
                    .any(|e| e.id_layer == id_layer)
            })
            .cloned()
            .ok_or_else(|| LayoutError::NothingToCapture(format!("layer {}", id_layer)))?;

        let entries = self
            .paint_order(screen.id)
            .iter()
            .filter(|e| e.id_layer == id_layer);
        let data = self.composite(screen.width, screen.height, entries);
        write_png(path, screen.width, screen.height, &data)
    }

    fn dump_screen(&mut self, id_screen: u32, path: &Path) -> Result<(), LayoutError> {
        let screen = self
            .screen_info(id_screen)
            .cloned()
            .ok_or_else(|| LayoutError::NothingToCapture(format!("screen {}", id_screen)))?;

        let data = self.composite(screen.width, screen.height, self.paint_order(id_screen));
        write_png(path, screen.width, screen.height, &data)
    }
}
