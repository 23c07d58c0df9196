//! Transform engine
//!
//! Derives the affine matrix that maps a surface's content into global
//! compositor coordinates for one (layer, surface) pair. The matrix is the
//! composition, in this order, of:
//!
//! 1. layer rotation about the centre of the layer destination rectangle
//! 2. layer translation by the layer destination origin
//! 3. surface translation by the surface destination origin
//! 4. surface rotation and scale (surface scale times layer scale)
//!
//! Quarter-turn orientations swap width and height of the extent that is
//! rotated, so a rotated object still fills its destination rectangle.

use cgmath::{Matrix4, SquareMatrix};

use crate::scene::properties::{Orientation, PropertyRecord};

/// Result of a transform computation for one (layer, surface) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
    /// Content coordinates to global coordinates
    pub matrix: Matrix4<f32>,
    /// Horizontal scale applied to the content, before surface rotation
    pub scale_x: f32,
    /// Vertical scale applied to the content, before surface rotation
    pub scale_y: f32,
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Creates a 2D translation matrix
pub fn translation(x: f32, y: f32) -> Matrix4<f32> {
    Matrix4::from_translation(cgmath::Vector3::new(x, y, 0.0))
}

/// Creates a 2D scale matrix
pub fn scale(sx: f32, sy: f32) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(sx, sy, 1.0)
}

/// Rotation about the origin using the exact quarter-turn `(sin, cos)` pair.
pub fn rotation(orientation: Orientation) -> Matrix4<f32> {
    let (s, c) = orientation.sin_cos();
    #[rustfmt::skip]
    let m = Matrix4::new(
        c,   s,   0.0, 0.0,
        -s,  c,   0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

/// Rotates a box of `width` x `height` (after rotation) about its centre.
///
/// The unrotated box has the swapped extent for quarter turns, so the result
/// covers exactly `(0, 0)..(width, height)`.
pub fn rotation_about_center(orientation: Orientation, width: f32, height: f32) -> Matrix4<f32> {
    let (pre_w, pre_h) = swapped(orientation, width, height);
    translation(width / 2.0, height / 2.0)
        * rotation(orientation)
        * translation(-pre_w / 2.0, -pre_h / 2.0)
}

fn swapped(orientation: Orientation, width: f32, height: f32) -> (f32, f32) {
    if orientation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

/// Scale factors mapping the layer source rectangle onto its destination.
pub fn layer_scale(layer: &PropertyRecord) -> (f32, f32) {
    let dst = layer.destination_rectangle;
    let src = layer.source_rectangle;
    let (dst_w, dst_h) = swapped(layer.orientation, dst.width as f32, dst.height as f32);
    (
        ratio(dst_w, src.width as f32),
        ratio(dst_h, src.height as f32),
    )
}

/// Computes the transform of `surface` shown on `layer`.
///
/// `content_size` is the natural size of the surface content. Returns `None`
/// when it is unknown (zero), in which case callers keep their previous
/// transform until the size becomes available.
pub fn compute(
    layer: &PropertyRecord,
    surface: &PropertyRecord,
    content_size: (u32, u32),
) -> Option<SurfaceTransform> {
    let (content_w, content_h) = content_size;
    if content_w == 0 || content_h == 0 {
        return None;
    }

    // Source rectangle, falling back to the whole content
    let src = surface.source_rectangle;
    let (src_x, src_y, src_w, src_h) = if src.is_empty() {
        (0.0, 0.0, content_w as f32, content_h as f32)
    } else {
        (src.x as f32, src.y as f32, src.width as f32, src.height as f32)
    };

    let dst = surface.destination_rectangle;
    let (dst_w, dst_h) = (dst.width as f32, dst.height as f32);
    let (pre_w, pre_h) = swapped(surface.orientation, dst_w, dst_h);

    let (layer_sx, layer_sy) = layer_scale(layer);
    let surface_sx = pre_w / src_w;
    let surface_sy = pre_h / src_h;

    let layer_dst = layer.destination_rectangle;
    let layer_src = layer.source_rectangle;

    let layer_rotation = translation(layer_dst.x as f32, layer_dst.y as f32)
        * rotation_about_center(
            layer.orientation,
            layer_dst.width as f32,
            layer_dst.height as f32,
        )
        * translation(-(layer_dst.x as f32), -(layer_dst.y as f32));
    let layer_translation = translation(layer_dst.x as f32, layer_dst.y as f32);
    let layer_mapping =
        scale(layer_sx, layer_sy) * translation(-(layer_src.x as f32), -(layer_src.y as f32));
    let surface_translation = translation(dst.x as f32, dst.y as f32);
    let surface_rotation_scale = rotation_about_center(surface.orientation, dst_w, dst_h)
        * scale(surface_sx, surface_sy)
        * translation(-src_x, -src_y);

    Some(SurfaceTransform {
        matrix: layer_rotation
            * layer_translation
            * layer_mapping
            * surface_translation
            * surface_rotation_scale,
        scale_x: surface_sx * layer_sx,
        scale_y: surface_sy * layer_sy,
    })
}
