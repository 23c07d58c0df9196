//! Property records shared by surfaces and layers
//!
//! Every mutable scene object carries two [`PropertyRecord`]s: a pending one
//! written by client requests and a current one promoted at commit time. The
//! [`EventMask`] tracks which property categories changed in between.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Axis-aligned rectangle in compositor coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Content orientation, restricted to quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Orientation {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    /// Rotation angle in degrees
    pub fn degrees(self) -> u32 {
        match self {
            Orientation::Normal => 0,
            Orientation::Rotate90 => 90,
            Orientation::Rotate180 => 180,
            Orientation::Rotate270 => 270,
        }
    }

    /// Exact `(sin, cos)` pair for the angle
    pub fn sin_cos(self) -> (f32, f32) {
        match self {
            Orientation::Normal => (0.0, 1.0),
            Orientation::Rotate90 => (1.0, 0.0),
            Orientation::Rotate180 => (0.0, -1.0),
            Orientation::Rotate270 => (-1.0, 0.0),
        }
    }

    /// Whether width and height trade places under this rotation
    pub fn swaps_axes(self) -> bool {
        matches!(self, Orientation::Rotate90 | Orientation::Rotate270)
    }
}

impl TryFrom<u32> for Orientation {
    type Error = String;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Orientation::Normal),
            90 => Ok(Orientation::Rotate90),
            180 => Ok(Orientation::Rotate180),
            270 => Ok(Orientation::Rotate270),
            other => Err(format!("unsupported orientation: {} degrees", other)),
        }
    }
}

impl From<Orientation> for u32 {
    fn from(orientation: Orientation) -> Self {
        orientation.degrees()
    }
}

/// Pixel format of a surface's content buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    R8,
    Rgb888,
    Rgba8888,
    Rgb565,
    Rgba5551,
    Rgba6661,
    Rgba4444,
    #[default]
    Unknown,
}

/// The double-buffered property set of a surface or layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Opacity in `0.0..=1.0`
    pub opacity: f64,
    pub source_rectangle: Rectangle,
    pub destination_rectangle: Rectangle,
    pub orientation: Orientation,
    pub visibility: bool,
}

impl Default for PropertyRecord {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            source_rectangle: Rectangle::default(),
            destination_rectangle: Rectangle::default(),
            orientation: Orientation::Normal,
            visibility: false,
        }
    }
}

impl PropertyRecord {
    /// Record for an object whose source and destination start out covering
    /// `width` x `height` at the origin
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            source_rectangle: Rectangle::from_size(width, height),
            destination_rectangle: Rectangle::from_size(width, height),
            ..Self::default()
        }
    }
}

/// Pending and current records plus the mask of pending changes.
///
/// Setters only ever touch `pending`; `current` is written by [`commit`].
///
/// [`commit`]: DoubleBuffered::commit
#[derive(Debug, Clone, Default)]
pub struct DoubleBuffered {
    current: PropertyRecord,
    pending: PropertyRecord,
    mask: EventMask,
}

impl DoubleBuffered {
    pub fn new(record: PropertyRecord) -> Self {
        Self {
            current: record.clone(),
            pending: record,
            mask: EventMask::NONE,
        }
    }

    pub fn current(&self) -> &PropertyRecord {
        &self.current
    }

    pub fn pending(&self) -> &PropertyRecord {
        &self.pending
    }

    pub fn mask(&self) -> EventMask {
        self.mask
    }

    pub fn mark(&mut self, bits: EventMask) {
        self.mask |= bits;
    }

    /// Returns the accumulated mask and resets it
    pub fn take_mask(&mut self) -> EventMask {
        std::mem::take(&mut self.mask)
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.pending.opacity = opacity.clamp(0.0, 1.0);
        self.mask |= EventMask::OPACITY;
    }

    pub fn set_source_rectangle(&mut self, rect: Rectangle) {
        self.pending.source_rectangle = rect;
        self.mask |= EventMask::SOURCE_RECTANGLE;
    }

    pub fn set_destination_rectangle(&mut self, rect: Rectangle) {
        self.pending.destination_rectangle = rect;
        self.mask |= EventMask::DESTINATION_RECTANGLE;
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.pending.orientation = orientation;
        self.mask |= EventMask::ORIENTATION;
    }

    pub fn set_visibility(&mut self, visibility: bool) {
        self.pending.visibility = visibility;
        self.mask |= EventMask::VISIBILITY;
    }

    /// Promotes the pending record to current
    pub fn commit(&mut self) {
        self.current = self.pending.clone();
    }
}

/// Bitmask of property categories changed since the last commit
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const OPACITY: EventMask = EventMask(1 << 0);
    pub const SOURCE_RECTANGLE: EventMask = EventMask(1 << 1);
    pub const DESTINATION_RECTANGLE: EventMask = EventMask(1 << 2);
    pub const ORIENTATION: EventMask = EventMask(1 << 3);
    pub const VISIBILITY: EventMask = EventMask(1 << 4);
    pub const PIXEL_FORMAT: EventMask = EventMask(1 << 5);
    /// Member list or membership changed
    pub const RENDER_ORDER: EventMask = EventMask(1 << 6);
    /// Content size changed
    pub const CONFIGURATION: EventMask = EventMask(1 << 7);

    /// Categories in the order their notifications are emitted
    pub const EMISSION_ORDER: [EventMask; 8] = [
        EventMask::OPACITY,
        EventMask::SOURCE_RECTANGLE,
        EventMask::DESTINATION_RECTANGLE,
        EventMask::ORIENTATION,
        EventMask::VISIBILITY,
        EventMask::PIXEL_FORMAT,
        EventMask::RENDER_ORDER,
        EventMask::CONFIGURATION,
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0 && !other.is_empty()
    }

    pub fn insert(&mut self, other: EventMask) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Set categories, one at a time, in emission order
    pub fn iter(self) -> impl Iterator<Item = EventMask> {
        EventMask::EMISSION_ORDER
            .into_iter()
            .filter(move |bit| self.contains(*bit))
    }

    fn name(self) -> &'static str {
        match self {
            EventMask::OPACITY => "OPACITY",
            EventMask::SOURCE_RECTANGLE => "SOURCE_RECTANGLE",
            EventMask::DESTINATION_RECTANGLE => "DESTINATION_RECTANGLE",
            EventMask::ORIENTATION => "ORIENTATION",
            EventMask::VISIBILITY => "VISIBILITY",
            EventMask::PIXEL_FORMAT => "PIXEL_FORMAT",
            EventMask::RENDER_ORDER => "RENDER_ORDER",
            EventMask::CONFIGURATION => "CONFIGURATION",
            _ => "?",
        }
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: EventMask) {
        self.insert(rhs);
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(EventMask::name).collect();
        write!(f, "EventMask({})", names.join(" | "))
    }
}
