//! Events sent from the controller to clients

use serde::{Deserialize, Serialize};

use super::{ErrorCode, Fixed, ObjectType};
use crate::controller::ObjectId;
use crate::layout::SurfaceStats;
use crate::scene::{Orientation, PixelFormat, Rectangle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // Controller object
    /// An output, together with the screen object created for it
    Screen { id_screen: u32, screen: ObjectId },
    Layer { id_layer: u32 },
    Surface { id_surface: u32 },
    Error {
        object_id: u32,
        object_type: ObjectType,
        code: ErrorCode,
        text: String,
    },

    // Surface and layer objects
    Visibility { visibility: bool },
    Opacity { opacity: Fixed },
    SourceRectangle(Rectangle),
    DestinationRectangle(Rectangle),
    Orientation { orientation: Orientation },
    /// Content size of a surface
    Configuration { width: u32, height: u32 },
    PixelFormat { pixel_format: PixelFormat },
    /// Surface membership. `None` clears the list, each `Some` appends a layer.
    LayerMembership { id_layer: Option<u32> },
    /// Layer membership. `None` clears the list, each `Some` appends a screen.
    ScreenMembership { id_screen: Option<u32> },
    Stats(SurfaceStats),
    /// Terminal event; nothing else is sent to the object afterwards
    Destroyed,
}

impl Event {
    pub fn is_destroyed(&self) -> bool {
        matches!(self, Event::Destroyed)
    }
}

/// An event addressed to one client object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub object: ObjectId,
    #[serde(flatten)]
    pub event: Event,
}

impl Message {
    pub fn new(object: ObjectId, event: Event) -> Self {
        Self { object, event }
    }
}
