//! Controller protocol: decoded requests and events
//!
//! The transport hands the controller already-decoded requests addressed to
//! one of four object kinds (controller, surface, layer, screen) and takes
//! back [`Event`]s addressed to client objects. All types serialize to JSON
//! for the socket transport in [`crate::ipc`].
//!
//! # Example
//!
//! ```
//! use ivi_controller::protocol::{Fixed, Request, SurfaceRequest};
//!
//! let json = r#"{"interface":"surface","request":"set_opacity","opacity":128}"#;
//! let request: Request = serde_json::from_str(json).unwrap();
//! assert_eq!(
//!     request,
//!     Request::Surface(SurfaceRequest::SetOpacity { opacity: Fixed::from_f64(0.5) })
//! );
//! ```

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::controller::ObjectId;
use crate::scene::{Orientation, Rectangle};

pub use events::{Event, Message};

/// Signed 24.8 fixed-point number as used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    pub const ONE: Fixed = Fixed(256);

    pub fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    pub fn from_f64(value: f64) -> Self {
        Fixed((value * 256.0).round() as i32)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 256.0
    }
}

/// Kind of a protocol object, used in `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Controller,
    Surface,
    Layer,
    Screen,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Controller => "controller",
            ObjectType::Surface => "surface",
            ObjectType::Layer => "layer",
            ObjectType::Screen => "screen",
        };
        f.write_str(name)
    }
}

/// Error codes carried by `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownError,
    FileError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ControllerRequest {
    CommitChanges,
    /// `id` is the client-chosen object id of the new layer object
    LayerCreate {
        id_layer: u32,
        width: u32,
        height: u32,
        id: ObjectId,
    },
    /// `id` is the client-chosen object id of the new surface object
    SurfaceCreate { id_surface: u32, id: ObjectId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum SurfaceRequest {
    SetVisibility { visibility: bool },
    SetOpacity { opacity: Fixed },
    SetSourceRectangle(Rectangle),
    SetDestinationRectangle(Rectangle),
    /// Accepted but not implemented
    SetConfiguration { width: u32, height: u32 },
    SetOrientation { orientation: Orientation },
    Screenshot { filename: String },
    SendStats,
    Destroy { destroy_scene_object: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum LayerRequest {
    SetVisibility { visibility: bool },
    SetOpacity { opacity: Fixed },
    SetSourceRectangle(Rectangle),
    SetDestinationRectangle(Rectangle),
    /// Accepted but not implemented
    SetConfiguration { width: u32, height: u32 },
    SetOrientation { orientation: Orientation },
    Screenshot { filename: String },
    ClearSurfaces,
    AddSurface { surface: ObjectId },
    RemoveSurface { surface: ObjectId },
    SetRenderOrder { id_surfaces: Vec<u32> },
    Destroy { destroy_scene_object: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ScreenRequest {
    Destroy,
    Clear,
    AddLayer { layer: ObjectId },
    SetRenderOrder { id_layers: Vec<u32> },
    Screenshot { filename: String },
}

/// A decoded request, tagged with the interface it was sent on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "interface", rename_all = "snake_case")]
pub enum Request {
    Controller(ControllerRequest),
    Surface(SurfaceRequest),
    Layer(LayerRequest),
    Screen(ScreenRequest),
}

impl Request {
    /// Interface the request belongs to
    pub fn interface(&self) -> ObjectType {
        match self {
            Request::Controller(_) => ObjectType::Controller,
            Request::Surface(_) => ObjectType::Surface,
            Request::Layer(_) => ObjectType::Layer,
            Request::Screen(_) => ObjectType::Screen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(Fixed::from_f64(1.0), Fixed::ONE);
        assert_eq!(Fixed::from_f64(0.5).raw(), 128);
        assert_eq!(Fixed::from_raw(64).to_f64(), 0.25);
    }

    #[test]
    fn test_request_json_shape() {
        let request: Request = serde_json::from_str(
            r#"{"interface":"layer","request":"set_render_order","id_surfaces":[5,2,2,9]}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::Layer(LayerRequest::SetRenderOrder {
                id_surfaces: vec![5, 2, 2, 9]
            })
        );
        assert_eq!(request.interface(), ObjectType::Layer);

        let request: Request = serde_json::from_str(
            r#"{"interface":"surface","request":"set_destination_rectangle","x":0,"y":0,"width":400,"height":240}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::Surface(SurfaceRequest::SetDestinationRectangle(Rectangle::new(
                0, 0, 400, 240
            )))
        );
    }

    #[test]
    fn test_orientation_must_be_a_quarter_turn() {
        let ok = serde_json::from_str::<Request>(
            r#"{"interface":"surface","request":"set_orientation","orientation":270}"#,
        );
        assert!(ok.is_ok());

        let bad = serde_json::from_str::<Request>(
            r#"{"interface":"surface","request":"set_orientation","orientation":45}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_error_code_names() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::FileError).unwrap(),
            "\"FILE_ERROR\""
        );
    }
}
