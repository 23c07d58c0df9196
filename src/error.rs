//! Controller error types

use thiserror::Error;

use crate::controller::{ClientId, ObjectId};
use crate::layout::LayoutError;
use crate::protocol::{ErrorCode, ObjectType};

/// Errors raised while applying a request or a layout notification
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("No surface with id {0}")]
    NoSuchSurface(u32),

    #[error("No layer with id {0}")]
    NoSuchLayer(u32),

    #[error("No screen with id {0}")]
    NoSuchScreen(u32),

    #[error("Unknown client {0}")]
    NoSuchClient(ClientId),

    #[error("Unknown object {0}")]
    NoSuchObject(ObjectId),

    #[error("Object {object} is a {actual}, not a {expected}")]
    WrongInterface {
        object: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("Object id {0} is already in use")]
    ObjectInUse(ObjectId),

    #[error("Client {0} has no server object ids left")]
    ObjectIdsExhausted(ClientId),

    #[error("No statistics for surface {0}")]
    StatsUnavailable(u32),

    #[error("Object {0} was destroyed and no longer refers to a surface")]
    StaleObject(ObjectId),

    #[error("{kind} {id} is pending removal")]
    PendingRemoval { kind: ObjectType, id: u32 },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl ControllerError {
    /// Scene entity the error is about, if it names one
    pub fn subject(&self) -> Option<(ObjectType, u32)> {
        match *self {
            ControllerError::NoSuchSurface(id) | ControllerError::StatsUnavailable(id) => {
                Some((ObjectType::Surface, id))
            }
            ControllerError::NoSuchLayer(id) => Some((ObjectType::Layer, id)),
            ControllerError::NoSuchScreen(id) => Some((ObjectType::Screen, id)),
            ControllerError::PendingRemoval { kind, id } => Some((kind, id)),
            _ => None,
        }
    }

    /// Protocol error code reported to the client
    pub fn code(&self) -> ErrorCode {
        match self {
            ControllerError::Layout(err) if err.is_file_error() => ErrorCode::FileError,
            _ => ErrorCode::UnknownError,
        }
    }
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
