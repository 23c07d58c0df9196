//! Translation of committed change masks into protocol events

use crate::protocol::{Event, Fixed};
use crate::scene::{EventMask, Layer, PropertyRecord, Surface};

/// Events for the categories in `mask`, in emission order
pub(crate) fn surface_events(surface: &Surface, mask: EventMask) -> Vec<Event> {
    let mut events = Vec::new();
    for bit in mask.iter() {
        if let Some(event) = property_event(surface.current(), bit) {
            events.push(event);
        } else if bit == EventMask::PIXEL_FORMAT {
            events.push(Event::PixelFormat {
                pixel_format: surface.pixel_format(),
            });
        } else if bit == EventMask::RENDER_ORDER {
            events.push(Event::LayerMembership { id_layer: None });
            events.extend(surface.layers().iter().map(|&id| Event::LayerMembership {
                id_layer: Some(id),
            }));
        } else if bit == EventMask::CONFIGURATION {
            if let Some(content) = surface.content() {
                events.push(Event::Configuration {
                    width: content.width,
                    height: content.height,
                });
            }
        }
    }
    events
}

/// Events for the categories in `mask`, in emission order.
///
/// Layers have no pixel format or content size; those bits are ignored.
pub(crate) fn layer_events(layer: &Layer, mask: EventMask) -> Vec<Event> {
    let mut events = Vec::new();
    for bit in mask.iter() {
        if let Some(event) = property_event(layer.current(), bit) {
            events.push(event);
        } else if bit == EventMask::RENDER_ORDER {
            events.push(Event::ScreenMembership { id_screen: None });
            events.extend(layer.screens().iter().map(|&id| Event::ScreenMembership {
                id_screen: Some(id),
            }));
        }
    }
    events
}

/// Full current state, sent to a freshly created binding
pub(crate) fn surface_snapshot(surface: &Surface) -> Vec<Event> {
    surface_events(surface, all_categories())
}

pub(crate) fn layer_snapshot(layer: &Layer) -> Vec<Event> {
    layer_events(layer, all_categories())
}

fn all_categories() -> EventMask {
    EventMask::EMISSION_ORDER
        .iter()
        .fold(EventMask::NONE, |mask, &bit| mask | bit)
}

fn property_event(record: &PropertyRecord, bit: EventMask) -> Option<Event> {
    let event = if bit == EventMask::OPACITY {
        Event::Opacity {
            opacity: Fixed::from_f64(record.opacity),
        }
    } else if bit == EventMask::SOURCE_RECTANGLE {
        Event::SourceRectangle(record.source_rectangle)
    } else if bit == EventMask::DESTINATION_RECTANGLE {
        Event::DestinationRectangle(record.destination_rectangle)
    } else if bit == EventMask::ORIENTATION {
        Event::Orientation {
            orientation: record.orientation,
        }
    } else if bit == EventMask::VISIBILITY {
        Event::Visibility {
            visibility: record.visibility,
        }
    } else {
        return None;
    };
    Some(event)
}
