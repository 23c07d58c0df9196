//! Unit tests for the controller
//!
//! Drives the controller through decoded requests against the headless
//! layout and checks scene state together with the queued events.

use super::*;
use crate::layout::HeadlessLayout;
use crate::protocol::Fixed;
use crate::scene::{PixelFormat, Rectangle, ScreenInfo};
use proptest::prelude::*;
use tempfile::tempdir;

const ROOT: ObjectId = ObjectId(1);

fn controller() -> IviController<HeadlessLayout> {
    controller_with(&ControllerConfig::default())
}

fn controller_with(config: &ControllerConfig) -> IviController<HeadlessLayout> {
    let layout = HeadlessLayout::new(vec![ScreenInfo {
        id: 0,
        name: "HDMI-A-1".to_string(),
        width: 800,
        height: 480,
    }]);
    IviController::new(layout, config)
}

/// Connects a client, binds its controller object and drops the replay
fn bound_client(ctl: &mut IviController<HeadlessLayout>) -> ClientId {
    let client = ctl.connect_client(1000);
    ctl.bind_controller(client, ROOT).unwrap();
    ctl.take_events(client);
    client
}

fn backed_surface(ctl: &mut IviController<HeadlessLayout>, id: u32, width: u32, height: u32) {
    let content = ContentInfo::new(width, height, PixelFormat::Rgba8888);
    ctl.layout_mut().add_surface(id, content, 4242, "navigation");
    ctl.surface_content_available(id, content);
}

fn create_surface(ctl: &mut IviController<HeadlessLayout>, client: ClientId, id: ObjectId, id_surface: u32) {
    ctl.dispatch(
        client,
        ROOT,
        Request::Controller(ControllerRequest::SurfaceCreate { id_surface, id }),
    );
}

fn create_layer(ctl: &mut IviController<HeadlessLayout>, client: ClientId, id: ObjectId, id_layer: u32) {
    ctl.dispatch(
        client,
        ROOT,
        Request::Controller(ControllerRequest::LayerCreate {
            id_layer,
            width: 800,
            height: 480,
            id,
        }),
    );
}

fn commit(ctl: &mut IviController<HeadlessLayout>, client: ClientId) {
    ctl.dispatch(client, ROOT, Request::Controller(ControllerRequest::CommitChanges));
}

fn surface(ctl: &mut IviController<HeadlessLayout>, client: ClientId, object: ObjectId, request: SurfaceRequest) {
    ctl.dispatch(client, object, Request::Surface(request));
}

fn layer(ctl: &mut IviController<HeadlessLayout>, client: ClientId, object: ObjectId, request: LayerRequest) {
    ctl.dispatch(client, object, Request::Layer(request));
}

fn events_on(messages: &[Message], object: ObjectId) -> Vec<Event> {
    messages
        .iter()
        .filter(|m| m.object == object)
        .map(|m| m.event.clone())
        .collect()
}

fn errors(messages: &[Message]) -> Vec<(ObjectType, u32, ErrorCode)> {
    messages
        .iter()
        .filter_map(|m| match &m.event {
            Event::Error {
                object_id,
                object_type,
                code,
                ..
            } => Some((*object_type, *object_id, *code)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_bind_replays_scene() {
    let mut ctl = controller();
    let first = bound_client(&mut ctl);
    create_layer(&mut ctl, first, ObjectId(2), 100);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, first, ObjectId(3), 11); // placeholder, not announced

    let client = ctl.connect_client(2000);
    ctl.bind_controller(client, ROOT).unwrap();
    let events = events_on(&ctl.take_events(client), ROOT);

    let screen_object = ObjectId(ObjectId::SERVER_BASE);
    assert_eq!(
        events,
        vec![
            Event::Screen {
                id_screen: 0,
                screen: screen_object
            },
            Event::Layer { id_layer: 100 },
            Event::Surface { id_surface: 10 },
        ]
    );
    assert_eq!(
        ctl.binding(client, screen_object).map(|b| b.target),
        Some(BindingTarget::Screen(0))
    );
}

#[test]
fn test_new_entities_are_announced_to_every_controller() {
    let mut ctl = controller();
    let a = bound_client(&mut ctl);
    let b = bound_client(&mut ctl);

    create_layer(&mut ctl, a, ObjectId(2), 100);
    backed_surface(&mut ctl, 10, 64, 64);

    for client in [a, b] {
        let events = events_on(&ctl.take_events(client), ROOT);
        assert_eq!(
            events,
            vec![Event::Layer { id_layer: 100 }, Event::Surface { id_surface: 10 }]
        );
    }
}

#[test]
fn test_layer_create_is_idempotent() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);

    create_layer(&mut ctl, client, ObjectId(2), 100);
    ctl.dispatch(
        client,
        ROOT,
        Request::Controller(ControllerRequest::LayerCreate {
            id_layer: 100,
            width: 1024,
            height: 768,
            id: ObjectId(3),
        }),
    );

    assert_eq!(ctl.scene().layers().count(), 1);
    assert_eq!(ctl.scene().layer(100).unwrap().size(), (800, 480));
    assert_eq!(ctl.binding_count(BindingTarget::Layer(100)), 2);

    let messages = ctl.take_events(client);
    let announced = events_on(&messages, ROOT)
        .into_iter()
        .filter(|e| *e == Event::Layer { id_layer: 100 })
        .count();
    assert_eq!(announced, 1);
    assert!(errors(&messages).is_empty());
}

#[test]
fn test_new_binding_receives_current_state() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 240, 400);
    ctl.take_events(client);

    create_surface(&mut ctl, client, ObjectId(2), 10);
    let events = events_on(&ctl.take_events(client), ObjectId(2));

    assert_eq!(
        events.first(),
        Some(&Event::Opacity {
            opacity: Fixed::ONE
        })
    );
    assert!(events.contains(&Event::Visibility { visibility: false }));
    assert!(events.contains(&Event::LayerMembership { id_layer: None }));
    assert_eq!(
        events.last(),
        Some(&Event::Configuration {
            width: 240,
            height: 400
        })
    );
}

#[test]
fn test_commit_notifies_in_emission_order() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_layer(&mut ctl, client, ObjectId(3), 100);
    commit(&mut ctl, client);
    ctl.take_events(client);

    surface(&mut ctl, client, ObjectId(2), SurfaceRequest::SetVisibility { visibility: true });
    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::SetOpacity {
            opacity: Fixed::from_f64(0.5),
        },
    );
    layer(&mut ctl, client, ObjectId(3), LayerRequest::AddSurface { surface: ObjectId(2) });
    commit(&mut ctl, client);

    let messages = ctl.take_events(client);
    assert_eq!(
        events_on(&messages, ObjectId(2)),
        vec![
            Event::Opacity {
                opacity: Fixed::from_f64(0.5)
            },
            Event::Visibility { visibility: true },
            Event::LayerMembership { id_layer: None },
            Event::LayerMembership {
                id_layer: Some(100)
            },
        ]
    );
}

#[test]
fn test_second_commit_without_changes_is_silent() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    surface(&mut ctl, client, ObjectId(2), SurfaceRequest::SetVisibility { visibility: true });
    commit(&mut ctl, client);
    ctl.take_events(client);

    commit(&mut ctl, client);
    assert!(ctl.take_events(client).is_empty());
    assert_eq!(ctl.layout().repaint_requests(), 2);
}

#[test]
fn test_destroy_scene_object_notifies_each_binding_once() {
    let mut ctl = controller();
    let a = bound_client(&mut ctl);
    let b = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, a, ObjectId(2), 10);
    create_surface(&mut ctl, b, ObjectId(5), 10);
    ctl.take_events(a);
    ctl.take_events(b);

    surface(
        &mut ctl,
        a,
        ObjectId(2),
        SurfaceRequest::Destroy {
            destroy_scene_object: true,
        },
    );

    assert_eq!(events_on(&ctl.take_events(a), ObjectId(2)), vec![Event::Destroyed]);
    assert_eq!(events_on(&ctl.take_events(b), ObjectId(5)), vec![Event::Destroyed]);
    assert!(ctl.scene().surface(10).is_none());
    assert_eq!(ctl.layout().destroyed_surfaces(), &[10]);

    // Later setters from the other client go nowhere
    surface(&mut ctl, b, ObjectId(5), SurfaceRequest::SetVisibility { visibility: true });
    commit(&mut ctl, b);
    assert!(ctl.scene().surface(10).is_none());
    assert!(ctl.take_events(b).is_empty());
}

#[test]
fn test_destroy_without_scene_object_releases_one_binding() {
    let mut ctl = controller();
    let a = bound_client(&mut ctl);
    let b = bound_client(&mut ctl);
    create_layer(&mut ctl, a, ObjectId(2), 100);
    create_layer(&mut ctl, b, ObjectId(2), 100);

    layer(
        &mut ctl,
        a,
        ObjectId(2),
        LayerRequest::Destroy {
            destroy_scene_object: false,
        },
    );

    assert!(ctl.binding(a, ObjectId(2)).is_none());
    assert!(ctl.binding(b, ObjectId(2)).is_some());
    assert!(ctl.scene().layer(100).is_some());

    // Layers survive losing every binding
    layer(
        &mut ctl,
        b,
        ObjectId(2),
        LayerRequest::Destroy {
            destroy_scene_object: false,
        },
    );
    assert!(ctl.scene().layer(100).is_some());
}

#[test]
fn test_layer_destroy_unlinks_from_screen() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    let screen_object = ObjectId(ObjectId::SERVER_BASE);
    create_layer(&mut ctl, client, ObjectId(2), 100);
    ctl.dispatch(
        client,
        screen_object,
        Request::Screen(ScreenRequest::AddLayer { layer: ObjectId(2) }),
    );
    commit(&mut ctl, client);
    assert_eq!(ctl.scene().layers_on_screen(0).unwrap(), &[100]);

    layer(
        &mut ctl,
        client,
        ObjectId(2),
        LayerRequest::Destroy {
            destroy_scene_object: true,
        },
    );
    assert!(ctl.scene().layer(100).is_none());
    assert!(ctl.scene().layers_on_screen(0).unwrap().is_empty());
}

#[test]
fn test_content_removal_keeps_surface_for_its_bindings() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_layer(&mut ctl, client, ObjectId(3), 100);
    layer(&mut ctl, client, ObjectId(3), LayerRequest::AddSurface { surface: ObjectId(2) });
    commit(&mut ctl, client);
    ctl.take_events(client);

    ctl.surface_content_removed(10);
    assert_eq!(
        events_on(&ctl.take_events(client), ObjectId(2)),
        vec![Event::Destroyed]
    );
    let surface_state = ctl.scene().surface(10).unwrap();
    assert_eq!(surface_state.lifecycle(), Lifecycle::PendingRemoval);
    assert!(ctl.scene().surfaces_on_layer(100).unwrap().is_empty());

    // Setters still reach the record but produce no events
    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::SetOpacity {
            opacity: Fixed::from_f64(0.25),
        },
    );
    commit(&mut ctl, client);
    assert_eq!(ctl.scene().surface(10).unwrap().current().opacity, 0.25);
    assert!(events_on(&ctl.take_events(client), ObjectId(2)).is_empty());

    // Releasing the last binding frees it
    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::Destroy {
            destroy_scene_object: false,
        },
    );
    assert!(ctl.scene().surface(10).is_none());
}

#[test]
fn test_content_removal_without_bindings_frees_surface() {
    let mut ctl = controller();
    backed_surface(&mut ctl, 10, 64, 64);
    ctl.surface_content_removed(10);
    assert!(ctl.scene().surface(10).is_none());
}

#[test]
fn test_reappearing_content_reactivates_surface() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    ctl.surface_content_removed(10);
    ctl.take_events(client);

    backed_surface(&mut ctl, 10, 32, 32);
    assert_eq!(
        ctl.scene().surface(10).unwrap().lifecycle(),
        Lifecycle::Active
    );
    assert_eq!(
        events_on(&ctl.take_events(client), ROOT),
        vec![Event::Surface { id_surface: 10 }]
    );
}

#[test]
fn test_late_bind_to_pending_removal_is_rejected() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    ctl.surface_content_removed(10);
    ctl.take_events(client);

    create_surface(&mut ctl, client, ObjectId(3), 10);

    assert!(ctl.binding(client, ObjectId(3)).is_none());
    assert_eq!(
        errors(&ctl.take_events(client)),
        vec![(ObjectType::Surface, 10, ErrorCode::UnknownError)]
    );
}

#[test]
fn test_stale_binding_cannot_touch_remapped_surface() {
    let mut ctl = controller();
    let a = bound_client(&mut ctl);
    let b = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, a, ObjectId(2), 10);
    create_layer(&mut ctl, a, ObjectId(3), 100);
    ctl.surface_content_removed(10);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, b, ObjectId(5), 10);
    ctl.take_events(a);
    ctl.take_events(b);

    surface(
        &mut ctl,
        a,
        ObjectId(2),
        SurfaceRequest::SetVisibility { visibility: true },
    );
    assert!(!ctl.scene().surface(10).unwrap().pending().visibility);

    // The stale object cannot be placed on a layer either
    layer(&mut ctl, a, ObjectId(3), LayerRequest::AddSurface { surface: ObjectId(2) });
    assert_eq!(
        errors(&ctl.take_events(a)),
        vec![(ObjectType::Layer, 100, ErrorCode::UnknownError)]
    );
    assert!(ctl.scene().layer(100).unwrap().pending_surfaces().is_empty());

    // Destroying it only drops the binding
    surface(
        &mut ctl,
        a,
        ObjectId(2),
        SurfaceRequest::Destroy {
            destroy_scene_object: true,
        },
    );
    assert!(ctl.binding(a, ObjectId(2)).is_none());
    assert!(ctl.scene().surface(10).is_some());
    assert!(ctl.layout().destroyed_surfaces().is_empty());
    assert!(ctl.take_events(b).is_empty());
    assert_eq!(ctl.binding_count(BindingTarget::Surface(10)), 1);
}

#[test]
fn test_render_order_skips_surface_pending_removal() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_layer(&mut ctl, client, ObjectId(3), 100);
    ctl.surface_content_removed(10);
    ctl.take_events(client);

    layer(&mut ctl, client, ObjectId(3), LayerRequest::AddSurface { surface: ObjectId(2) });
    assert_eq!(
        errors(&ctl.take_events(client)),
        vec![(ObjectType::Surface, 10, ErrorCode::UnknownError)]
    );

    layer(
        &mut ctl,
        client,
        ObjectId(3),
        LayerRequest::SetRenderOrder {
            id_surfaces: vec![10],
        },
    );
    commit(&mut ctl, client);

    assert_eq!(
        ctl.scene().surface(10).unwrap().lifecycle(),
        Lifecycle::PendingRemoval
    );
    assert!(ctl.scene().surfaces_on_layer(100).unwrap().is_empty());
    assert!(ctl.scene().layers_under_surface(10).unwrap().is_empty());
}

#[test]
fn test_placeholder_is_freed_with_last_binding() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    assert!(ctl.scene().surface(10).is_some());

    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::Destroy {
            destroy_scene_object: false,
        },
    );
    assert!(ctl.scene().surface(10).is_none());
}

#[test]
fn test_disconnect_releases_every_binding() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_layer(&mut ctl, client, ObjectId(3), 100);

    ctl.disconnect_client(client).unwrap();

    assert_eq!(ctl.binding_count(BindingTarget::Controller), 0);
    assert_eq!(ctl.binding_count(BindingTarget::Screen(0)), 0);
    assert!(ctl.scene().surface(10).is_none());
    assert!(ctl.scene().layer(100).is_some());
    assert!(matches!(
        ctl.disconnect_client(client),
        Err(ControllerError::NoSuchClient(_))
    ));
}

#[test]
fn test_wrong_interface_is_reported() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);

    surface(&mut ctl, client, ROOT, SurfaceRequest::SendStats);

    assert_eq!(
        errors(&ctl.take_events(client)),
        vec![(ObjectType::Controller, 1, ErrorCode::UnknownError)]
    );
}

#[test]
fn test_object_ids_are_scoped_per_client() {
    let mut ctl = controller();
    let a = bound_client(&mut ctl);
    let b = bound_client(&mut ctl);
    create_surface(&mut ctl, a, ObjectId(2), 10);
    create_layer(&mut ctl, b, ObjectId(3), 100);

    // Object 2 does not exist in client b's namespace
    layer(&mut ctl, b, ObjectId(3), LayerRequest::AddSurface { surface: ObjectId(2) });
    commit(&mut ctl, b);

    assert!(ctl.scene().surfaces_on_layer(100).unwrap().is_empty());
    assert_eq!(errors(&ctl.take_events(b)).len(), 1);
}

#[test]
fn test_reused_object_id_is_rejected() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_layer(&mut ctl, client, ObjectId(2), 100);

    assert!(ctl.scene().layer(100).is_none());
    assert_eq!(
        ctl.binding(client, ObjectId(2)).map(|b| b.target),
        Some(BindingTarget::Surface(10))
    );
    assert_eq!(errors(&ctl.take_events(client)).len(), 1);
}

#[test]
fn test_requests_on_unknown_objects_are_ignored() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    surface(&mut ctl, client, ObjectId(77), SurfaceRequest::SendStats);
    assert!(ctl.take_events(client).is_empty());
}

#[test]
fn test_set_configuration_is_accepted_without_effect() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    commit(&mut ctl, client);
    ctl.take_events(client);

    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::SetConfiguration {
            width: 10,
            height: 10,
        },
    );
    commit(&mut ctl, client);

    assert!(ctl.take_events(client).is_empty());
    assert_eq!(
        ctl.scene().surface(10).unwrap().content().unwrap().size(),
        (64, 64)
    );
}

#[test]
fn test_compositor_configure_is_reported_on_commit() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    commit(&mut ctl, client);
    ctl.take_events(client);

    ctl.surface_content_configured(10, 128, 96);
    assert!(ctl.take_events(client).is_empty());

    commit(&mut ctl, client);
    assert_eq!(
        events_on(&ctl.take_events(client), ObjectId(2)),
        vec![Event::Configuration {
            width: 128,
            height: 96
        }]
    );
}

#[test]
fn test_send_stats() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 64, 64);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_surface(&mut ctl, client, ObjectId(3), 11);
    ctl.take_events(client);

    surface(&mut ctl, client, ObjectId(2), SurfaceRequest::SendStats);
    surface(&mut ctl, client, ObjectId(3), SurfaceRequest::SendStats);

    let messages = ctl.take_events(client);
    let stats = events_on(&messages, ObjectId(2));
    assert!(matches!(
        stats.as_slice(),
        [Event::Stats(s)] if s.pid == 4242 && s.process_name == "navigation"
    ));
    // Placeholder 11 has no compositor statistics
    assert_eq!(
        errors(&messages),
        vec![(ObjectType::Surface, 11, ErrorCode::UnknownError)]
    );
}

#[test]
fn test_screenshots_resolve_against_configured_directory() {
    let dir = tempdir().unwrap();
    let config = ControllerConfig {
        screenshot_dir: dir.path().display().to_string(),
        ..ControllerConfig::default()
    };
    let mut ctl = controller_with(&config);
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 16, 16);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    ctl.take_events(client);

    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::Screenshot {
            filename: "nav.png".to_string(),
        },
    );
    ctl.dispatch(
        client,
        ObjectId(ObjectId::SERVER_BASE),
        Request::Screen(ScreenRequest::Screenshot {
            filename: "screen.png".to_string(),
        }),
    );

    assert!(dir.path().join("nav.png").exists());
    assert!(dir.path().join("screen.png").exists());
    assert!(errors(&ctl.take_events(client)).is_empty());
}

#[test]
fn test_screenshot_write_failure_is_a_file_error() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    backed_surface(&mut ctl, 10, 16, 16);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    ctl.take_events(client);

    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::Screenshot {
            filename: "/nonexistent-dir/for/screenshots/nav.png".to_string(),
        },
    );

    assert_eq!(
        errors(&ctl.take_events(client)),
        vec![(ObjectType::Surface, 10, ErrorCode::FileError)]
    );
}

#[test]
fn test_invisible_surface_is_committed_but_not_painted() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    let screen_object = ObjectId(ObjectId::SERVER_BASE);
    backed_surface(&mut ctl, 10, 200, 100);
    create_surface(&mut ctl, client, ObjectId(2), 10);
    create_layer(&mut ctl, client, ObjectId(3), 100);

    layer(&mut ctl, client, ObjectId(3), LayerRequest::SetVisibility { visibility: true });
    layer(&mut ctl, client, ObjectId(3), LayerRequest::AddSurface { surface: ObjectId(2) });
    ctl.dispatch(
        client,
        screen_object,
        Request::Screen(ScreenRequest::AddLayer { layer: ObjectId(3) }),
    );
    surface(
        &mut ctl,
        client,
        ObjectId(2),
        SurfaceRequest::SetDestinationRectangle(Rectangle::new(10, 20, 200, 100)),
    );
    commit(&mut ctl, client);

    assert!(ctl.layout().paint_order(0).is_empty());
    assert_eq!(
        ctl.scene().surface(10).unwrap().current().destination_rectangle,
        Rectangle::new(10, 20, 200, 100)
    );

    surface(&mut ctl, client, ObjectId(2), SurfaceRequest::SetVisibility { visibility: true });
    commit(&mut ctl, client);
    let painted: Vec<u32> = ctl
        .layout()
        .paint_order(0)
        .iter()
        .map(|e| e.id_surface)
        .collect();
    assert_eq!(painted, vec![10]);
}

#[test]
fn test_layer_membership_events_list_screens() {
    let mut ctl = controller();
    let client = bound_client(&mut ctl);
    create_layer(&mut ctl, client, ObjectId(2), 100);
    ctl.take_events(client);

    ctl.dispatch(
        client,
        ObjectId(ObjectId::SERVER_BASE),
        Request::Screen(ScreenRequest::SetRenderOrder {
            id_layers: vec![100, 100, 404],
        }),
    );
    commit(&mut ctl, client);

    assert_eq!(
        events_on(&ctl.take_events(client), ObjectId(2)),
        vec![
            Event::ScreenMembership { id_screen: None },
            Event::ScreenMembership {
                id_screen: Some(0)
            },
        ]
    );
    assert_eq!(ctl.scene().layers_on_screen(0).unwrap(), &[100]);
}

proptest! {
    #[test]
    fn prop_destroy_notifies_every_binding_exactly_once(
        bindings_per_client in proptest::collection::vec(1usize..4, 1..5),
        destroyer in any::<prop::sample::Index>(),
    ) {
        let mut ctl = controller();
        backed_surface(&mut ctl, 10, 64, 64);

        let mut objects = Vec::new();
        for count in &bindings_per_client {
            let client = bound_client(&mut ctl);
            for n in 0..*count {
                let object = ObjectId(10 + n as u32);
                create_surface(&mut ctl, client, object, 10);
                objects.push((client, object));
            }
            ctl.take_events(client);
        }

        let (client, object) = objects[destroyer.index(objects.len())];
        surface(&mut ctl, client, object, SurfaceRequest::Destroy { destroy_scene_object: true });
        for (client, object) in &objects {
            surface(&mut ctl, *client, *object, SurfaceRequest::SetVisibility { visibility: true });
        }

        let clients: Vec<ClientId> = ctl.clients().collect();
        let mut destroyed = Vec::new();
        for client in clients {
            for message in ctl.take_events(client) {
                prop_assert!(message.event.is_destroyed());
                destroyed.push((client, message.object));
            }
        }
        destroyed.sort();
        let mut expected = objects.clone();
        expected.sort();
        prop_assert_eq!(destroyed, expected);
    }
}
