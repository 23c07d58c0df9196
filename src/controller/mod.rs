//! The IVI controller
//!
//! `IviController` owns the scene, the client bindings and the layout
//! backend. It processes decoded requests and compositor notifications one
//! at a time and queues the resulting events per client; the transport
//! collects them with [`IviController::take_events`].
//!
//! # Object lifecycle
//!
//! Layers live until they are destroyed. Surfaces are `Active` until they
//! are destroyed or the compositor drops their content. Destruction with
//! `destroy_scene_object` tears the entity down immediately after sending
//! `destroyed` to every binding. Content removal keeps the surface around in
//! `PendingRemoval` until its last binding is released, so late setters
//! still land somewhere harmless. Those bindings stay stale even if content
//! comes back under the same id.
//!
//! # Example
//!
//! ```
//! use ivi_controller::config::ControllerConfig;
//! use ivi_controller::controller::{IviController, ObjectId};
//! use ivi_controller::layout::HeadlessLayout;
//! use ivi_controller::protocol::{ControllerRequest, Request};
//! use ivi_controller::scene::ScreenInfo;
//!
//! let layout = HeadlessLayout::new(vec![ScreenInfo {
//!     id: 0,
//!     name: "HDMI-A-1".to_string(),
//!     width: 800,
//!     height: 480,
//! }]);
//! let mut controller = IviController::new(layout, &ControllerConfig::default());
//!
//! let client = controller.connect_client(1000);
//! controller.bind_controller(client, ObjectId(1)).unwrap();
//! controller.dispatch(
//!     client,
//!     ObjectId(1),
//!     Request::Controller(ControllerRequest::LayerCreate {
//!         id_layer: 100,
//!         width: 800,
//!         height: 480,
//!         id: ObjectId(2),
//!     }),
//! );
//! assert!(controller.scene().layer(100).is_some());
//! ```

pub mod binding;
mod client;
mod notify;

pub use binding::{Binding, BindingKey, BindingTarget, ClientId, ObjectId};

use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::layout::LayoutBackend;
use crate::protocol::{
    ControllerRequest, ErrorCode, Event, LayerRequest, Message, ObjectType, Request,
    ScreenRequest, SurfaceRequest,
};
use crate::scene::{Change, ContentInfo, Lifecycle, Scene, SceneObject, SurfaceAttach};
use binding::BindingTable;
use client::Client;

pub struct IviController<L: LayoutBackend> {
    scene: Scene,
    layout: L,
    clients: BTreeMap<ClientId, Client>,
    bindings: BindingTable,
    next_client: u32,
    screenshot_dir: PathBuf,
}

impl<L: LayoutBackend> IviController<L> {
    /// Creates a controller over `layout`, registering its outputs
    pub fn new(layout: L, config: &ControllerConfig) -> Self {
        let mut scene = Scene::new();
        for info in layout.screens() {
            let id = info.id;
            if !scene.add_screen(info) {
                warn!("Layout reported screen {} twice, ignoring duplicate", id);
            }
        }
        info!(
            "🚗 IVI controller ready with {} screen(s)",
            scene.screens().count()
        );

        Self {
            scene,
            layout,
            clients: BTreeMap::new(),
            bindings: BindingTable::default(),
            next_client: 0,
            screenshot_dir: config.screenshot_path(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }

    pub fn binding(&self, client: ClientId, object: ObjectId) -> Option<&Binding> {
        self.bindings.get((client, object))
    }

    /// Number of bindings to `target` across all clients
    pub fn binding_count(&self, target: BindingTarget) -> usize {
        self.bindings.count(target)
    }

    pub fn client_pid(&self, client: ClientId) -> Option<u32> {
        self.clients.get(&client).map(|c| c.pid)
    }

    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.keys().copied()
    }

    // === Clients ===

    pub fn connect_client(&mut self, pid: u32) -> ClientId {
        self.next_client += 1;
        let client = ClientId(self.next_client);
        self.clients.insert(client, Client::new(pid));
        debug!("Client {} connected (pid {})", client, pid);
        client
    }

    /// Releases every binding of `client` and forgets it
    pub fn disconnect_client(&mut self, client: ClientId) -> Result<()> {
        if !self.clients.contains_key(&client) {
            return Err(ControllerError::NoSuchClient(client));
        }
        for object in self.bindings.of_client(client) {
            self.release_binding((client, object));
        }
        self.clients.remove(&client);
        info!("👋 Client {} disconnected", client);
        Ok(())
    }

    /// Binds a controller object and replays the current scene to it.
    ///
    /// Each screen is announced together with a fresh screen object.
    pub fn bind_controller(&mut self, client: ClientId, object: ObjectId) -> Result<()> {
        self.check_new_object((client, object))?;
        let state = self
            .clients
            .get_mut(&client)
            .ok_or(ControllerError::NoSuchClient(client))?;

        self.bindings
            .insert((client, object), BindingTarget::Controller)?;
        state.controllers.push(object);

        for screen in self.scene.screens() {
            let screen_object = state
                .allocate_object()
                .ok_or(ControllerError::ObjectIdsExhausted(client))?;
            self.bindings
                .insert((client, screen_object), BindingTarget::Screen(screen.id()))?;
            state.push(
                object,
                Event::Screen {
                    id_screen: screen.id(),
                    screen: screen_object,
                },
            );
        }
        for layer in self.scene.layers() {
            state.push(object, Event::Layer { id_layer: layer.id() });
        }
        for surface in self.scene.surfaces() {
            if surface.lifecycle() == Lifecycle::Active && surface.content().is_some() {
                state.push(
                    object,
                    Event::Surface {
                        id_surface: surface.id(),
                    },
                );
            }
        }

        debug!("Client {} bound controller object {}", client, object);
        Ok(())
    }

    /// Drains the events queued for `client`
    pub fn take_events(&mut self, client: ClientId) -> Vec<Message> {
        self.clients
            .get_mut(&client)
            .map(Client::take_events)
            .unwrap_or_default()
    }

    // === Requests ===

    /// Applies one request sent on `object`.
    ///
    /// Requests on unknown objects are logged and dropped. Any other failure
    /// is reported as an `error` event on the client's controller object.
    pub fn dispatch(&mut self, client: ClientId, object: ObjectId, request: Request) {
        let Some(binding) = self.bindings.get((client, object)).copied() else {
            warn!(
                "Client {} sent {:?} to unknown object {}, ignoring",
                client, request, object
            );
            return;
        };
        debug!("Client {} object {}: {:?}", client, object, request);

        let result = match (binding.target, request) {
            (BindingTarget::Controller, Request::Controller(request)) => {
                self.handle_controller(client, request)
            }
            (BindingTarget::Surface(id), Request::Surface(request)) if binding.defunct => {
                self.handle_defunct_surface(client, object, id, request)
            }
            (BindingTarget::Surface(id), Request::Surface(request)) => {
                self.handle_surface(client, object, id, request)
            }
            (BindingTarget::Layer(id), Request::Layer(request)) => {
                self.handle_layer(client, object, id, request)
            }
            (BindingTarget::Screen(id), Request::Screen(request)) => {
                self.handle_screen(client, object, id, request)
            }
            (target, request) => Err(ControllerError::WrongInterface {
                object,
                expected: request.interface(),
                actual: target.object_type(),
            }),
        };

        if let Err(err) = result {
            self.report_error(client, object, binding.target, err);
        }
    }

    fn handle_controller(&mut self, client: ClientId, request: ControllerRequest) -> Result<()> {
        match request {
            ControllerRequest::CommitChanges => {
                self.commit_changes();
                Ok(())
            }
            ControllerRequest::LayerCreate {
                id_layer,
                width,
                height,
                id,
            } => self.layer_create(client, id, id_layer, width, height),
            ControllerRequest::SurfaceCreate { id_surface, id } => {
                self.surface_create(client, id, id_surface)
            }
        }
    }

    fn handle_surface(
        &mut self,
        client: ClientId,
        object: ObjectId,
        id_surface: u32,
        request: SurfaceRequest,
    ) -> Result<()> {
        match request {
            SurfaceRequest::SetVisibility { visibility } => {
                self.scene
                    .surface_mut(id_surface)?
                    .props_mut()
                    .set_visibility(visibility);
            }
            SurfaceRequest::SetOpacity { opacity } => {
                self.scene
                    .surface_mut(id_surface)?
                    .props_mut()
                    .set_opacity(opacity.to_f64());
            }
            SurfaceRequest::SetSourceRectangle(rect) => {
                self.scene
                    .surface_mut(id_surface)?
                    .props_mut()
                    .set_source_rectangle(rect);
            }
            SurfaceRequest::SetDestinationRectangle(rect) => {
                self.scene
                    .surface_mut(id_surface)?
                    .props_mut()
                    .set_destination_rectangle(rect);
            }
            SurfaceRequest::SetConfiguration { width, height } => {
                warn!(
                    "set_configuration({}x{}) on surface {} is not supported",
                    width, height, id_surface
                );
            }
            SurfaceRequest::SetOrientation { orientation } => {
                self.scene
                    .surface_mut(id_surface)?
                    .props_mut()
                    .set_orientation(orientation);
            }
            SurfaceRequest::Screenshot { filename } => {
                let path = self.screenshot_path(&filename);
                self.layout.dump_surface(id_surface, &path)?;
                info!("📸 Surface {} captured to {}", id_surface, path.display());
            }
            SurfaceRequest::SendStats => {
                let stats = self
                    .layout
                    .surface_stats(id_surface)
                    .ok_or(ControllerError::StatsUnavailable(id_surface))?;
                self.send(client, object, Event::Stats(stats));
            }
            SurfaceRequest::Destroy {
                destroy_scene_object: true,
            } => self.destroy_surface(id_surface),
            SurfaceRequest::Destroy {
                destroy_scene_object: false,
            } => self.release_binding((client, object)),
        }
        Ok(())
    }

    /// Requests on a surface object that already received `destroyed`.
    ///
    /// Destroying the object only releases the binding. Other requests reach
    /// the record while the surface lingers in `PendingRemoval` and are
    /// dropped once the id is backed by new content or gone.
    fn handle_defunct_surface(
        &mut self,
        client: ClientId,
        object: ObjectId,
        id_surface: u32,
        request: SurfaceRequest,
    ) -> Result<()> {
        if let SurfaceRequest::Destroy { .. } = request {
            self.release_binding((client, object));
            return Ok(());
        }

        let lingering = self
            .scene
            .surface(id_surface)
            .is_some_and(|s| s.lifecycle() == Lifecycle::PendingRemoval);
        if lingering {
            self.handle_surface(client, object, id_surface, request)
        } else {
            debug!(
                "Client {} object {} is stale, dropping {:?}",
                client, object, request
            );
            Ok(())
        }
    }

    fn handle_layer(
        &mut self,
        client: ClientId,
        object: ObjectId,
        id_layer: u32,
        request: LayerRequest,
    ) -> Result<()> {
        match request {
            LayerRequest::SetVisibility { visibility } => {
                self.scene
                    .layer_mut(id_layer)?
                    .props_mut()
                    .set_visibility(visibility);
            }
            LayerRequest::SetOpacity { opacity } => {
                self.scene
                    .layer_mut(id_layer)?
                    .props_mut()
                    .set_opacity(opacity.to_f64());
            }
            LayerRequest::SetSourceRectangle(rect) => {
                self.scene
                    .layer_mut(id_layer)?
                    .props_mut()
                    .set_source_rectangle(rect);
            }
            LayerRequest::SetDestinationRectangle(rect) => {
                self.scene
                    .layer_mut(id_layer)?
                    .props_mut()
                    .set_destination_rectangle(rect);
            }
            LayerRequest::SetConfiguration { width, height } => {
                warn!(
                    "set_configuration({}x{}) on layer {} is not supported",
                    width, height, id_layer
                );
            }
            LayerRequest::SetOrientation { orientation } => {
                self.scene
                    .layer_mut(id_layer)?
                    .props_mut()
                    .set_orientation(orientation);
            }
            LayerRequest::Screenshot { filename } => {
                let path = self.screenshot_path(&filename);
                self.layout.dump_layer(id_layer, &path)?;
                info!("📸 Layer {} captured to {}", id_layer, path.display());
            }
            LayerRequest::ClearSurfaces => self.scene.layer_clear_surfaces(id_layer)?,
            LayerRequest::AddSurface { surface } => {
                let id_surface = self.resolve_surface(client, surface)?;
                self.scene.layer_add_surface(id_layer, id_surface)?;
            }
            LayerRequest::RemoveSurface { surface } => {
                let id_surface = self.resolve_surface(client, surface)?;
                self.scene.layer_remove_surface(id_layer, id_surface)?;
            }
            LayerRequest::SetRenderOrder { id_surfaces } => {
                let unknown = self.scene.layer_set_render_order(id_layer, &id_surfaces)?;
                if !unknown.is_empty() {
                    warn!(
                        "Render order of layer {} skips unknown or removed surfaces {:?}",
                        id_layer, unknown
                    );
                }
            }
            LayerRequest::Destroy {
                destroy_scene_object: true,
            } => self.destroy_layer(id_layer),
            LayerRequest::Destroy {
                destroy_scene_object: false,
            } => self.release_binding((client, object)),
        }
        Ok(())
    }

    fn handle_screen(
        &mut self,
        client: ClientId,
        object: ObjectId,
        id_screen: u32,
        request: ScreenRequest,
    ) -> Result<()> {
        match request {
            ScreenRequest::Destroy => self.release_binding((client, object)),
            ScreenRequest::Clear => self.scene.screen_clear(id_screen)?,
            ScreenRequest::AddLayer { layer } => {
                let id_layer = self.resolve_layer(client, layer)?;
                self.scene.screen_add_layer(id_screen, id_layer)?;
            }
            ScreenRequest::SetRenderOrder { id_layers } => {
                let unknown = self.scene.screen_set_render_order(id_screen, &id_layers)?;
                if !unknown.is_empty() {
                    warn!(
                        "Render order of screen {} skips unknown layers {:?}",
                        id_screen, unknown
                    );
                }
            }
            ScreenRequest::Screenshot { filename } => {
                let path = self.screenshot_path(&filename);
                self.layout.dump_screen(id_screen, &path)?;
                info!("📸 Screen {} captured to {}", id_screen, path.display());
            }
        }
        Ok(())
    }

    // === Commit ===

    /// Commits all pending state, notifies bindings, hands the new paint
    /// orders to the layout and schedules one repaint.
    pub fn commit_changes(&mut self) {
        let report = self.scene.commit();

        for change in &report.changes {
            self.notify(*change);
        }
        for id_screen in &report.screens {
            if let Some(screen) = self.scene.screen(*id_screen) {
                self.layout
                    .apply_paint_order(*id_screen, screen.paint_order());
            }
        }
        self.layout.schedule_repaint();

        debug!(
            "Committed {} change(s) across {} screen(s)",
            report.changes.len(),
            report.screens.len()
        );
    }

    fn notify(&mut self, change: Change) {
        let (target, events) = match change.object {
            SceneObject::Surface(id) => {
                let Some(surface) = self.scene.surface(id) else {
                    return;
                };
                if surface.lifecycle() == Lifecycle::PendingRemoval {
                    return;
                }
                (
                    BindingTarget::Surface(id),
                    notify::surface_events(surface, change.mask),
                )
            }
            SceneObject::Layer(id) => {
                let Some(layer) = self.scene.layer(id) else {
                    return;
                };
                (
                    BindingTarget::Layer(id),
                    notify::layer_events(layer, change.mask),
                )
            }
            // Screen objects carry no property events
            SceneObject::Screen(_) => return,
        };
        self.send_to_target(target, &events);
    }

    // === Creation ===

    fn surface_create(&mut self, client: ClientId, object: ObjectId, id_surface: u32) -> Result<()> {
        self.check_new_object((client, object))?;
        match self.scene.surface(id_surface) {
            Some(surface) if surface.lifecycle() == Lifecycle::PendingRemoval => {
                return Err(ControllerError::PendingRemoval {
                    kind: ObjectType::Surface,
                    id: id_surface,
                });
            }
            Some(_) => {}
            None => {
                self.scene.create_surface(id_surface);
                debug!("Surface {} created as placeholder", id_surface);
            }
        }

        self.bindings
            .insert((client, object), BindingTarget::Surface(id_surface))?;
        if let (Some(surface), Some(state)) =
            (self.scene.surface(id_surface), self.clients.get_mut(&client))
        {
            for event in notify::surface_snapshot(surface) {
                state.push(object, event);
            }
        }
        Ok(())
    }

    fn layer_create(
        &mut self,
        client: ClientId,
        object: ObjectId,
        id_layer: u32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.check_new_object((client, object))?;
        match self.scene.layer(id_layer) {
            Some(layer) => {
                if layer.size() != (width, height) {
                    debug!(
                        "Layer {} exists, keeping {:?} over requested {}x{}",
                        id_layer,
                        layer.size(),
                        width,
                        height
                    );
                }
            }
            None => {
                self.scene.create_layer(id_layer, width, height);
                info!("🧱 Created layer {} ({}x{})", id_layer, width, height);
                self.announce(&Event::Layer { id_layer });
            }
        }

        self.bindings
            .insert((client, object), BindingTarget::Layer(id_layer))?;
        if let (Some(layer), Some(state)) =
            (self.scene.layer(id_layer), self.clients.get_mut(&client))
        {
            for event in notify::layer_snapshot(layer) {
                state.push(object, event);
            }
        }
        Ok(())
    }

    // === Destruction ===

    fn destroy_surface(&mut self, id_surface: u32) {
        let target = BindingTarget::Surface(id_surface);
        self.send_to_target(target, &[Event::Destroyed]);
        self.bindings.remove_target(target);
        self.scene.remove_surface(id_surface);
        self.layout.destroy_surface(id_surface);
        info!("🗑️ Destroyed surface {}", id_surface);
    }

    fn destroy_layer(&mut self, id_layer: u32) {
        let target = BindingTarget::Layer(id_layer);
        self.send_to_target(target, &[Event::Destroyed]);
        self.bindings.remove_target(target);
        self.scene.remove_layer(id_layer);
        info!("🗑️ Destroyed layer {}", id_layer);
    }

    /// Drops one binding, freeing its entity if nothing keeps it alive
    fn release_binding(&mut self, key: BindingKey) {
        let Some(binding) = self.bindings.remove(key) else {
            return;
        };
        let (client, object) = key;
        debug!("Client {} released object {}", client, object);

        let remaining = self.bindings.count(binding.target);
        match binding.target {
            BindingTarget::Controller => {
                if let Some(state) = self.clients.get_mut(&client) {
                    state.controllers.retain(|o| *o != object);
                }
            }
            BindingTarget::Surface(id) if remaining == 0 => {
                let orphaned = self.scene.surface(id).is_some_and(|s| {
                    s.lifecycle() == Lifecycle::PendingRemoval || s.content().is_none()
                });
                if orphaned {
                    self.scene.remove_surface(id);
                    debug!("Surface {} freed with its last binding", id);
                }
            }
            _ => {}
        }
    }

    // === Compositor notifications ===

    /// The compositor has content for `id_surface`
    pub fn surface_content_available(&mut self, id_surface: u32, content: ContentInfo) {
        match self.scene.attach_content(id_surface, content) {
            SurfaceAttach::Created | SurfaceAttach::Backed => {
                info!(
                    "🪟 Surface {} available ({}x{})",
                    id_surface, content.width, content.height
                );
                self.announce(&Event::Surface { id_surface });
            }
            SurfaceAttach::Reattached => {
                info!("🪟 Surface {} has content again", id_surface);
                self.announce(&Event::Surface { id_surface });
            }
            SurfaceAttach::Updated => {
                debug!("Content of surface {} replaced", id_surface);
            }
        }
    }

    /// The content of `id_surface` changed size
    pub fn surface_content_configured(&mut self, id_surface: u32, width: u32, height: u32) {
        if let Err(err) = self.scene.configure_content(id_surface, width, height) {
            warn!("Ignoring configure for surface {}: {}", id_surface, err);
        }
    }

    /// The content of `id_surface` is gone.
    ///
    /// Bindings receive `destroyed`; the surface lingers until they are
    /// released.
    pub fn surface_content_removed(&mut self, id_surface: u32) {
        if let Err(err) = self.scene.detach_content(id_surface) {
            warn!("Ignoring content removal: {}", err);
            return;
        }

        let target = BindingTarget::Surface(id_surface);
        for (client, object) in self.bindings.mark_defunct(target) {
            self.send(client, object, Event::Destroyed);
        }
        if self.bindings.count(target) == 0 {
            self.scene.remove_surface(id_surface);
        }
        info!("Content of surface {} removed", id_surface);
    }

    // === Helpers ===

    fn check_new_object(&self, key: BindingKey) -> Result<()> {
        if key.1.is_server_allocated() || self.bindings.get(key).is_some() {
            return Err(ControllerError::ObjectInUse(key.1));
        }
        Ok(())
    }

    fn resolve_surface(&self, client: ClientId, object: ObjectId) -> Result<u32> {
        let binding = self
            .bindings
            .get((client, object))
            .ok_or(ControllerError::NoSuchObject(object))?;
        let BindingTarget::Surface(id) = binding.target else {
            return Err(ControllerError::WrongInterface {
                object,
                expected: ObjectType::Surface,
                actual: binding.target.object_type(),
            });
        };
        match self.scene.surface(id) {
            Some(surface) if surface.lifecycle() == Lifecycle::PendingRemoval => {
                Err(ControllerError::PendingRemoval {
                    kind: ObjectType::Surface,
                    id,
                })
            }
            Some(_) if binding.defunct => Err(ControllerError::StaleObject(object)),
            Some(_) => Ok(id),
            None => Err(ControllerError::NoSuchSurface(id)),
        }
    }

    fn resolve_layer(&self, client: ClientId, object: ObjectId) -> Result<u32> {
        let binding = self
            .bindings
            .get((client, object))
            .ok_or(ControllerError::NoSuchObject(object))?;
        match binding.target {
            BindingTarget::Layer(id) => Ok(id),
            other => Err(ControllerError::WrongInterface {
                object,
                expected: ObjectType::Layer,
                actual: other.object_type(),
            }),
        }
    }

    fn screenshot_path(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.screenshot_dir.join(path)
        }
    }

    fn send(&mut self, client: ClientId, object: ObjectId, event: Event) {
        if let Some(state) = self.clients.get_mut(&client) {
            state.push(object, event);
        }
    }

    /// Queues `events` on every live binding of `target`
    fn send_to_target(&mut self, target: BindingTarget, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        for (client, object) in self.bindings.live(target) {
            if let Some(state) = self.clients.get_mut(&client) {
                for event in events {
                    state.push(object, event.clone());
                }
            }
        }
    }

    /// Queues `event` on every controller object of every client
    fn announce(&mut self, event: &Event) {
        for state in self.clients.values_mut() {
            state.broadcast(event);
        }
    }

    fn report_error(
        &mut self,
        client: ClientId,
        object: ObjectId,
        target: BindingTarget,
        err: ControllerError,
    ) {
        let code = err.code();
        if code == ErrorCode::FileError {
            error!("Client {} object {}: {}", client, object, err);
        } else {
            warn!("Client {} object {}: {}", client, object, err);
        }

        let (object_type, object_id) = err.subject().unwrap_or(match target {
            BindingTarget::Controller => (ObjectType::Controller, object.0),
            BindingTarget::Surface(id) => (ObjectType::Surface, id),
            BindingTarget::Layer(id) => (ObjectType::Layer, id),
            BindingTarget::Screen(id) => (ObjectType::Screen, id),
        });

        let Some(state) = self.clients.get_mut(&client) else {
            return;
        };
        match state.root() {
            Some(root) => state.push(
                root,
                Event::Error {
                    object_id,
                    object_type,
                    code,
                    text: err.to_string(),
                },
            ),
            None => debug!("Client {} has no controller object for errors", client),
        }
    }
}

#[cfg(test)]
mod tests;
