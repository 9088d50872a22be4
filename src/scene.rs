//! Scene composition and the per-frame invalidation loop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future;
use futures::task::LocalSpawnExt;

use crate::config::SceneConfig;
use crate::element::{self, Camera, Element, ElementId, ElementType, Grid, SceneId};
use crate::events::{Event, Events};
use crate::loaders::{AssetLoader, LoadError, ModelLoadRequest};
use crate::math::{Color, AABB};
use crate::state::{StateDiff, StateSnapshot};
use crate::surface::RenderSurface;

#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    #[error("startup load failed: {0}")]
    Load(#[source] Arc<LoadError>),
}

/// Outcome of one [`Scene::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// False when the loop has not been started yet and nothing ran
    pub running: bool,
    /// A render was pending on the surface after the update
    pub render_requested: bool,
    /// The pre-render, render and post-render passes ran
    pub rendered: bool,
    /// Elements in the union of the frame's diff
    pub changed: usize,
}

impl FrameReport {
    fn idle(frame: u64) -> Self {
        Self {
            frame,
            running: false,
            render_requested: false,
            rendered: false,
            changed: 0,
        }
    }
}

struct Completion {
    name: String,
    result: Result<element::Model, LoadError>,
}

/// Owns the elements of a viewer session and decides, per frame, whether
/// anything visible changed.
pub struct Scene<S: RenderSurface> {
    id: SceneId,
    events: Events,
    config: SceneConfig,
    surface: S,
    loader: Box<dyn AssetLoader>,
    elements: Vec<Box<dyn Element>>,
    bound: Option<AABB>,
    states: [StateSnapshot; 2],
    diff: StateDiff,
    /// Only the parity is observed, for snapshot buffer selection
    frame: u64,
    force_render: bool,
    running: bool,
    canvas_resize: Option<(u32, u32)>,
    target_size: (u32, u32),
    camera: ElementId,
    grid: ElementId,
    pool: LocalPool,
    spawner: LocalSpawner,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    outstanding: usize,
}

impl<S: RenderSurface> Scene<S> {
    /// Create a scene with its camera and grid
    pub fn new(events: Events, config: SceneConfig, surface: S, loader: impl AssetLoader + 'static) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let (completions_tx, completions_rx) = mpsc::channel();

        let camera = Camera::new()
            .with_fov_degrees(config.camera.fov)
            .with_auto_rotate_degrees(config.camera.auto_rotate);
        let grid = Grid::new();
        let camera_id = camera.id();
        let grid_id = grid.id();

        let mut scene = Self {
            id: SceneId::next(),
            events,
            config,
            surface,
            loader: Box::new(loader),
            elements: Vec::new(),
            bound: None,
            states: [StateSnapshot::new(), StateSnapshot::new()],
            diff: StateDiff::default(),
            frame: 0,
            force_render: false,
            running: false,
            canvas_resize: None,
            target_size: (0, 0),
            camera: camera_id,
            grid: grid_id,
            pool,
            spawner,
            completions_tx,
            completions_rx,
            outstanding: 0,
        };
        scene.update_target_size();
        scene.add(Box::new(camera));
        scene.add(Box::new(grid));
        scene
    }

    /// Insert an element. Returns `None` without touching the scene when the
    /// element already has an owner.
    pub fn add(&mut self, mut element: Box<dyn Element>) -> Option<ElementId> {
        if !element.core_mut().attach(self.id) {
            log::warn!("element {} already belongs to a scene, ignoring add", element.id());
            return None;
        }
        element.add();

        for other in &mut self.elements {
            other.on_added(element.as_ref());
        }

        let id = element.id();
        let kind = element.element_type();
        let name = element.name().to_string();
        log::debug!("added {kind} {id} '{name}'");
        self.elements.push(element);

        self.events.fire(Event::ElementAdded { id, kind, name });
        Some(id)
    }

    /// Detach an element and hand it back to the caller
    pub fn remove(&mut self, id: ElementId) -> Option<Box<dyn Element>> {
        let index = self.elements.iter().position(|e| e.id() == id)?;
        let mut element = self.elements.remove(index);
        element.remove();
        element.core_mut().detach();

        let kind = element.element_type();
        log::debug!("removed {kind} {id}");
        self.events.fire(Event::ElementRemoved { id, kind });
        Some(element)
    }

    /// Recompute the aggregate bound from every boundable element
    pub fn update_bound(&mut self) {
        self.bound = self
            .elements
            .iter()
            .filter_map(|e| e.calc_bound())
            .filter(AABB::is_finite)
            .reduce(|acc, b| acc.union(&b));
    }

    /// Aggregate bound, `None` while nothing boundable is in the scene
    pub fn bound(&self) -> Option<AABB> {
        self.bound
    }

    /// Load the configured initial content, add it and start the frame loop.
    /// A single failure fails the whole call and nothing is added.
    pub async fn load(&mut self) -> Result<(), SceneError> {
        let requests: Vec<ModelLoadRequest> = self
            .config
            .initial_model()
            .map(|(url, filename)| ModelLoadRequest::new(url, filename))
            .into_iter()
            .collect();

        let pending = requests.into_iter().map(|r| self.loader.load_model(r));
        let models = match future::try_join_all(pending).await {
            Ok(models) => models,
            Err(err) => {
                log::warn!("startup load failed: {err}");
                let err = Arc::new(err);
                self.events.fire(Event::Error(Some(Arc::clone(&err))));
                return Err(SceneError::Load(err));
            }
        };

        for model in models {
            self.add(Box::new(model));
        }
        self.update_bound();
        self.start();
        Ok(())
    }

    /// Start loading a model in the background. The outcome is reported
    /// through `loaded`/`error` events once a later frame picks it up.
    pub fn load_model(&mut self, url: &str, filename: &str) {
        self.load_model_request(ModelLoadRequest::new(url, filename));
    }

    pub fn load_model_request(&mut self, request: ModelLoadRequest) {
        self.events.fire(Event::Error(None));

        let name = request.display_name().to_string();
        let pending = self.loader.load_model(request);
        let tx = self.completions_tx.clone();
        let task_name = name.clone();
        let spawned = self.spawner.spawn_local(async move {
            let result = pending.await;
            // receiver lives as long as the scene
            let _ = tx.send(Completion {
                name: task_name,
                result,
            });
        });

        match spawned {
            Ok(()) => self.outstanding += 1,
            Err(err) => {
                log::error!("could not schedule load of '{name}': {err}");
                let err = Arc::new(LoadError::Cancelled(name));
                self.events.fire(Event::Error(Some(err)));
            }
        }
    }

    /// Number of background loads not yet applied to the scene
    pub fn pending_loads(&self) -> usize {
        self.outstanding
    }

    /// Block until every background load has completed and been applied.
    /// Returns how many were applied.
    pub fn settle_loads(&mut self) -> usize {
        self.pool.run();
        self.apply_completions()
    }

    fn drain_loads(&mut self) -> usize {
        self.pool.run_until_stalled();
        self.apply_completions()
    }

    fn apply_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(Completion { name, result }) = self.completions_rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            applied += 1;
            match result {
                Ok(model) => {
                    log::info!("loaded '{name}'");
                    self.add(Box::new(model));
                    self.update_bound();
                    self.events.fire(Event::Loaded(name));
                }
                Err(err) => {
                    log::warn!("failed to load '{name}': {err}");
                    self.events.fire(Event::Error(Some(Arc::new(err))));
                }
            }
        }
        applied
    }

    pub fn start(&mut self) {
        if !self.running {
            log::info!("starting frame loop with {} elements", self.elements.len());
            self.running = true;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one frame: apply finished loads, update, and render if dirty
    pub fn step(&mut self, delta_time: f32) -> FrameReport {
        if !self.running {
            return FrameReport::idle(self.frame);
        }

        self.drain_loads();
        self.update(delta_time);

        let render_requested = self.surface.render_requested();
        if render_requested {
            self.pre_render();
            self.surface.render_frame();
            self.post_render();
        }

        let report = FrameReport {
            frame: self.frame,
            running: true,
            render_requested,
            rendered: render_requested,
            changed: self.diff.len(),
        };
        self.frame = self.frame.wrapping_add(1);
        report
    }

    /// Update pass: element updates, snapshot diff, render invalidation,
    /// bound and per-type notifications, post-updates
    pub fn update(&mut self, delta_time: f32) {
        for e in &mut self.elements {
            e.on_update(delta_time);
        }

        let i = (self.frame % 2) as usize;
        let [first, second] = &mut self.states;
        let (current, previous) = if i == 0 { (first, second) } else { (second, first) };

        current.reset();
        for e in &self.elements {
            assert_eq!(
                e.scene(),
                Some(self.id),
                "element {} packed by a scene that does not own it",
                e.id()
            );
            current.pack(e.as_ref());
        }
        current.compare_into(previous, &mut self.diff);

        log::trace!(
            "frame {}: {} added, {} removed, {} moved, {} changed",
            self.frame,
            self.diff.added.len(),
            self.diff.removed.len(),
            self.diff.moved.len(),
            self.diff.changed.len()
        );

        if !self.surface.render_requested() && (self.force_render || !self.diff.is_empty()) {
            self.surface.request_render();
        }
        self.force_render = false;

        if self.diff.contains_boundable() {
            self.update_bound();
            self.events.fire(Event::BoundUpdated);
        }

        for kind in ElementType::ALL {
            if self.diff.contains_type(kind) {
                self.events.fire(Event::Updated(kind));
            }
        }

        for e in &mut self.elements {
            e.on_post_update();
        }
    }

    /// Draw-time setup. Does not change element state.
    pub fn pre_render(&mut self) {
        if let Some((width, height)) = self.canvas_resize.take() {
            log::debug!("resizing surface to {width}x{height}");
            self.surface.resize(width, height);
        }
        self.update_target_size();

        for e in &self.elements {
            e.on_pre_render(&mut self.surface);
        }

        self.events.fire(Event::PreRender);

        if self.config.debug.show_bound {
            if let Some(bound) = self.bound {
                self.surface.draw_wire_box(bound.min, bound.max, Color::GREEN, None);
            }
            for e in &self.elements {
                let Some((local, transform)) = e.local_bound() else {
                    continue;
                };
                self.surface
                    .draw_wire_box(local.min, local.max, Color::BLUE, Some(&transform));
                if let Some(world) = e.calc_bound() {
                    self.surface.draw_wire_box(world.min, world.max, Color::GRAY, None);
                }
            }
        }
    }

    pub fn post_render(&mut self) {
        for e in &mut self.elements {
            e.on_post_render();
        }
        self.events.fire(Event::PostRender);
    }

    /// Force the next frame to render even if nothing changed
    pub fn request_render(&mut self) {
        self.force_render = true;
    }

    /// The graphics device lost its contents, redraw
    pub fn device_restored(&mut self) {
        log::debug!("device restored, forcing render");
        self.force_render = true;
    }

    /// Queue an output resize, applied in the next pre-render pass
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas_resize = Some((width, height));
        self.force_render = true;
    }

    /// Render target size, the device size divided by the pixel scale
    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    fn update_target_size(&mut self) {
        let scale = self.config.effective_pixel_scale();
        self.target_size = (
            (self.surface.width() as f32 / scale).ceil() as u32,
            (self.surface.height() as f32 / scale).ceil() as u32,
        );
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Diff computed by the most recent update
    pub fn last_diff(&self) -> &StateDiff {
        &self.diff
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in insertion order
    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> + '_ {
        self.elements.iter().map(|e| e.as_ref())
    }

    pub fn get(&self, id: ElementId) -> Option<&dyn Element> {
        self.elements.iter().find(|e| e.id() == id).map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut dyn Element> {
        let found: &mut dyn Element = self.elements.iter_mut().find(|e| e.id() == id)?.as_mut();
        Some(found)
    }

    /// Element `id` as its concrete type
    pub fn element<T: Element>(&self, id: ElementId) -> Option<&T> {
        element::downcast_ref(self.get(id)?)
    }

    pub fn element_mut<T: Element>(&mut self, id: ElementId) -> Option<&mut T> {
        element::downcast_mut(self.get_mut(id)?)
    }

    pub fn camera_id(&self) -> ElementId {
        self.camera
    }

    pub fn grid_id(&self) -> ElementId {
        self.grid
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.element(self.camera)
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.element_mut(self.camera)
    }

    pub fn grid_mut(&mut self) -> Option<&mut Grid> {
        self.element_mut(self.grid)
    }
}

impl<S: RenderSurface> Drop for Scene<S> {
    fn drop(&mut self) {
        for e in self.elements.iter_mut().rev() {
            e.remove();
            e.core_mut().detach();
        }
        log::debug!("scene released {} elements", self.elements.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementCore, Model, ModelFormat};
    use crate::events::EventKind;
    use crate::surface::HeadlessSurface;
    use futures::future::LocalBoxFuture;
    use futures::FutureExt;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct BoxLoader;

    impl AssetLoader for BoxLoader {
        fn load_model(&self, request: ModelLoadRequest) -> LocalBoxFuture<'static, Result<Model, LoadError>> {
            let result = if request.url.starts_with("bad") {
                Err(LoadError::UnsupportedSource(request.url.clone()))
            } else {
                let bound = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
                Ok(Model::new(request.display_name(), ModelFormat::Splat, bound, 8))
            };
            future::ready(result).boxed_local()
        }
    }

    fn scene() -> Scene<HeadlessSurface> {
        Scene::new(Events::new(), SceneConfig::default(), HeadlessSurface::default(), BoxLoader)
    }

    fn record(events: &Events) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        events.on_any(move |e| l.borrow_mut().push(e.kind().to_string()));
        log
    }

    #[test]
    fn new_scene_has_camera_then_grid() {
        let scene = scene();
        let kinds: Vec<_> = scene.elements().map(|e| e.element_type()).collect();
        assert_eq!(kinds, vec![ElementType::Camera, ElementType::Grid]);
        assert!(scene.bound().is_none());
        assert!(scene.camera().is_some());
    }

    #[test]
    fn step_before_start_is_idle() {
        let mut scene = scene();
        let report = scene.step(0.016);
        assert!(!report.running && !report.rendered);
        assert_eq!(scene.frame(), 0);
        assert_eq!(scene.surface().render_requests(), 0);
    }

    #[test]
    fn already_owned_element_is_not_added() {
        let mut scene = scene();
        let mut grid = Grid::new();
        grid.core_mut().attach(SceneId::next());

        let before = scene.len();
        assert!(scene.add(Box::new(grid)).is_none());
        assert_eq!(scene.len(), before);
    }

    #[test]
    fn first_frame_renders_then_settles() {
        let mut scene = scene();
        scene.start();

        let first = scene.step(0.016);
        assert!(first.rendered);
        assert_eq!(first.changed, 2);

        let second = scene.step(0.016);
        assert!(!second.render_requested);
        assert_eq!(second.changed, 0);
        assert_eq!(scene.surface().render_requests(), 1);
    }

    #[test]
    fn forced_render_without_changes() {
        let mut scene = scene();
        scene.start();
        scene.step(0.016);

        scene.request_render();
        let report = scene.step(0.016);
        assert!(report.rendered);
        assert_eq!(report.changed, 0);

        // the flag is one-shot
        assert!(!scene.step(0.016).rendered);
    }

    #[test]
    fn resize_applies_on_next_render() {
        let mut config = SceneConfig::default();
        config.camera.pixel_scale = 2.0;
        let mut scene = Scene::new(Events::new(), config, HeadlessSurface::new(801, 600, 1.0), BoxLoader);
        assert_eq!(scene.target_size(), (401, 300));

        scene.start();
        scene.step(0.016);
        scene.resize(1024, 768);
        assert_eq!(scene.surface().width(), 801);

        assert!(scene.step(0.016).rendered);
        assert_eq!(scene.surface().width(), 1024);
        assert_eq!(scene.target_size(), (512, 384));
    }

    #[test]
    fn startup_load_adds_model_and_starts() {
        let mut config = SceneConfig::default();
        config.model.url = Some("garden.ply".into());
        let mut scene = Scene::new(Events::new(), config, HeadlessSurface::default(), BoxLoader);

        pollster::block_on(scene.load()).unwrap();
        assert!(scene.is_running());
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.bound(), Some(AABB::new(Vec3::splat(-1.0), Vec3::ONE)));
    }

    #[test]
    fn startup_failure_adds_nothing() {
        let mut config = SceneConfig::default();
        config.model.url = Some("bad.ply".into());
        let mut scene = Scene::new(Events::new(), config, HeadlessSurface::default(), BoxLoader);
        let log = record(scene.events());

        let err = pollster::block_on(scene.load()).unwrap_err();
        assert!(matches!(err, SceneError::Load(_)));
        assert!(!scene.is_running());
        assert_eq!(scene.len(), 2);
        assert_eq!(*log.borrow(), vec!["error"]);
    }

    #[test]
    fn background_load_is_applied_by_step() {
        let mut scene = scene();
        scene.start();
        scene.step(0.016);

        let loaded = Rc::new(RefCell::new(Vec::new()));
        let l = loaded.clone();
        scene.events().on(EventKind::Loaded, move |e| {
            if let Event::Loaded(name) = e {
                l.borrow_mut().push(name.clone());
            }
        });

        scene.load_model("models/tree.ply", "");
        assert_eq!(scene.pending_loads(), 1);
        let report = scene.step(0.016);
        assert_eq!(scene.pending_loads(), 0);
        assert!(report.rendered);
        assert_eq!(*loaded.borrow(), vec!["tree.ply".to_string()]);
        assert!(scene.bound().is_some());
    }

    #[test]
    fn removed_element_is_reported_by_next_diff() {
        let mut scene = scene();
        scene.start();
        scene.step(0.016);

        let grid = scene.remove(scene.grid_id()).unwrap();
        assert!(grid.scene().is_none());

        let report = scene.step(0.016);
        assert!(report.rendered);
        assert_eq!(scene.last_diff().removed, vec![grid.id()]);
    }

    #[test]
    #[should_panic(expected = "does not own it")]
    fn packing_a_foreign_element_panics() {
        let mut scene = scene();
        scene.start();
        let grid = scene.grid_mut().unwrap();
        *grid.core_mut() = ElementCore::new();
        scene.step(0.016);
    }
}
