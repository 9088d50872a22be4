#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use glam::Vec3;

use splat_host::element::{ElementCore, Model, ModelFormat};
use splat_host::math::AABB;
use splat_host::state::StatePacker;
use splat_host::{AssetLoader, Element, ElementId, ElementType, Event, Events, LoadError, ModelLoadRequest};

/// In-memory loader: known urls resolve to a unit-cube model placed at a
/// scripted offset, everything else fails. Gated urls wait for the test.
#[derive(Clone, Default)]
pub struct ScriptedLoader {
    models: Rc<RefCell<HashMap<String, AABB>>>,
    gates: Rc<RefCell<HashMap<String, oneshot::Receiver<()>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(self, url: &str, bound: AABB) -> Self {
        self.models.borrow_mut().insert(url.to_string(), bound);
        self
    }

    /// Hold loads of `url` until the returned sender fires or is dropped
    pub fn gate(&self, url: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(url.to_string(), rx);
        tx
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl AssetLoader for ScriptedLoader {
    fn load_model(&self, request: ModelLoadRequest) -> LocalBoxFuture<'static, Result<Model, LoadError>> {
        self.requests.borrow_mut().push(request.url.clone());
        let result = match self.models.borrow().get(&request.url) {
            Some(bound) => Ok(Model::new(request.display_name(), ModelFormat::Splat, *bound, 1)),
            None => Err(LoadError::UnsupportedSource(request.url.clone())),
        };
        match self.gates.borrow_mut().remove(&request.url) {
            Some(gate) => async move {
                let _ = gate.await;
                result
            }
            .boxed_local(),
            None => future::ready(result).boxed_local(),
        }
    }
}

pub fn unit_box_at(offset: Vec3) -> AABB {
    AABB::new(offset - Vec3::splat(0.5), offset + Vec3::splat(0.5))
}

/// Test element with a packed value, an optional bound and a record of the
/// `on_added` notifications it received
pub struct Stub {
    core: ElementCore,
    kind: ElementType,
    pub value: u32,
    pub bound: Option<AABB>,
    pub seen: Vec<ElementId>,
    pub hooks: Rc<RefCell<Vec<String>>>,
}

impl Stub {
    pub fn new(kind: ElementType) -> Self {
        Self {
            core: ElementCore::new(),
            kind,
            value: 0,
            bound: None,
            seen: Vec::new(),
            hooks: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_bound(mut self, bound: AABB) -> Self {
        self.bound = Some(bound);
        self
    }

    pub fn with_hooks(mut self, hooks: Rc<RefCell<Vec<String>>>) -> Self {
        self.hooks = hooks;
        self
    }

    fn hook(&self, name: &str) {
        self.hooks.borrow_mut().push(format!("{}:{}", name, self.id()));
    }
}

impl Element for Stub {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn element_type(&self) -> ElementType {
        self.kind
    }

    fn add(&mut self) {
        self.hook("add");
    }

    fn remove(&mut self) {
        self.hook("remove");
    }

    fn on_added(&mut self, other: &dyn Element) {
        self.seen.push(other.id());
    }

    fn on_update(&mut self, _delta_time: f32) {
        self.hook("update");
    }

    fn on_post_update(&mut self) {
        self.hook("post_update");
    }

    fn on_pre_render(&self, _surface: &mut dyn splat_host::RenderSurface) {
        self.hook("pre_render");
    }

    fn on_post_render(&mut self) {
        self.hook("post_render");
    }

    fn calc_bound(&self) -> Option<AABB> {
        self.bound
    }

    fn pack(&self, packer: &mut StatePacker<'_>) {
        packer.u32(self.value);
        if let Some(bound) = self.bound {
            packer.vec3(bound.min);
            packer.vec3(bound.max);
        }
    }
}

/// Every event fired on `events`, as wire names
pub fn record(events: &Events) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    events.on_any(move |e| {
        let entry = match e {
            Event::Error(None) => "error:null".to_string(),
            Event::Error(Some(err)) => format!("error:{err}"),
            Event::Loaded(name) => format!("loaded:{name}"),
            other => other.kind().to_string(),
        };
        l.borrow_mut().push(entry);
    });
    log
}

pub fn count(log: &Rc<RefCell<Vec<String>>>, name: &str) -> usize {
    log.borrow().iter().filter(|e| *e == name).count()
}
