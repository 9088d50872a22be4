pub mod cli;
pub mod config;
pub mod element;
pub mod events;
pub mod frame;
pub mod loaders;
pub mod math;
pub mod scene;
pub mod state;
pub mod surface;

pub use config::SceneConfig;
pub use element::{Element, ElementId, ElementType};
pub use events::{Event, EventKind, Events};
pub use loaders::{AssetLoader, FileAssetLoader, LoadError, ModelLoadRequest};
pub use scene::{FrameReport, Scene, SceneError};
pub use surface::{HeadlessSurface, RenderSurface};
