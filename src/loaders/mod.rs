pub mod gltf;
pub mod ply;

use std::path::{Path, PathBuf};

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;

use crate::element::{Model, ModelFormat};
use crate::math::AABB;

pub use self::gltf::{load_gltf_file, load_gltf_slice, MeshGeometry};
pub use self::ply::read_ply_positions;

/// Errors produced while fetching or decoding a model
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed PLY: {0}")]
    Ply(String),

    #[error("glTF import failed: {0}")]
    Gltf(#[from] ::gltf::Error),

    #[error("model '{0}' contains no geometry")]
    EmptyModel(String),

    #[error("load of '{0}' was abandoned before completing")]
    Cancelled(String),
}

/// A request to load a single model
#[derive(Debug, Clone)]
pub struct ModelLoadRequest {
    /// Source locator, a file path or `file://` URL
    pub url: String,
    /// Payload already in memory; skips fetching `url`
    pub contents: Option<Vec<u8>>,
    /// Display name, also used to pick the decoder
    pub filename: String,
}

impl ModelLoadRequest {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            contents: None,
            filename: filename.into(),
        }
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Name used for display: the filename, or the last path segment of the url
    pub fn display_name(&self) -> &str {
        if !self.filename.is_empty() {
            return &self.filename;
        }
        self.url.rsplit(['/', '\\']).next().unwrap_or(self.url.as_str())
    }
}

/// Asset-loading collaborator. Resolves with a ready-to-add model.
pub trait AssetLoader {
    fn load_model(&self, request: ModelLoadRequest) -> LocalBoxFuture<'static, Result<Model, LoadError>>;
}

/// Decoder picked from a file extension
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModelKind {
    Ply,
    Gltf,
}

impl ModelKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ply" => Some(ModelKind::Ply),
            "gltf" | "glb" => Some(ModelKind::Gltf),
            _ => None,
        }
    }
}

/// Loads models from the local filesystem, reading files on a worker thread
#[derive(Debug, Clone, Default)]
pub struct FileAssetLoader {
    base_dir: Option<PathBuf>,
}

impl FileAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, LoadError> {
        let path = match url.split_once("://") {
            None => url,
            Some(("file", rest)) => rest,
            Some(_) => return Err(LoadError::UnsupportedSource(url.to_string())),
        };
        let path = Path::new(path);
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl AssetLoader for FileAssetLoader {
    fn load_model(&self, request: ModelLoadRequest) -> LocalBoxFuture<'static, Result<Model, LoadError>> {
        let name = request.display_name().to_string();
        let kind = match ModelKind::from_name(&name).or_else(|| ModelKind::from_name(&request.url)) {
            Some(kind) => kind,
            None => return future::ready(Err(LoadError::UnsupportedFormat(name))).boxed_local(),
        };

        if let Some(contents) = request.contents {
            return future::ready(decode_model(&name, kind, &contents)).boxed_local();
        }

        let path = match self.resolve(&request.url) {
            Ok(path) => path,
            Err(err) => return future::ready(Err(err)).boxed_local(),
        };

        log::info!("loading {} from {}", name, path.display());
        let (tx, rx) = oneshot::channel();
        let worker_name = name.clone();
        std::thread::spawn(move || {
            let result = match kind {
                ModelKind::Gltf => load_gltf_file(&path).and_then(|mesh| mesh_model(&worker_name, mesh)),
                ModelKind::Ply => std::fs::read(&path)
                    .map_err(|source| LoadError::Io { path: path.clone(), source })
                    .and_then(|bytes| decode_model(&worker_name, kind, &bytes)),
            };
            // receiver gone means nobody is waiting for this model anymore
            let _ = tx.send(result);
        });

        rx.map(move |received| received.unwrap_or(Err(LoadError::Cancelled(name))))
            .boxed_local()
    }
}

/// Decode an in-memory model payload
pub fn decode_model(name: &str, kind: ModelKind, bytes: &[u8]) -> Result<Model, LoadError> {
    match kind {
        ModelKind::Ply => {
            let positions = read_ply_positions(bytes)?;
            let bound = AABB::from_points(positions.iter().copied())
                .ok_or_else(|| LoadError::EmptyModel(name.to_string()))?;
            Ok(Model::new(name, ModelFormat::Splat, bound, positions.len()))
        }
        ModelKind::Gltf => mesh_model(name, load_gltf_slice(bytes)?),
    }
}

fn mesh_model(name: &str, mesh: MeshGeometry) -> Result<Model, LoadError> {
    let bound = mesh.bound.ok_or_else(|| LoadError::EmptyModel(name.to_string()))?;
    Ok(Model::new(name, ModelFormat::Mesh, bound, mesh.triangles))
}
