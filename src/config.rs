//! Viewer configuration
//!
//! Read from camelCase JSON. Individual values can be overridden with
//! `section.key=value` strings, applied to the JSON tree before it is
//! deserialized.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad override '{0}', expected key.path=value")]
    Override(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub model: ModelConfig,
    pub camera: CameraConfig,
    pub debug: DebugConfig,
}

/// Initial content loaded at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelConfig {
    /// Source locator, nothing is loaded when unset
    pub url: Option<String>,
    /// Display name, defaults to the last segment of `url`
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    /// Device pixels per render target pixel
    pub pixel_scale: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Orbit speed in degrees per second, 0 disables
    pub auto_rotate: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pixel_scale: 1.0,
            fov: 50.0,
            auto_rotate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebugConfig {
    /// Draw the aggregate and per-element bounds
    pub show_bound: bool,
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Apply `key.path=value` overrides on top of this configuration
    pub fn with_overrides<I, S>(self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = serde_json::to_value(&self)?;
        for entry in overrides {
            let (path, value) = parse_override(entry.as_ref())?;
            set_path(&mut tree, &path, value);
        }
        Ok(serde_json::from_value(tree)?)
    }

    /// Pixel scale clamped to at least 1
    pub fn effective_pixel_scale(&self) -> f32 {
        let scale = self.camera.pixel_scale;
        if scale.is_finite() && scale > 1.0 {
            scale
        } else {
            1.0
        }
    }

    /// Request for the configured initial model, if any
    pub fn initial_model(&self) -> Option<(&str, &str)> {
        let url = self.model.url.as_deref()?;
        let filename = self.model.filename.as_deref().unwrap_or("");
        Some((url, filename))
    }
}

/// Split `a.b=value` into its key path and a JSON value.
/// The value is parsed as JSON when possible and kept as a string otherwise.
pub fn parse_override(entry: &str) -> Result<(Vec<String>, Value), ConfigError> {
    let (key, raw) = entry
        .split_once('=')
        .ok_or_else(|| ConfigError::Override(entry.to_string()))?;
    let path: Vec<String> = key.trim().split('.').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        return Err(ConfigError::Override(entry.to_string()));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path, value))
}

fn set_path(tree: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = tree;
    for key in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map.entry(key.clone()).or_insert(Value::Null);
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}
