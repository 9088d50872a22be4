// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, SceneConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "splat-host")]
#[command(about = "Headless splat scene host", long_about = None)]
pub struct Cli {
    /// JSON scene configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model to load at startup, overrides model.url
    #[arg(long)]
    pub model: Option<String>,

    /// Configuration override, e.g. `camera.pixelScale=2` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Number of frames to run
    #[arg(long, default_value_t = 120)]
    pub frames: u64,

    /// Surface width in device pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Surface height in device pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Draw scene and element bounds
    #[arg(long = "show-bound", default_value = "false")]
    pub show_bound: bool,
}

impl Cli {
    /// Resolve the scene configuration: file, then `--set` overrides, then flags
    pub fn scene_config(&self) -> Result<SceneConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => SceneConfig::load(path)?,
            None => SceneConfig::default(),
        };
        let mut config = base.with_overrides(&self.overrides)?;
        if let Some(model) = &self.model {
            config.model.url = Some(model.clone());
        }
        if self.show_bound {
            config.debug.show_bound = true;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["splat-host"]);
        assert_eq!(cli.frames, 120);
        assert_eq!((cli.width, cli.height), (1280, 720));
        assert_eq!(cli.scene_config().unwrap(), SceneConfig::default());
    }

    #[test]
    fn flags_win_over_overrides() {
        let cli = Cli::parse_from([
            "splat-host",
            "--set",
            "model.url=a.ply",
            "--set",
            "camera.fov=70",
            "--model",
            "b.ply",
            "--show-bound",
        ]);
        let config = cli.scene_config().unwrap();
        assert_eq!(config.model.url.as_deref(), Some("b.ply"));
        assert_eq!(config.camera.fov, 70.0);
        assert!(config.debug.show_bound);
    }
}
