use crate::error::{FgError, FgResult};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Options consumed at context-creation and dispatch time.
///
/// The engine treats a config value as a read-only snapshot; see [`crate::Session::config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FgConfig {
    #[serde(default)]
    pub swapchain: SwapchainConfig,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapchainConfig {
    /// Guard swapchain tagging and lifecycle with the cross-thread exclusion lock.
    #[serde(default)]
    pub use_mutex: bool,
    /// Reproduce the asymmetric hudless acquire/release rule instead of strict locking.
    #[serde(default)]
    pub hudless_legacy_locking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    #[serde(default)]
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub inverted_depth: bool,
    #[serde(default)]
    pub ndc_velocity: bool,
    #[serde(default)]
    pub jittered_mv: bool,
    #[serde(default = "default_scene_change_threshold")]
    pub scene_change_threshold: f32,
    #[serde(default = "default_max_interpolated_frames")]
    pub max_interpolated_frames: u32,
}

fn default_scene_change_threshold() -> f32 {
    0.5
}
fn default_max_interpolated_frames() -> u32 {
    1
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            library: None,
            inverted_depth: false,
            ndc_velocity: false,
            jittered_mv: false,
            scene_change_threshold: default_scene_change_threshold(),
            max_interpolated_frames: default_max_interpolated_frames(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub boost: bool,
    /// Minimum frame interval in microseconds; 0 disables the limiter.
    #[serde(default)]
    pub min_interval_us: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub show_only_interpolation: bool,
    #[serde(default)]
    pub tag_interpolated_frames: bool,
    #[serde(default)]
    pub present_failed_interpolation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Verbosity requested from backend libraries: "debug" or "warning".
    #[serde(default = "default_backend_level")]
    pub backend_level: String,
}

fn default_backend_level() -> String {
    "warning".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            backend_level: default_backend_level(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub file: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
}

impl ConfigPaths {
    #[inline]
    pub fn new<P>(file: P, root_dir: Option<PathBuf>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            file: Some(file.into()),
            root_dir,
        }
    }

    #[inline]
    pub fn none() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    fn resolved_file(&self) -> Option<PathBuf> {
        let file = self.file.as_deref()?;
        match (&self.root_dir, file.is_relative()) {
            (Some(root), true) => Some(root.join(file)),
            _ => Some(file.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File,
    Env,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub key: &'static str,
    pub source: ConfigSource,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoadReport {
    pub file: Option<PathBuf>,
    pub overrides: Vec<ConfigOverride>,
}

/// Environment variables applied over the file layer.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub use_mutex: Option<bool>,
    pub hudless_legacy_locking: Option<bool>,
    pub interpolation_library: Option<PathBuf>,
    pub pacing_library: Option<PathBuf>,
    pub pacing_boost: Option<bool>,
    pub pacing_interval_us: Option<u32>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            use_mutex: lookup("FRAMEGEN_USE_MUTEX").and_then(|v| parse_bool(&v)),
            hudless_legacy_locking: lookup("FRAMEGEN_HUDLESS_LEGACY_LOCKING")
                .and_then(|v| parse_bool(&v)),
            interpolation_library: lookup("FRAMEGEN_XEFG_LIBRARY")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            pacing_library: lookup("FRAMEGEN_XELL_LIBRARY")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            pacing_boost: lookup("FRAMEGEN_PACING_BOOST").and_then(|v| parse_bool(&v)),
            pacing_interval_us: lookup("FRAMEGEN_PACING_INTERVAL_US")
                .and_then(|v| v.trim().parse().ok()),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config with layering: defaults -> file -> env.
    pub fn load_json(paths: &ConfigPaths) -> FgResult<(FgConfig, ConfigLoadReport)> {
        Self::load_json_with_env(paths, &EnvOverrides::from_env())
    }

    pub fn load_json_with_env(
        paths: &ConfigPaths,
        env: &EnvOverrides,
    ) -> FgResult<(FgConfig, ConfigLoadReport)> {
        let mut cfg = FgConfig::default();
        let mut report = ConfigLoadReport::default();

        if let Some(path) = paths.resolved_file() {
            if path.is_file() {
                cfg = read_file(&path)?;
                report.overrides.push(ConfigOverride {
                    key: "file",
                    source: ConfigSource::File,
                    value: path.display().to_string(),
                });
                report.file = Some(path);
            } else {
                // Missing file is not an error.
                log::debug!(target: "framegen", "config: '{}' not found, using defaults", path.display());
            }
        }

        apply_env(&mut cfg, &mut report, env);
        Ok((cfg, report))
    }
}

fn read_file(path: &Path) -> FgResult<FgConfig> {
    let data = fs::read_to_string(path).map_err(|e| FgError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&data).map_err(|e| FgError::Config {
        path: path.to_path_buf(),
        message: format!("parse failed (json): {e}"),
    })
}

fn apply_env(cfg: &mut FgConfig, report: &mut ConfigLoadReport, env: &EnvOverrides) {
    let mut push = |key: &'static str, value: String| {
        report.overrides.push(ConfigOverride {
            key,
            source: ConfigSource::Env,
            value,
        });
    };

    if let Some(v) = env.use_mutex {
        cfg.swapchain.use_mutex = v;
        push("swapchain.use_mutex", v.to_string());
    }
    if let Some(v) = env.hudless_legacy_locking {
        cfg.swapchain.hudless_legacy_locking = v;
        push("swapchain.hudless_legacy_locking", v.to_string());
    }
    if let Some(v) = env.interpolation_library.clone() {
        push("interpolation.library", v.display().to_string());
        cfg.interpolation.library = Some(v);
    }
    if let Some(v) = env.pacing_library.clone() {
        push("pacing.library", v.display().to_string());
        cfg.pacing.library = Some(v);
    }
    if let Some(v) = env.pacing_boost {
        cfg.pacing.boost = v;
        push("pacing.boost", v.to_string());
    }
    if let Some(v) = env.pacing_interval_us {
        cfg.pacing.min_interval_us = v;
        push("pacing.min_interval_us", v.to_string());
    }
}
