//! Configuration management for the IVI controller daemon
//!
//! Loads, validates and saves the TOML configuration: log level, controller
//! paths, the outputs the headless layout exposes and the content surfaces it
//! announces at start-up.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scene::{PixelFormat, ScreenInfo};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IviConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    /// Outputs of the headless layout
    #[serde(default = "IviConfig::default_screens")]
    pub screens: Vec<ScreenConfig>,

    #[serde(default)]
    pub headless: HeadlessConfig,
}

/// General daemon settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default log filter (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

/// Controller paths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Directory relative screenshot filenames resolve against
    pub screenshot_dir: String,

    /// Unix socket the daemon listens on
    pub socket_path: String,
}

/// One output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenConfig {
    pub id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Headless layout settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Content surfaces announced at start-up
    pub surfaces: Vec<HeadlessSurfaceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadlessSurfaceConfig {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub process_name: String,
    #[serde(default = "HeadlessSurfaceConfig::default_pixel_format")]
    pub pixel_format: PixelFormat,
}

impl Default for IviConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            controller: ControllerConfig::default(),
            screens: Self::default_screens(),
            headless: HeadlessConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: "/tmp".to_string(),
            socket_path: "/tmp/ivi-controller.sock".to_string(),
        }
    }
}

impl HeadlessSurfaceConfig {
    fn default_pixel_format() -> PixelFormat {
        PixelFormat::Rgba8888
    }
}

impl ScreenConfig {
    pub fn to_info(&self) -> ScreenInfo {
        ScreenInfo {
            id: self.id,
            name: self.name.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl ControllerConfig {
    /// Screenshot directory with `~` expanded
    pub fn screenshot_path(&self) -> PathBuf {
        expand_home(Path::new(&self.screenshot_dir))
    }

    /// Socket path with `~` expanded
    pub fn socket_path(&self) -> PathBuf {
        expand_home(Path::new(&self.socket_path))
    }
}

impl IviConfig {
    fn default_screens() -> Vec<ScreenConfig> {
        vec![ScreenConfig {
            id: 0,
            name: "HEADLESS-1".to_string(),
            width: 1920,
            height: 1080,
        }]
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_home(path.as_ref());

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: IviConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            anyhow::bail!("Invalid log_level: {}", self.general.log_level);
        }

        if self.controller.screenshot_dir.is_empty() {
            anyhow::bail!("screenshot_dir must not be empty");
        }
        if self.controller.socket_path.is_empty() {
            anyhow::bail!("socket_path must not be empty");
        }

        if self.screens.is_empty() {
            anyhow::bail!("At least one screen must be configured");
        }
        let mut ids = HashSet::new();
        for screen in &self.screens {
            if !ids.insert(screen.id) {
                anyhow::bail!("Duplicate screen id {}", screen.id);
            }
            if screen.width == 0 || screen.height == 0 {
                anyhow::bail!("Screen {} has an empty size", screen.id);
            }
        }

        let mut ids = HashSet::new();
        for surface in &self.headless.surfaces {
            if !ids.insert(surface.id) {
                anyhow::bail!("Duplicate headless surface id {}", surface.id);
            }
            if surface.width == 0 || surface.height == 0 {
                anyhow::bail!("Headless surface {} has an empty size", surface.id);
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    pub fn screen_infos(&self) -> Vec<ScreenInfo> {
        self.screens.iter().map(ScreenConfig::to_info).collect()
    }
}

/// Expands a leading `~` to `$HOME`; paths are returned unchanged when
/// `HOME` is unset
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
