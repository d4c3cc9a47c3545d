//! Configuration types for the viewer.
//!
//! Loaded from TOML by the host and injected into the viewer at construction.
//! Every field has a default so a partial file (or none at all) is valid.

use crate::errors::SessionError;
use rfb_common::ZoomFactor;
use rfb_pixelbuffer::ScaleFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewerConfig {
    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Input settings.
    #[serde(default)]
    pub input: InputConfig,
    /// Region selector settings.
    #[serde(default)]
    pub selector: SelectorConfig,
    /// Run mode settings.
    #[serde(default)]
    pub run: RunConfig,
}

/// Display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Initial zoom percentage.
    #[serde(default = "default_zoom_percent")]
    pub zoom_percent: i64,
    /// Filter used for the zoomed image.
    #[serde(default)]
    pub filter: ScaleFilter,
    /// Flash recently updated regions.
    #[serde(default)]
    pub flash_updates: bool,
    /// How long an update flash stays visible, in milliseconds.
    #[serde(default = "default_flash_duration_ms")]
    pub flash_duration_ms: u64,
}

fn default_zoom_percent() -> i64 {
    100
}

fn default_flash_duration_ms() -> u64 {
    400
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            zoom_percent: default_zoom_percent(),
            filter: ScaleFilter::default(),
            flash_updates: false,
            flash_duration_ms: default_flash_duration_ms(),
        }
    }
}

/// What a reserved key combination does when it is consumed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReservedAction {
    /// Kept for the host UI (menus, accelerators); nothing else happens.
    Local,
    /// Flip the read-only flag through the host controls.
    ToggleReadOnly,
    /// Turn the region selector on or off.
    ToggleSelectionMode,
}

/// A key combination that is never forwarded to the remote desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedShortcutConfig {
    /// Combination such as `"Ctrl+Shift+F10"`.
    pub keys: String,
    /// Action run when the combination is pressed.
    #[serde(default = "default_reserved_action")]
    pub action: ReservedAction,
}

fn default_reserved_action() -> ReservedAction {
    ReservedAction::Local
}

/// Input configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Start in read-only mode (no input sent to the remote desktop).
    #[serde(default)]
    pub read_only: bool,
    /// Reserved key combinations.
    #[serde(default = "default_reserved")]
    pub reserved: Vec<ReservedShortcutConfig>,
}

fn default_reserved() -> Vec<ReservedShortcutConfig> {
    vec![
        ReservedShortcutConfig {
            keys: "F8".to_string(),
            action: ReservedAction::Local,
        },
        ReservedShortcutConfig {
            keys: "Ctrl+Shift+F10".to_string(),
            action: ReservedAction::ToggleReadOnly,
        },
        ReservedShortcutConfig {
            keys: "Ctrl+Shift+F11".to_string(),
            action: ReservedAction::ToggleSelectionMode,
        },
    ]
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            reserved: default_reserved(),
        }
    }
}

/// Region selector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Hit-test tolerance around corners and edges, in local pixels.
    #[serde(default = "default_tolerance")]
    pub tolerance: u32,
    /// Record single points instead of rectangles.
    #[serde(default)]
    pub point_mode: bool,
}

fn default_tolerance() -> u32 {
    3
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            point_mode: false,
        }
    }
}

/// Run mode configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// No user is watching: forwarding failures terminate the host.
    #[serde(default)]
    pub unattended: bool,
    /// Directory where committed regions are written as PNG files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_dir: Option<PathBuf>,
}

impl ViewerConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses a TOML document and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        let config: Self =
            toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), SessionError> {
        ZoomFactor::new(self.display.zoom_percent)
            .map_err(|e| SessionError::Config(e.to_string()))?;

        if self.display.flash_updates && self.display.flash_duration_ms == 0 {
            return Err(SessionError::Config(
                "Flash duration cannot be 0 when update flashing is enabled".to_string(),
            ));
        }

        if self.selector.tolerance == 0 {
            return Err(SessionError::Config(
                "Selector tolerance must be at least 1 pixel".to_string(),
            ));
        }

        if let Some(bad) = self.input.reserved.iter().find(|r| r.keys.trim().is_empty()) {
            return Err(SessionError::Config(format!(
                "Reserved shortcut for {:?} has no keys",
                bad.action
            )));
        }

        Ok(())
    }

    /// Initial zoom factor.
    pub fn zoom(&self) -> Result<ZoomFactor, SessionError> {
        ZoomFactor::new(self.display.zoom_percent).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Returns the update flash duration.
    #[must_use]
    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.display.flash_duration_ms)
    }
}

/// Builder for creating a `ViewerConfig`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: ViewerConfig,
}

impl ConfigBuilder {
    /// Sets the initial zoom percentage.
    #[must_use]
    pub fn zoom_percent(mut self, percent: i64) -> Self {
        self.config.display.zoom_percent = percent;
        self
    }

    /// Sets the scaling filter.
    #[must_use]
    pub fn filter(mut self, filter: ScaleFilter) -> Self {
        self.config.display.filter = filter;
        self
    }

    /// Enables or disables update flashing.
    #[must_use]
    pub fn flash_updates(mut self, enabled: bool) -> Self {
        self.config.display.flash_updates = enabled;
        self
    }

    /// Sets the initial read-only flag.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.input.read_only = read_only;
        self
    }

    /// Adds a reserved key combination.
    #[must_use]
    pub fn reserve(mut self, keys: impl Into<String>, action: ReservedAction) -> Self {
        self.config.input.reserved.push(ReservedShortcutConfig {
            keys: keys.into(),
            action,
        });
        self
    }

    /// Sets the selector hit-test tolerance.
    #[must_use]
    pub fn tolerance(mut self, tolerance: u32) -> Self {
        self.config.selector.tolerance = tolerance;
        self
    }

    /// Enables point mode.
    #[must_use]
    pub fn point_mode(mut self, point_mode: bool) -> Self {
        self.config.selector.point_mode = point_mode;
        self
    }

    /// Enables unattended mode.
    #[must_use]
    pub fn unattended(mut self, unattended: bool) -> Self {
        self.config.run.unattended = unattended;
        self
    }

    /// Sets the capture directory.
    #[must_use]
    pub fn capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.run.capture_dir = Some(dir.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<ViewerConfig, SessionError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
