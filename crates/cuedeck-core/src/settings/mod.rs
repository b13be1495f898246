//! Editor Settings
//!
//! Persistent engine configuration with:
//! - Atomic file writes (temp file + rename)
//! - Defaults for every missing section
//! - Clamping of out-of-range values on load and save
//!
//! Storage location: {config_dir}/cuedeck/settings.json

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    captions::DEFAULT_WRAP_WIDTH,
    commands::{ConformMode, ConformOptions, DEFAULT_MAX_HISTORY, DEFAULT_MAX_PASSES},
    CoreError, CoreResult,
};

/// Settings schema version
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub conform: ConformSettings,

    #[serde(default)]
    pub history: HistorySettings,

    #[serde(default)]
    pub transcript: TranscriptSettings,

    #[serde(default)]
    pub events: EventSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            conform: ConformSettings::default(),
            history: HistorySettings::default(),
            transcript: TranscriptSettings::default(),
            events: EventSettings::default(),
        }
    }
}

/// Conformance settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConformSettings {
    #[serde(default)]
    pub mode: ConformMode,

    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for ConformSettings {
    fn default() -> Self {
        Self {
            mode: ConformMode::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

/// Undo history settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistorySettings {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

/// Transcript rendering settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSettings {
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            wrap_width: DEFAULT_WRAP_WIDTH,
        }
    }
}

fn default_wrap_width() -> usize {
    DEFAULT_WRAP_WIDTH
}

/// Event channel settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSettings {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

impl EditorSettings {
    /// Clamps values so persisted state is always valid
    pub fn normalize(&mut self) {
        let before = self.clone();

        self.version = SETTINGS_VERSION;
        self.conform.max_passes = self.conform.max_passes.clamp(1, 256);
        self.history.max_history = self.history.max_history.clamp(1, 100_000);
        self.transcript.wrap_width = self.transcript.wrap_width.clamp(20, 400);
        self.events.channel_capacity = self.events.channel_capacity.clamp(1, 4096);

        if *self != before {
            warn!("Settings contained out-of-range values and were normalized");
        }
    }

    /// Conformance options described by these settings
    pub fn conform_options(&self) -> ConformOptions {
        ConformOptions::default()
            .with_mode(self.conform.mode)
            .with_max_passes(self.conform.max_passes)
    }

    /// Loads settings, falling back to defaults when the file is missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("Settings file not found, using defaults");
            return Self::default();
        }

        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Loads and normalizes settings from disk
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&content)?;
        settings.normalize();
        Ok(settings)
    }

    /// Saves normalized settings using an atomic write (temp file + rename)
    pub fn save(&self, path: &Path) -> CoreResult<Self> {
        let mut normalized = self.clone();
        normalized.normalize();

        let content = serde_json::to_string_pretty(&normalized)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CoreError::IoError(e)
        })?;

        info!("Settings saved to {:?}", path);
        Ok(normalized)
    }
}

// =============================================================================
// Tests
// =============================================================================
