//! Installation settings
//!
//! Every tunable constant of the installation lives in one XML file. Missing
//! fields fall back to their defaults so a partial file is valid.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::AnalyserConfig;
use crate::output::CompositeParams;
use crate::scene::ZoomAnimation;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),

    #[error("Could not find config directory")]
    NoConfigDir,
}

/// Where loaded settings came from
#[derive(Debug)]
pub enum SettingsOrigin {
    /// No file given and none at the default path
    Defaults,
    File(PathBuf),
    /// The file could not be read, defaults are used instead
    Fallback { path: PathBuf, error: SettingsError },
}

impl SettingsOrigin {
    /// Report the outcome once logging is up
    pub fn log(&self) {
        match self {
            SettingsOrigin::Defaults => tracing::info!("Using default settings"),
            SettingsOrigin::File(path) => tracing::info!("Loaded settings from {:?}", path),
            SettingsOrigin::Fallback { path, error } => {
                tracing::warn!("Failed to load settings from {:?}, using defaults: {}", path, error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "InstallationSettings", default)]
pub struct InstallationSettings {
    #[serde(rename = "windowWidth")]
    pub window_width: u32,

    #[serde(rename = "windowHeight")]
    pub window_height: u32,

    #[serde(rename = "fullscreen")]
    pub fullscreen: bool,

    /// Side of the square offscreen colour and mask targets
    #[serde(rename = "bufferSize")]
    pub buffer_size: u32,

    /// Output clear colour as 0xRRGGBB
    #[serde(rename = "clearColor")]
    pub clear_color: u32,

    /// JSON scene descriptor; without one only the quad and mask render
    #[serde(rename = "scenePath", skip_serializing_if = "Option::is_none")]
    pub scene_path: Option<String>,

    #[serde(rename = "audioEnabled")]
    pub audio_enabled: bool,

    /// Input device name; the default device when absent
    #[serde(rename = "audioDevice", skip_serializing_if = "Option::is_none")]
    pub audio_device: Option<String>,

    #[serde(rename = "fftSize")]
    pub fft_size: usize,

    #[serde(rename = "smoothing")]
    pub smoothing: f32,

    #[serde(rename = "minDecibels")]
    pub min_decibels: f32,

    #[serde(rename = "maxDecibels")]
    pub max_decibels: f32,

    /// Arrow key step
    #[serde(rename = "nudgeStep")]
    pub nudge_step: f32,

    /// Shift + arrow key step
    #[serde(rename = "coarseNudgeStep")]
    pub coarse_nudge_step: f32,

    #[serde(rename = "showMarkers")]
    pub show_markers: bool,

    #[serde(rename = "showMasked")]
    pub show_masked: bool,

    #[serde(rename = "showInfo")]
    pub show_info: bool,

    #[serde(rename = "animationSpeed")]
    pub animation_speed: f32,

    #[serde(rename = "angleSpeed")]
    pub angle_speed: f32,

    #[serde(rename = "spawnDistance")]
    pub spawn_distance: f32,

    /// Log file written next to console output
    #[serde(rename = "logFile", skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl Default for InstallationSettings {
    fn default() -> Self {
        let analyser = AnalyserConfig::default();
        let animation = ZoomAnimation::default();
        Self {
            window_width: 1280,
            window_height: 720,
            fullscreen: false,
            buffer_size: 2048,
            clear_color: 0x000000,
            scene_path: None,
            audio_enabled: true,
            audio_device: None,
            fft_size: analyser.fft_size,
            smoothing: analyser.smoothing,
            min_decibels: analyser.min_db,
            max_decibels: analyser.max_db,
            nudge_step: 0.001,
            coarse_nudge_step: 0.1,
            show_markers: true,
            show_masked: false,
            show_info: true,
            animation_speed: animation.speed,
            angle_speed: animation.angle_speed,
            spawn_distance: animation.spawn_distance,
            log_file: None,
        }
    }
}

impl InstallationSettings {
    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = from_str(&contents)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save settings to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let xml = to_string(self)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);
        fs::write(path, formatted)?;
        Ok(())
    }

    /// Default settings file in the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ImmersiveInstallation");
            p.push("settings.xml");
            p
        })
    }

    /// The explicit path, else the default path when that file exists
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        }
    }

    /// Load from an explicit path, else the default path, else defaults.
    ///
    /// Never fails: a broken file falls back to defaults and the returned
    /// origin carries the error.
    pub fn load(explicit: Option<&Path>) -> (Self, SettingsOrigin) {
        let Some(path) = Self::resolve_path(explicit) else {
            return (Self::default(), SettingsOrigin::Defaults);
        };

        match Self::load_from_file(&path) {
            Ok(settings) => (settings, SettingsOrigin::File(path)),
            Err(error) => (Self::default(), SettingsOrigin::Fallback { path, error }),
        }
    }

    /// Save to the default path, creating the directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.save_to_file(&path)
    }

    /// Ensure sane minimums
    pub fn sanitize(&mut self) {
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self.buffer_size = self.buffer_size.clamp(16, 8192);
        self.fft_size = self.fft_size.clamp(32, 32768);
        self.smoothing = self.smoothing.clamp(0.0, 1.0);
        if self.max_decibels <= self.min_decibels {
            self.min_decibels = -100.0;
            self.max_decibels = -10.0;
        }
    }

    pub fn analyser_config(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_db: self.min_decibels,
            max_db: self.max_decibels,
        }
    }

    pub fn zoom_animation(&self) -> ZoomAnimation {
        ZoomAnimation {
            speed: self.animation_speed,
            angle_speed: self.angle_speed,
            spawn_distance: self.spawn_distance,
        }
    }

    pub fn composite_params(&self) -> CompositeParams {
        CompositeParams {
            show_masked: self.show_masked,
        }
    }

    /// Clear colour as linear 0.0-1.0 components
    pub fn clear_rgb(&self) -> [f64; 3] {
        let c = self.clear_color;
        [
            ((c >> 16) & 0xFF) as f64 / 255.0,
            ((c >> 8) & 0xFF) as f64 / 255.0,
            (c & 0xFF) as f64 / 255.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = InstallationSettings::default();
        assert_eq!(settings.buffer_size, 2048);
        assert_eq!(settings.fft_size, 64);
        assert_eq!(settings.nudge_step, 0.001);
        assert!(settings.show_markers);
        assert!(!settings.show_masked);
        assert!(settings.scene_path.is_none());
    }

    #[test]
    fn test_partial_xml_uses_defaults() {
        let xml = r#"<InstallationSettings>
            <bufferSize>1024</bufferSize>
            <scenePath>scenes/nyc.json</scenePath>
            <showMasked>true</showMasked>
        </InstallationSettings>"#;
        let settings: InstallationSettings = from_str(xml).unwrap();
        assert_eq!(settings.buffer_size, 1024);
        assert_eq!(settings.scene_path.as_deref(), Some("scenes/nyc.json"));
        assert!(settings.composite_params().show_masked);
        assert_eq!(settings.window_width, 1280);
        assert_eq!(settings.analyser_config(), AnalyserConfig::default());
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("installation-settings-{}.xml", std::process::id()));
        let mut settings = InstallationSettings::default();
        settings.audio_device = Some("Line In".to_string());
        settings.angle_speed = 0.002;
        settings.save_to_file(&path).unwrap();

        let loaded = InstallationSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.zoom_animation().angle_speed, 0.002);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let (settings, origin) =
            InstallationSettings::load(Some(Path::new("/nonexistent/settings.xml")));
        assert_eq!(settings, InstallationSettings::default());
        assert!(matches!(
            origin,
            SettingsOrigin::Fallback { error: SettingsError::Io(_), .. }
        ));
    }

    #[test]
    fn test_load_reports_file_origin() {
        let path = std::env::temp_dir().join(format!("installation-origin-{}.xml", std::process::id()));
        let mut saved = InstallationSettings::default();
        saved.buffer_size = 512;
        saved.save_to_file(&path).unwrap();

        let (settings, origin) = InstallationSettings::load(Some(&path));
        assert_eq!(settings.buffer_size, 512);
        assert!(matches!(&origin, SettingsOrigin::File(p) if p == &path));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_sanitize() {
        let mut settings = InstallationSettings {
            window_width: 0,
            buffer_size: 1,
            smoothing: 3.0,
            min_decibels: -10.0,
            max_decibels: -100.0,
            ..Default::default()
        };
        settings.sanitize();
        assert_eq!(settings.window_width, 1);
        assert_eq!(settings.buffer_size, 16);
        assert_eq!(settings.smoothing, 1.0);
        assert!(settings.max_decibels > settings.min_decibels);
    }

    #[test]
    fn test_clear_rgb() {
        let settings = InstallationSettings {
            clear_color: 0xFF0080,
            ..Default::default()
        };
        let [r, g, b] = settings.clear_rgb();
        assert_eq!(r, 1.0);
        assert_eq!(g, 0.0);
        assert!((b - 128.0 / 255.0).abs() < 1e-9);
    }
}
