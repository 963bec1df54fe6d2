use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NightError;
use crate::validate::MAX_FILE_SIZE;

/// Largest accepted `render_scale`; a US Letter page at this scale is already
/// close to 5000 px wide.
pub const MAX_RENDER_SCALE: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Fixed scale pages are rasterized at.
    pub render_scale: f32,
    pub thumbnail_width: u32,
    pub max_file_size: u64,
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub drag_gain: f32,
    /// Vertical gap between page surfaces, in display pixels.
    pub page_gap: f32,
    pub visibility_threshold: f32,
    /// Frames a go-to-page scroll is spread over; 0 jumps directly.
    pub scroll_animation_frames: u32,
    /// Width of exported pages in PDF points.
    pub export_page_width: f32,
    pub pdfium_library: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            thumbnail_width: 150,
            max_file_size: MAX_FILE_SIZE,
            zoom_step: 1.2,
            min_zoom: 0.1,
            max_zoom: 8.0,
            drag_gain: 2.0,
            page_gap: 16.0,
            visibility_threshold: 0.5,
            scroll_animation_frames: 8,
            export_page_width: 595.28,
            pdfium_library: None,
        }
    }
}

impl ViewerConfig {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("net", "nightpdf", "nightpdf")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: ViewerConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NightError> {
        let positive = [
            ("render_scale", self.render_scale),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("drag_gain", self.drag_gain),
            ("export_page_width", self.export_page_width),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(NightError::Config(format!("{name} must be positive")));
            }
        }
        if self.render_scale > MAX_RENDER_SCALE {
            return Err(NightError::Config(format!(
                "render_scale cannot exceed {MAX_RENDER_SCALE}"
            )));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(NightError::Config("zoom_step must be greater than 1".into()));
        }
        if self.max_zoom < self.min_zoom {
            return Err(NightError::Config("max_zoom is below min_zoom".into()));
        }
        if self.thumbnail_width == 0 {
            return Err(NightError::Config("thumbnail_width must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(NightError::Config(
                "visibility_threshold must be within 0..=1".into(),
            ));
        }
        if !(self.page_gap.is_finite() && self.page_gap >= 0.0) {
            return Err(NightError::Config("page_gap cannot be negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_overrides_selected_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "render_scale = 1.5\nzoom_step = 1.25\n").unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.render_scale, 1.5);
        assert_eq!(config.zoom_step, 1.25);
        assert_eq!(config.thumbnail_width, 150);
    }

    #[test]
    fn rejects_non_positive_zoom_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "zoom_step = 0.9\n").unwrap();
        assert!(ViewerConfig::load(&path).is_err());
    }

    #[test]
    fn rejects_nan_max_zoom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_zoom = nan\n").unwrap();
        let err = ViewerConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("max_zoom must be positive"));
    }

    #[test]
    fn rejects_non_finite_or_oversized_values() {
        let infinite_zoom = ViewerConfig {
            max_zoom: f32::INFINITY,
            ..ViewerConfig::default()
        };
        assert!(infinite_zoom.validate().is_err());

        let huge_scale = ViewerConfig {
            render_scale: MAX_RENDER_SCALE * 2.0,
            ..ViewerConfig::default()
        };
        assert!(huge_scale.validate().is_err());

        let nan_gap = ViewerConfig {
            page_gap: f32::NAN,
            ..ViewerConfig::default()
        };
        assert!(nan_gap.validate().is_err());

        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "colour = \"red\"\n").unwrap();
        assert!(ViewerConfig::load(&path).is_err());
    }
}
