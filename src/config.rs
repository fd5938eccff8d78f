//! Tunable parameters for the inspection pipeline.
//!
//! Every field has a default matching the physical rig the pipeline was tuned
//! on (1280x720 frames, connector roughly 200-400 px wide). A JSON file only
//! needs to name the values it changes:
//!
//! ```no_run
//! use harness_inspect::InspectionConfig;
//! use std::path::Path;
//!
//! let config = InspectionConfig::from_json_file(Path::new("inspect.json"))?;
//! # Ok::<(), harness_inspect::InspectionError>(())
//! ```

use crate::error::{InspectionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a frame is split into foreground and background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStrategy {
    /// Brightness floor learned from a captured background frame.
    BackgroundRelative,
    /// Global Otsu threshold on the grayscale frame.
    Otsu,
}

/// Complete configuration for one inspection session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    pub threshold_strategy: ThresholdStrategy,
    /// Whether the connector is physically taller than it is wide.
    pub height_greater_than_width: bool,
    /// Largest CIEDE2000 distance at which two wire colors are equal.
    pub color_match_threshold: f32,
    /// Gaussian sigma applied to frame and background before thresholding.
    pub blur_sigma: f32,
    /// Floor for the background brightness (HSV value) cutoff.
    pub min_background_value: u8,
    /// Foreground regions smaller than this (pixels) are treated as noise.
    pub min_region_area: u32,
    pub connector: ConnectorParams,
    pub candidate: CandidateParams,
    pub roi: RoiParams,
    pub segmentation: SegmentationParams,
    pub colorimeter: ColorimeterParams,
}

/// Morphology used to cut the wires off the connector body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorParams {
    /// Side of the square structuring element.
    pub kernel_size: u8,
    /// Must exceed half the wire width in pixels divided by the kernel radius.
    pub erode_iterations: u8,
    pub min_connector_area: u32,
    pub close_iterations: u8,
}

/// Central section of the frame searched for a connector candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    pub disregard_width_fraction: f32,
    pub disregard_height_fraction: f32,
    pub min_candidate_area: u32,
}

/// Geometry of the wire strip below the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiParams {
    pub height: u32,
    /// Distance from the connector bottom edge to the ROI center.
    pub offset: f32,
    /// Gray levels above this count as the white background.
    pub white_cutoff: u8,
    /// Smallest foreground region that makes an ROI valid.
    pub min_wire_area: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// White border added around the ROI before cropping rotated wires.
    pub padding: u32,
    pub white_cutoff: u8,
    pub open_radius: u8,
    pub background_dilate_radius: u8,
    /// Fraction of the peak distance that marks a sure-foreground seed.
    pub foreground_ratio: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorimeterParams {
    /// Pixels within this channel-space distance of white are skipped.
    pub background_tolerance: f32,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            threshold_strategy: ThresholdStrategy::BackgroundRelative,
            height_greater_than_width: true,
            color_match_threshold: 3.0,
            blur_sigma: 1.1,
            min_background_value: 150,
            min_region_area: 2000,
            connector: ConnectorParams::default(),
            candidate: CandidateParams::default(),
            roi: RoiParams::default(),
            segmentation: SegmentationParams::default(),
            colorimeter: ColorimeterParams::default(),
        }
    }
}

impl Default for ConnectorParams {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            erode_iterations: 10,
            min_connector_area: 10_000,
            close_iterations: 5,
        }
    }
}

impl ConnectorParams {
    /// Chebyshev radius equivalent to `iterations` passes of the square kernel.
    pub fn radius(&self, iterations: u8) -> u8 {
        let per_pass = (self.kernel_size / 2) as u16;
        (per_pass * iterations as u16).min(u8::MAX as u16) as u8
    }
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            disregard_width_fraction: 0.3,
            disregard_height_fraction: 0.3,
            min_candidate_area: 50_000,
        }
    }
}

impl Default for RoiParams {
    fn default() -> Self {
        Self {
            height: 30,
            offset: 25.0,
            white_cutoff: 254,
            min_wire_area: 100,
        }
    }
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            padding: 30,
            white_cutoff: 254,
            open_radius: 2,
            background_dilate_radius: 3,
            foreground_ratio: 0.7,
        }
    }
}

impl Default for ColorimeterParams {
    fn default() -> Self {
        Self {
            background_tolerance: 1.0,
        }
    }
}

impl InspectionConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.color_match_threshold >= 0.0) {
            return Err(InspectionError::Config(format!(
                "color_match_threshold must be >= 0, got {}",
                self.color_match_threshold
            )));
        }
        if !(self.blur_sigma > 0.0) {
            return Err(InspectionError::Config("blur_sigma must be positive".into()));
        }
        if self.connector.kernel_size < 3 || self.connector.kernel_size % 2 == 0 {
            return Err(InspectionError::Config(
                "connector.kernel_size must be odd and at least 3".into(),
            ));
        }
        for (name, fraction) in [
            ("disregard_width_fraction", self.candidate.disregard_width_fraction),
            ("disregard_height_fraction", self.candidate.disregard_height_fraction),
        ] {
            if !(0.0..1.0).contains(&fraction) {
                return Err(InspectionError::Config(format!(
                    "candidate.{name} must be in [0, 1), got {fraction}"
                )));
            }
        }
        if self.roi.height == 0 {
            return Err(InspectionError::Config("roi.height must be positive".into()));
        }
        if !(self.segmentation.foreground_ratio > 0.0 && self.segmentation.foreground_ratio < 1.0) {
            return Err(InspectionError::Config(
                "segmentation.foreground_ratio must be in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = InspectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connector.radius(config.connector.erode_iterations), 20);
        assert_eq!(config.connector.radius(config.connector.close_iterations), 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "threshold_strategy": "otsu", "roi": { "height": 40 } }"#;
        let config: InspectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.threshold_strategy, ThresholdStrategy::Otsu);
        assert_eq!(config.roi.height, 40);
        assert_eq!(config.roi.offset, 25.0);
        assert!(config.height_greater_than_width);
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let config = InspectionConfig {
            color_match_threshold: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(InspectionError::Config(_))));
    }
}
