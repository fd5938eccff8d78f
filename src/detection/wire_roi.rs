//! Cropping the strip of wires directly beneath the connector.
//!
//! The frame is turned so the connector stands straight, and a strip as wide
//! as the connector is cut just below its bottom edge. The straightening
//! angle is a guess between two quadrants; when the strip comes out empty the
//! other quadrant is tried once.

use crate::config::InspectionConfig;
use crate::detection::orientation::{flipped_angle, straightening_angle, true_size};
use crate::detection::preprocessing::threshold_white_background;
use crate::detection::transform::{rotate_and_crop, rotate_point};
use crate::detection::{contours, display};
use crate::models::RotatedRect;
use image::RgbImage;

/// Result of cropping the wire strip.
#[derive(Debug, Clone)]
pub struct RoiExtraction {
    pub roi: RgbImage,
    /// Original frame with the connector and ROI boxes outlined.
    pub display: RgbImage,
    /// Rotation that produced `roi`.
    pub angle: f32,
    /// 1, or 2 when the flipped angle had to be tried.
    pub attempts: u8,
    /// Whether `roi` holds at least one wire-sized region.
    pub valid: bool,
}

/// Placement of the strip in the straightened frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiGeometry {
    pub pivot: (f32, f32),
    pub center: (f32, f32),
    pub size: (u32, u32),
}

impl RoiGeometry {
    /// Strip below `rect`, whose true size comes from the orientation convention.
    pub fn below(rect: &RotatedRect, config: &InspectionConfig) -> Self {
        let (width, height) = true_size(rect, config.height_greater_than_width);
        let (cx, cy) = rect.center;
        Self {
            pivot: rect.center,
            center: (cx, cy + height / 2.0 + config.roi.offset),
            size: (width.round() as u32, config.roi.height),
        }
    }

    /// Strip corners mapped back into the unrotated frame.
    pub fn corners_in_frame(&self, angle: f32) -> [(f32, f32); 4] {
        let (cx, cy) = self.center;
        let half_w = self.size.0 as f32 / 2.0;
        let half_h = self.size.1 as f32 / 2.0;
        [
            (cx - half_w, cy + half_h),
            (cx - half_w, cy - half_h),
            (cx + half_w, cy - half_h),
            (cx + half_w, cy + half_h),
        ]
        .map(|p| rotate_point(p, self.pivot, -angle))
    }
}

/// Run `attempt` with `angle`, and once more with the flipped angle if the
/// first result was rejected. Returns the last result, its angle, the number
/// of attempts and whether it was accepted.
pub fn with_flip_retry<T>(angle: f32, mut attempt: impl FnMut(f32) -> (T, bool)) -> (T, f32, u8, bool) {
    let (first, accepted) = attempt(angle);
    if accepted {
        return (first, angle, 1, true);
    }

    let flipped = flipped_angle(angle);
    tracing::info!(from = angle, to = flipped, "wire strip empty, retrying with flipped angle");
    let (second, accepted) = attempt(flipped);
    (second, flipped, 2, accepted)
}

/// True when the crop contains a region bigger than a stray speck.
pub fn has_wires(roi: &RgbImage, config: &InspectionConfig) -> bool {
    let mask = threshold_white_background(roi, config.roi.white_cutoff);
    contours::has_region_larger_than(&mask, config.roi.min_wire_area)
}

/// Crop the wire strip beneath the connector.
///
/// `frame` is only used for the display image; the strip is cut from
/// `white_frame`, the frame with everything but the foreground painted white.
pub fn extract_wire_roi(
    frame: &RgbImage,
    white_frame: &RgbImage,
    connector: &RotatedRect,
    config: &InspectionConfig,
) -> RoiExtraction {
    let geometry = RoiGeometry::below(connector, config);
    let angle = straightening_angle(connector, config.height_greater_than_width);
    tracing::debug!(angle, size = ?geometry.size, "cropping wire strip");

    let (roi, angle, attempts, valid) = with_flip_retry(angle, |angle| {
        let roi = rotate_and_crop(white_frame, geometry.pivot, angle, geometry.size, geometry.center);
        let ok = has_wires(&roi, config);
        (roi, ok)
    });

    if !valid {
        tracing::warn!(angle, "no wires below connector");
    }

    let display = display::annotate_roi(frame, connector, &geometry.corners_in_frame(angle));

    RoiExtraction {
        roi,
        display,
        angle,
        attempts,
        valid,
    }
}
