use crate::config::SegmentationParams;
use crate::detection::orientation::{straightening_angle, true_size};
use crate::detection::preprocessing::{threshold_white_background, WHITE};
use crate::detection::transform::{pad, rotate_and_crop};
use crate::detection::{contours, watershed};
use crate::error::Result;
use crate::models::Contour;
use image::RgbImage;

/// Split a white-background wire strip into one upright crop per wire,
/// ordered left to right.
///
/// An empty strip gives an empty list.
pub fn find_wires(roi: &RgbImage, params: &SegmentationParams) -> Result<Vec<RgbImage>> {
    let padded = pad(roi, params.padding, WHITE);
    let mask = threshold_white_background(&padded, params.white_cutoff);
    if contours::foreground_area(&mask) == 0 {
        return Ok(Vec::new());
    }

    let partition = watershed::watershed(&padded, &mask, params)?;

    let wire_contours: Vec<Contour> = partition
        .regions()
        .iter()
        .filter_map(|region| {
            let region_mask = partition.region_mask(region.id);
            contours::largest_contour(contours::find_external_contours(&region_mask))
        })
        .collect();

    let wires: Vec<RgbImage> = contours::sort_contours_left_to_right(wire_contours)
        .iter()
        .map(|contour| straighten_wire(&padded, contour))
        .collect();

    tracing::debug!(wires = wires.len(), "wires segmented");
    Ok(wires)
}

/// Crop one wire so its long axis is vertical. Wires always stand upright.
fn straighten_wire(padded: &RgbImage, contour: &Contour) -> RgbImage {
    let rect = contour.min_area_rect();
    let (width, height) = true_size(&rect, true);
    let angle = straightening_angle(&rect, true);
    rotate_and_crop(
        padded,
        rect.center,
        angle,
        (width.round() as u32, height.round() as u32),
        rect.center,
    )
}
