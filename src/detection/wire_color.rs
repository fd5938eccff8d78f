//! Representative wire colors and comparing color sequences.

use crate::config::ColorimeterParams;
use crate::models::{ColorSequence, WireColor};
use image::{Rgb, RgbImage};
use palette::color_difference::Ciede2000;
use palette::{FromColor, Lab, Srgb};

/// Convert one pixel to channel-native Lab.
pub fn pixel_to_wire_color(pixel: &Rgb<u8>) -> WireColor {
    let Rgb([r, g, b]) = *pixel;
    let srgb = Srgb::new(r, g, b).into_format::<f32>();
    WireColor::from_lab(Lab::from_color(srgb))
}

fn channel_distance(a: WireColor, b: WireColor) -> f32 {
    ((a.l - b.l).powi(2) + (a.a - b.a).powi(2) + (a.b - b.b).powi(2)).sqrt()
}

/// Median of a non-empty list; the two middle values are averaged for even lengths.
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Representative color of an upright wire crop.
///
/// Each one-pixel column is averaged, skipping pixels that match the white
/// background, and the result is the per-channel median over the columns
/// that had any wire pixels. `None` when no such column exists.
pub fn wire_color(crop: &RgbImage, params: &ColorimeterParams) -> Option<WireColor> {
    let white = pixel_to_wire_color(&Rgb([255, 255, 255]));
    let mut column_means: [Vec<f32>; 3] = Default::default();

    for x in 0..crop.width() {
        let mut sum = [0.0f32; 3];
        let mut count = 0u32;
        for y in 0..crop.height() {
            let color = pixel_to_wire_color(crop.get_pixel(x, y));
            if channel_distance(color, white) <= params.background_tolerance {
                continue;
            }
            sum[0] += color.l;
            sum[1] += color.a;
            sum[2] += color.b;
            count += 1;
        }

        if count > 0 {
            for (channel, total) in column_means.iter_mut().zip(sum) {
                channel.push(total / count as f32);
            }
        }
    }

    if column_means[0].is_empty() {
        return None;
    }

    let [l, a, b] = column_means.map(|mut values| median(&mut values));
    Some(WireColor::new(l, a, b))
}

/// Colors of all wire crops, in order.
pub fn color_sequence(wires: &[RgbImage], params: &ColorimeterParams) -> ColorSequence {
    wires
        .iter()
        .enumerate()
        .map(|(i, crop)| {
            let color = wire_color(crop, params);
            if color.is_none() {
                tracing::warn!(wire = i, "wire crop has no evaluable pixels");
            }
            color
        })
        .collect()
}

/// CIEDE2000 distance between two channel-native colors.
pub fn delta_e(a: WireColor, b: WireColor) -> f32 {
    a.to_lab().difference(b.to_lab())
}

/// Two wires match when both colors are known and within `threshold`.
pub fn is_same_wire_color(a: Option<WireColor>, b: Option<WireColor>, threshold: f32) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => delta_e(a, b) <= threshold,
        _ => false,
    }
}

/// Position-by-position comparison of a candidate against a reference.
pub fn matches_reference(candidate: &[Option<WireColor>], reference: &[Option<WireColor>], threshold: f32) -> bool {
    if candidate.len() != reference.len() {
        tracing::info!(
            candidate = candidate.len(),
            reference = reference.len(),
            "wire count differs"
        );
        return false;
    }

    candidate
        .iter()
        .zip(reference)
        .all(|(c, r)| is_same_wire_color(*c, *r, threshold))
}
