use crate::config::CandidateParams;
use crate::detection::contours::{self, BACKGROUND, FOREGROUND};
use crate::error::{InspectionError, Result};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Accept a decoded image as a frame: three color channels, non-empty.
pub fn ensure_frame(img: &DynamicImage) -> Result<RgbImage> {
    let channels = img.color().channel_count();
    if channels != 3 {
        return Err(InspectionError::Precondition(format!(
            "expected a 3-channel color frame, got {channels} channel(s)"
        )));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(InspectionError::Precondition("frame is empty".into()));
    }
    Ok(img.to_rgb8())
}

/// Apply Gaussian blur to reduce sensor noise
pub fn apply_blur(frame: &RgbImage, sigma: f32) -> RgbImage {
    gaussian_blur_f32(frame, sigma)
}

pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// HSV value channel: the brightest of the three color components.
pub fn brightness_channel(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let Rgb([r, g, b]) = *frame.get_pixel(x, y);
        Luma([r.max(g).max(b)])
    })
}

/// Brightness cutoff learned from a pure-background sample, never below `floor`.
pub fn background_cutoff(background_value: &GrayImage, floor: u8) -> u8 {
    let lowest = background_value.pixels().map(|p| p[0]).min().unwrap_or(u8::MAX);
    lowest.max(floor)
}

/// Foreground is everything darker than the background cutoff.
///
/// `frame_value` and `background_value` are brightness channels of the blurred
/// frame and blurred background reference.
pub fn threshold_background_relative(
    frame_value: &GrayImage,
    background_value: &GrayImage,
    floor: u8,
    min_region_area: u32,
) -> Result<GrayImage> {
    if frame_value.dimensions() != background_value.dimensions() {
        return Err(InspectionError::Precondition(format!(
            "background is {:?} but frame is {:?}",
            background_value.dimensions(),
            frame_value.dimensions()
        )));
    }

    let cutoff = background_cutoff(background_value, floor);
    tracing::debug!(cutoff, "background-relative threshold");

    let mask = GrayImage::from_fn(frame_value.width(), frame_value.height(), |x, y| {
        if frame_value.get_pixel(x, y)[0] >= cutoff {
            BACKGROUND
        } else {
            FOREGROUND
        }
    });
    Ok(contours::filter_out_small_regions(&mask, min_region_area))
}

/// Otsu threshold on the grayscale frame; dark pixels become foreground.
pub fn threshold_otsu(frame: &RgbImage, min_region_area: u32) -> GrayImage {
    let gray = to_grayscale(frame);

    // A uniform frame has no second class to separate
    let first = gray.pixels().next().map(|p| p[0]);
    if gray.pixels().all(|p| Some(p[0]) == first) {
        return GrayImage::new(gray.width(), gray.height());
    }

    let level = otsu_level(&gray);
    tracing::debug!(level, "otsu threshold");

    let mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > level {
            BACKGROUND
        } else {
            FOREGROUND
        }
    });
    contours::filter_out_small_regions(&mask, min_region_area)
}

/// Binarize an image whose background is pure white: anything at or below
/// `cutoff` is foreground.
pub fn threshold_white_background(img: &RgbImage, cutoff: u8) -> GrayImage {
    let gray = to_grayscale(img);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > cutoff {
            BACKGROUND
        } else {
            FOREGROUND
        }
    })
}

/// Keep the frame color where the mask is foreground, white elsewhere.
pub fn fill_background_white(frame: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        if mask.get_pixel(x, y)[0] != 0 {
            *frame.get_pixel(x, y)
        } else {
            WHITE
        }
    })
}

/// Central part of a `width` x `height` frame searched for a connector candidate.
pub fn check_section(width: u32, height: u32, params: &CandidateParams) -> Rect {
    let margin_x = (width as f32 * params.disregard_width_fraction / 2.0) as u32;
    let margin_y = (height as f32 * params.disregard_height_fraction / 2.0) as u32;
    let section_w = width.saturating_sub(2 * margin_x).max(1);
    let section_h = height.saturating_sub(2 * margin_y).max(1);
    Rect::at(margin_x as i32, margin_y as i32).of_size(section_w, section_h)
}

/// Whether the middle of the mask holds a region big enough to be a connector.
///
/// Only the center is examined so that a connector at the frame edge, whose
/// wires may be cut off, is not inspected.
pub fn has_connector_candidate(mask: &GrayImage, params: &CandidateParams) -> bool {
    let section = check_section(mask.width(), mask.height(), params);
    let cropped = image::imageops::crop_imm(
        mask,
        section.left() as u32,
        section.top() as u32,
        section.width(),
        section.height(),
    )
    .to_image();
    contours::has_region_larger_than(&cropped, params.min_candidate_area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::contours::foreground_area;
    use imageproc::drawing::draw_filled_rect_mut;

    fn frame_with_dark_square() -> RgbImage {
        let mut frame = RgbImage::from_pixel(200, 200, Rgb([220, 220, 220]));
        draw_filled_rect_mut(&mut frame, Rect::at(50, 50).of_size(80, 80), Rgb([40, 30, 30]));
        frame
    }

    #[test]
    fn test_background_relative_marks_dark_object() {
        let frame = frame_with_dark_square();
        let background = RgbImage::from_pixel(200, 200, Rgb([210, 215, 220]));

        let mask = threshold_background_relative(
            &brightness_channel(&frame),
            &brightness_channel(&background),
            150,
            100,
        )
        .unwrap();

        assert_eq!(mask.get_pixel(90, 90)[0], 255);
        assert_eq!(mask.get_pixel(10, 10)[0], 0);
        assert_eq!(foreground_area(&mask), 80 * 80);
    }

    #[test]
    fn test_cutoff_floor() {
        let dim = GrayImage::from_pixel(4, 4, Luma([90]));
        assert_eq!(background_cutoff(&dim, 150), 150);
        let bright = GrayImage::from_pixel(4, 4, Luma([200]));
        assert_eq!(background_cutoff(&bright, 150), 200);
    }

    #[test]
    fn test_background_size_mismatch_is_precondition() {
        let frame = GrayImage::new(10, 10);
        let background = GrayImage::new(12, 10);
        let result = threshold_background_relative(&frame, &background, 150, 0);
        assert!(matches!(result, Err(InspectionError::Precondition(_))));
    }

    #[test]
    fn test_otsu_marks_dark_object() {
        let mask = threshold_otsu(&frame_with_dark_square(), 100);
        assert_eq!(mask.get_pixel(90, 90)[0], 255);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_degenerate_frame_gives_empty_mask() {
        let blank = RgbImage::from_pixel(50, 50, WHITE);
        assert_eq!(foreground_area(&threshold_otsu(&blank, 10)), 0);

        let mask = threshold_background_relative(
            &brightness_channel(&blank),
            &brightness_channel(&blank),
            150,
            10,
        )
        .unwrap();
        assert_eq!(foreground_area(&mask), 0);
    }

    #[test]
    fn test_fill_background_white() {
        let frame = frame_with_dark_square();
        let mask = threshold_otsu(&frame, 0);
        let filled = fill_background_white(&frame, &mask);
        assert_eq!(*filled.get_pixel(0, 0), WHITE);
        assert_eq!(*filled.get_pixel(60, 60), Rgb([40, 30, 30]));
    }

    #[test]
    fn test_candidate_only_counts_center() {
        let params = CandidateParams {
            min_candidate_area: 1000,
            ..Default::default()
        };
        let mut mask = GrayImage::new(200, 200);
        draw_filled_rect_mut(&mut mask, Rect::at(0, 0).of_size(25, 200), FOREGROUND);
        assert!(!has_connector_candidate(&mask, &params));

        draw_filled_rect_mut(&mut mask, Rect::at(70, 70).of_size(50, 50), FOREGROUND);
        assert!(has_connector_candidate(&mask, &params));
    }

    #[test]
    fn test_ensure_frame_rejects_gray() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert!(matches!(ensure_frame(&gray), Err(InspectionError::Precondition(_))));
        let color = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(ensure_frame(&color).is_ok());
    }
}
