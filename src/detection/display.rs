//! Overlays for the operator display. Nothing here feeds back into detection.

use crate::config::CandidateParams;
use crate::detection::preprocessing::check_section;
use crate::models::RotatedRect;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const BOX_COLOR: Rgb<u8> = Rgb([250, 128, 114]);
pub const OK_COLOR: Rgb<u8> = Rgb([0, 92, 41]);
pub const NG_COLOR: Rgb<u8> = Rgb([122, 25, 19]);
pub const SECTION_COLOR: Rgb<u8> = Rgb([239, 117, 100]);

const BOX_THICKNESS: i32 = 5;
const BADGE_SIZE: (u32, u32) = (150, 100);
const BADGE_MARGIN: u32 = 25;

/// Draw a closed quadrilateral with lines `thickness` pixels wide.
pub fn draw_polygon(canvas: &mut RgbImage, corners: &[(f32, f32); 4], color: Rgb<u8>, thickness: i32) {
    let half = thickness / 2;
    for i in 0..4 {
        let start = corners[i];
        let end = corners[(i + 1) % 4];
        for dx in -half..=half {
            for dy in -half..=half {
                let (ox, oy) = (dx as f32, dy as f32);
                draw_line_segment_mut(
                    canvas,
                    (start.0 + ox, start.1 + oy),
                    (end.0 + ox, end.1 + oy),
                    color,
                );
            }
        }
    }
}

/// Copy of `frame` with the connector box and the ROI box outlined.
pub fn annotate_roi(frame: &RgbImage, connector: &RotatedRect, roi_corners: &[(f32, f32); 4]) -> RgbImage {
    let mut display = frame.clone();
    draw_polygon(&mut display, &connector.corners(), BOX_COLOR, BOX_THICKNESS);
    draw_polygon(&mut display, roi_corners, BOX_COLOR, BOX_THICKNESS);
    display
}

/// Filled OK/NG badge in the upper-right corner.
pub fn draw_verdict(canvas: &mut RgbImage, matched: bool) {
    let color = if matched { OK_COLOR } else { NG_COLOR };
    let (w, h) = BADGE_SIZE;
    let x = canvas.width().saturating_sub(w + BADGE_MARGIN);
    let rect = Rect::at(x as i32, BADGE_MARGIN as i32).of_size(w, h);
    draw_filled_rect_mut(canvas, rect, color);
}

/// Outline the part of the frame searched for a connector candidate.
pub fn draw_check_section(canvas: &mut RgbImage, params: &CandidateParams) {
    let section = check_section(canvas.width(), canvas.height(), params);
    draw_hollow_rect_mut(canvas, section, SECTION_COLOR);
}
