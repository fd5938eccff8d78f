use harness_inspect::config::CandidateParams;
use harness_inspect::detection::transform::rotate_image;
use harness_inspect::InspectionConfig;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tempfile::NamedTempFile;

pub const FRAME_SIZE: (u32, u32) = (640, 480);
pub const BACKGROUND_COLOR: Rgb<u8> = Rgb([228, 230, 232]);
pub const CONNECTOR_COLOR: Rgb<u8> = Rgb([40, 40, 44]);

pub const RED: Rgb<u8> = Rgb([200, 30, 30]);
pub const GREEN: Rgb<u8> = Rgb([30, 160, 30]);
pub const BLUE: Rgb<u8> = Rgb([30, 30, 200]);
pub const YELLOW: Rgb<u8> = Rgb([220, 200, 30]);

/// Left edges of the wire slots below the connector.
const WIRE_SLOTS: [i32; 4] = [195, 265, 335, 405];
const WIRE_WIDTH: u32 = 30;

/// Empty background as the camera sees it.
pub fn background_frame() -> RgbImage {
    RgbImage::from_pixel(FRAME_SIZE.0, FRAME_SIZE.1, BACKGROUND_COLOR)
}

/// A 300x200 connector in the middle of the frame with one wire per color
/// hanging below it, left to right.
pub fn harness_frame(wire_colors: &[Rgb<u8>]) -> RgbImage {
    let mut frame = background_frame();
    draw_filled_rect_mut(&mut frame, Rect::at(170, 100).of_size(300, 200), CONNECTOR_COLOR);
    for (&x, &color) in WIRE_SLOTS.iter().zip(wire_colors) {
        draw_filled_rect_mut(&mut frame, Rect::at(x, 300).of_size(WIRE_WIDTH, 120), color);
    }
    frame
}

/// Wire slots below the tall connector.
const TALL_WIRE_SLOTS: [i32; 3] = [240, 305, 370];

/// A 180x240 connector, taller than wide, with up to three wires below it.
pub fn tall_harness_frame(wire_colors: &[Rgb<u8>]) -> RgbImage {
    let mut frame = background_frame();
    draw_filled_rect_mut(&mut frame, Rect::at(230, 40).of_size(180, 240), CONNECTOR_COLOR);
    for (&x, &color) in TALL_WIRE_SLOTS.iter().zip(wire_colors) {
        draw_filled_rect_mut(&mut frame, Rect::at(x, 280).of_size(WIRE_WIDTH, 140), color);
    }
    frame
}

/// `frame` rotated by `angle` degrees (counter-clockwise) about the frame
/// center, as if the harness lay tilted under the camera.
pub fn tilted(frame: &RgbImage, angle: f32) -> RgbImage {
    let center = ((frame.width() - 1) as f32 / 2.0, (frame.height() - 1) as f32 / 2.0);
    let mut rotated = rotate_image(frame, center, angle);
    // Out-of-frame fill is white; the camera would see the background there
    for pixel in rotated.pixels_mut() {
        let Rgb([r, g, b]) = *pixel;
        if r > BACKGROUND_COLOR[0] && g > BACKGROUND_COLOR[1] && b > BACKGROUND_COLOR[2] {
            *pixel = BACKGROUND_COLOR;
        }
    }
    rotated
}

/// Configuration for [`tall_harness_frame`], whose connector is smaller than
/// the default candidate area.
pub fn tall_connector_config() -> InspectionConfig {
    InspectionConfig {
        height_greater_than_width: true,
        candidate: CandidateParams {
            min_candidate_area: 30000,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Configuration matching the synthetic frames: the connector is wider than tall.
pub fn wide_connector_config() -> InspectionConfig {
    InspectionConfig {
        height_greater_than_width: false,
        ..Default::default()
    }
}

/// Save an image to a temporary PNG file that is removed when dropped.
pub fn save_temp_png(img: &RgbImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}
