use crate::detection::preprocessing::WHITE;
use image::RgbImage;
use imageproc::geometric_transformations::{warp, warp_into, Interpolation, Projection};

/// Rotation by `angle` degrees about `center`; positive is counter-clockwise on screen.
pub fn rotation_about(center: (f32, f32), angle: f32) -> Projection {
    let (cx, cy) = center;
    Projection::translate(cx, cy)
        * Projection::rotate(-angle.to_radians())
        * Projection::translate(-cx, -cy)
}

/// Map a point through `rotation_about(center, angle)`.
pub fn rotate_point(point: (f32, f32), center: (f32, f32), angle: f32) -> (f32, f32) {
    let (s, c) = angle.to_radians().sin_cos();
    let (dx, dy) = (point.0 - center.0, point.1 - center.1);
    (center.0 + c * dx + s * dy, center.1 - s * dx + c * dy)
}

/// Rotate the whole image about `center`, keeping its size. Uncovered pixels are white.
pub fn rotate_image(image: &RgbImage, center: (f32, f32), angle: f32) -> RgbImage {
    warp(image, &rotation_about(center, angle), Interpolation::Bilinear, WHITE)
}

/// Sub-pixel crop of `size` centered at `center`, sampled bilinearly.
pub fn crop_centered(image: &RgbImage, size: (u32, u32), center: (f32, f32)) -> RgbImage {
    crop_with(image, size, center, Projection::translate(0.0, 0.0))
}

/// Rotate about `pivot` by `angle`, then crop `size` centered at `center` in
/// the rotated image. Equivalent to [`rotate_image`] followed by
/// [`crop_centered`] without materializing the full rotated frame.
pub fn rotate_and_crop(
    image: &RgbImage,
    pivot: (f32, f32),
    angle: f32,
    size: (u32, u32),
    center: (f32, f32),
) -> RgbImage {
    crop_with(image, size, center, rotation_about(pivot, angle))
}

fn crop_with(image: &RgbImage, size: (u32, u32), center: (f32, f32), before: Projection) -> RgbImage {
    let (w, h) = (size.0.max(1), size.1.max(1));
    let origin_x = center.0 - (w as f32 - 1.0) / 2.0;
    let origin_y = center.1 - (h as f32 - 1.0) / 2.0;
    let projection = Projection::translate(-origin_x, -origin_y) * before;

    let mut out = RgbImage::from_pixel(w, h, WHITE);
    warp_into(image, &projection, Interpolation::Bilinear, WHITE, &mut out);
    out
}

/// Surround the image with a solid border.
pub fn pad(image: &RgbImage, border: u32, color: image::Rgb<u8>) -> RgbImage {
    let mut padded = RgbImage::from_pixel(
        image.width() + 2 * border,
        image.height() + 2 * border,
        color,
    );
    image::imageops::overlay(&mut padded, image, border as i64, border as i64);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn marked_image() -> RgbImage {
        let mut img = RgbImage::from_pixel(41, 41, WHITE);
        // Marker to the right of the center
        img.put_pixel(30, 20, Rgb([0, 0, 0]));
        img
    }

    #[test]
    fn test_crop_centered_exact_pixels() {
        let mut img = RgbImage::from_pixel(10, 10, WHITE);
        img.put_pixel(5, 5, Rgb([10, 20, 30]));
        let crop = crop_centered(&img, (3, 3), (5.0, 5.0));
        assert_eq!(crop.dimensions(), (3, 3));
        assert_eq!(*crop.get_pixel(1, 1), Rgb([10, 20, 30]));
        assert_eq!(*crop.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn test_rotate_point_counter_clockwise() {
        let (x, y) = rotate_point((30.0, 20.0), (20.0, 20.0), 90.0);
        assert!((x - 20.0).abs() < 1e-4);
        assert!((y - 10.0).abs() < 1e-4, "right of center moves up");
    }

    #[test]
    fn test_rotate_image_moves_marker() {
        let rotated = rotate_image(&marked_image(), (20.0, 20.0), 90.0);
        assert!(rotated.get_pixel(20, 10)[0] < 50);
        assert_eq!(*rotated.get_pixel(30, 20), WHITE);
    }

    #[test]
    fn test_rotate_and_crop_matches_two_steps() {
        let img = marked_image();
        let combined = rotate_and_crop(&img, (20.0, 20.0), 90.0, (5, 5), (20.0, 10.0));
        let two_step = crop_centered(&rotate_image(&img, (20.0, 20.0), 90.0), (5, 5), (20.0, 10.0));
        assert_eq!(combined.get_pixel(2, 2)[0], two_step.get_pixel(2, 2)[0]);
        assert!(combined.get_pixel(2, 2)[0] < 50);
    }

    #[test]
    fn test_pad() {
        let img = RgbImage::from_pixel(2, 3, Rgb([1, 2, 3]));
        let padded = pad(&img, 4, WHITE);
        assert_eq!(padded.dimensions(), (10, 11));
        assert_eq!(*padded.get_pixel(4, 4), Rgb([1, 2, 3]));
        assert_eq!(*padded.get_pixel(0, 0), WHITE);
    }
}
