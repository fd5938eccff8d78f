use image::{GrayImage, RgbImage};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use palette::Lab;

/// Angles closer than this (degrees) to an axis are treated as axis-aligned.
const AXIS_EPSILON_DEG: f64 = 1e-4;

/// Connected foreground region of a binary mask, summarized by its extent.
#[derive(Debug, Clone)]
pub struct Region {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Region {
    pub fn area(&self) -> u32 {
        self.pixel_count
    }

    /// True if any pixel of the region lies on the outer edge of a `width` x `height` image.
    pub fn touches_border(&self, width: u32, height: u32) -> bool {
        self.min_x == 0 || self.min_y == 0 || self.max_x + 1 >= width || self.max_y + 1 >= height
    }
}

/// Ordered boundary of a connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Enclosed polygon area (shoelace formula).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x as f64 * self.points[j].y as f64;
            area -= self.points[j].x as f64 * self.points[i].y as f64;
        }

        (area / 2.0).abs()
    }

    /// Minimum-area oriented bounding box.
    pub fn min_area_rect(&self) -> RotatedRect {
        RotatedRect::from_points(&self.points)
    }
}

/// Oriented rectangle as reported by a bounding-box query.
///
/// `angle` is in degrees, in `[0, 90)`, measured clockwise (image y grows
/// downwards) from the horizontal to the edge whose length is `size.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: (f32, f32),
    pub size: (f32, f32),
    pub angle: f32,
}

impl RotatedRect {
    pub fn new(center: (f32, f32), size: (f32, f32), angle: f32) -> Self {
        Self { center, size, angle }
    }

    /// Smallest-area rectangle enclosing `points`, found with rotating calipers
    /// over the convex hull.
    pub fn from_points(points: &[Point<i32>]) -> Self {
        if points.is_empty() {
            return Self::new((0.0, 0.0), (0.0, 0.0), 0.0);
        }

        let hull: Vec<(f64, f64)> = convex_hull(points)
            .iter()
            .map(|p| (p.x as f64, p.y as f64))
            .collect();

        // (area, edge direction, min/max along edge, min/max across edge)
        let mut best: Option<(f64, (f64, f64), (f64, f64), (f64, f64))> = None;
        for i in 0..hull.len() {
            let (x0, y0) = hull[i];
            let (x1, y1) = hull[(i + 1) % hull.len()];
            let (dx, dy) = (x1 - x0, y1 - y0);
            let len = (dx * dx + dy * dy).sqrt();
            if len == 0.0 {
                continue;
            }
            let (ux, uy) = (dx / len, dy / len);

            let mut along = (f64::MAX, f64::MIN);
            let mut across = (f64::MAX, f64::MIN);
            for &(x, y) in &hull {
                let u = x * ux + y * uy;
                let v = -x * uy + y * ux;
                along = (along.0.min(u), along.1.max(u));
                across = (across.0.min(v), across.1.max(v));
            }

            let area = (along.1 - along.0) * (across.1 - across.0);
            if best.is_none_or(|(best_area, ..)| area < best_area) {
                best = Some((area, (ux, uy), along, across));
            }
        }

        let Some((_, (ux, uy), along, across)) = best else {
            // Every hull point coincides
            let (x, y) = hull.first().copied().unwrap_or((0.0, 0.0));
            return Self::new((x as f32, y as f32), (0.0, 0.0), 0.0);
        };

        let cu = (along.0 + along.1) / 2.0;
        let cv = (across.0 + across.1) / 2.0;
        let center = (cu * ux - cv * uy, cu * uy + cv * ux);

        Self::from_edge(center, (ux, uy), along.1 - along.0, across.1 - across.0)
    }

    /// Normalize an edge direction and its two extents to the `[0, 90)` convention.
    fn from_edge(center: (f64, f64), dir: (f64, f64), along: f64, across: f64) -> Self {
        let mut phi = dir.1.atan2(dir.0).to_degrees();
        if phi < 0.0 {
            phi += 180.0;
        }
        if phi >= 180.0 {
            phi -= 180.0;
        }

        let (mut angle, mut width, mut height) = if phi < 90.0 {
            (phi, along, across)
        } else {
            (phi - 90.0, across, along)
        };

        if angle >= 90.0 - AXIS_EPSILON_DEG {
            angle = 0.0;
            std::mem::swap(&mut width, &mut height);
        } else if angle < AXIS_EPSILON_DEG {
            angle = 0.0;
        }

        Self::new(
            (center.0 as f32, center.1 as f32),
            (width as f32, height as f32),
            angle as f32,
        )
    }

    /// Corner points in bounding-box order: bottom-left of the rectangle's own
    /// frame first, then clockwise.
    pub fn corners(&self) -> [(f32, f32); 4] {
        let theta = self.angle.to_radians();
        let a = theta.sin() * 0.5;
        let b = theta.cos() * 0.5;
        let (cx, cy) = self.center;
        let (w, h) = self.size;

        let p0 = (cx - a * h - b * w, cy + b * h - a * w);
        let p1 = (cx + a * h - b * w, cy - b * h - a * w);
        let p2 = (2.0 * cx - p0.0, 2.0 * cy - p0.1);
        let p3 = (2.0 * cx - p1.0, 2.0 * cy - p1.1);

        [p0, p1, p2, p3]
    }

    /// Corners truncated to integer pixel coordinates.
    pub fn corners_i32(&self) -> [Point<i32>; 4] {
        self.corners().map(|(x, y)| Point::new(x as i32, y as i32))
    }
}

/// Representative wire color in channel-native Lab: every component on a
/// 0-255 scale, `a` and `b` centered on 128.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireColor {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl WireColor {
    pub fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    /// Build from CIE L*a*b* (L in 0-100, a/b centered on 0).
    pub fn from_lab(lab: Lab) -> Self {
        Self::new(lab.l * 255.0 / 100.0, lab.a + 128.0, lab.b + 128.0)
    }

    /// Rescale to CIE L*a*b* for perceptual distance.
    pub fn to_lab(self) -> Lab {
        Lab::new(self.l * 100.0 / 255.0, self.a - 128.0, self.b - 128.0)
    }
}

/// Wire colors left to right; `None` marks a wire with no evaluable pixels.
pub type ColorSequence = Vec<Option<WireColor>>;

/// Connector found in a frame.
#[derive(Debug, Clone)]
pub struct Connector {
    pub contour: Contour,
    pub rect: RotatedRect,
    /// Connector mask after wire removal and hole filling.
    pub mask: GrayImage,
}

/// Everything one inspection of a frame produced.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub colors: ColorSequence,
    /// Original frame with the connector and ROI boxes drawn on it.
    pub display: RgbImage,
    pub roi: RgbImage,
    pub wires: Vec<RgbImage>,
    pub connector: Connector,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_points(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_contour_area() {
        let contour = Contour::new(rect_points(10, 10, 30, 20));
        assert_eq!(contour.area(), 200.0);
        assert_eq!(Contour::new(vec![Point::new(1, 1)]).area(), 0.0);
    }

    #[test]
    fn test_axis_aligned_rect() {
        let rect = RotatedRect::from_points(&rect_points(10, 20, 110, 60));
        assert_eq!(rect.angle, 0.0);
        assert!((rect.size.0 - 100.0).abs() < 1e-3);
        assert!((rect.size.1 - 40.0).abs() < 1e-3);
        assert!((rect.center.0 - 60.0).abs() < 1e-3);
        assert!((rect.center.1 - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotated_rect_recovers_angle() {
        let original = RotatedRect::new((200.0, 200.0), (120.0, 40.0), 30.0);
        let points: Vec<Point<i32>> = original
            .corners()
            .iter()
            .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
            .collect();
        let rect = RotatedRect::from_points(&points);

        assert!((rect.angle - 30.0).abs() < 1.0, "angle {}", rect.angle);
        assert!((rect.size.0 - 120.0).abs() < 2.0);
        assert!((rect.size.1 - 40.0).abs() < 2.0);
    }

    #[test]
    fn test_corners_of_axis_aligned_rect() {
        let rect = RotatedRect::new((50.0, 50.0), (20.0, 10.0), 0.0);
        let corners = rect.corners();
        assert_eq!(corners[0], (40.0, 55.0));
        assert_eq!(corners[1], (40.0, 45.0));
        assert_eq!(corners[2], (60.0, 45.0));
        assert_eq!(corners[3], (60.0, 55.0));
    }

    #[test]
    fn test_wire_color_lab_scaling() {
        let color = WireColor::new(255.0, 128.0, 128.0);
        let lab = color.to_lab();
        assert!((lab.l - 100.0).abs() < 1e-4);
        assert!(lab.a.abs() < 1e-4);
        assert!(lab.b.abs() < 1e-4);
        assert_eq!(WireColor::from_lab(lab), color);
    }
}
