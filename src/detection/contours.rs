use crate::models::{Contour, Region};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;

pub const FOREGROUND: Luma<u8> = Luma([255]);
pub const BACKGROUND: Luma<u8> = Luma([0]);

/// Label the 8-connected foreground regions of a binary mask.
///
/// Returns the label image alongside per-region statistics ordered by label.
pub fn label_regions(mask: &GrayImage) -> (ImageBuffer<Luma<u32>, Vec<u32>>, Vec<Region>) {
    let labeled = connected_components(mask, Connectivity::Eight, BACKGROUND);
    let regions = collect_regions(&labeled);
    (labeled, regions)
}

fn collect_regions(labeled: &ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<Region> {
    let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue;
        }

        regions
            .entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
                *count += 1;
            })
            .or_insert((x, y, x, y, 1));
    }

    let mut regions: Vec<Region> = regions
        .into_iter()
        .map(|(label, (min_x, min_y, max_x, max_y, count))| Region {
            label,
            min_x,
            min_y,
            max_x,
            max_y,
            pixel_count: count,
        })
        .collect();
    regions.sort_by_key(|r| r.label);
    regions
}

/// Paint every region whose area is below `min_area` as background.
///
/// Regions with area exactly `min_area` are kept.
pub fn filter_out_small_regions(mask: &GrayImage, min_area: u32) -> GrayImage {
    let (labeled, regions) = label_regions(mask);
    let keep: HashMap<u32, bool> = regions
        .iter()
        .map(|r| (r.label, r.area() >= min_area))
        .collect();

    let mut filtered = mask.clone();
    for (x, y, label) in labeled.enumerate_pixels() {
        if label[0] != 0 && !keep.get(&label[0]).copied().unwrap_or(false) {
            filtered.put_pixel(x, y, BACKGROUND);
        }
    }
    filtered
}

/// Keep only the largest region, with its holes filled.
///
/// Returns an all-background mask when the largest region is smaller than
/// `min_area` or the mask has no foreground at all.
pub fn filter_for_largest_region(mask: &GrayImage, min_area: u32) -> GrayImage {
    let (labeled, regions) = label_regions(mask);
    let mut result = GrayImage::new(mask.width(), mask.height());

    // First region wins ties so the choice is stable in scan order
    let largest = regions
        .iter()
        .fold(None::<&Region>, |best, r| match best {
            Some(b) if b.area() >= r.area() => Some(b),
            _ => Some(r),
        });

    let Some(largest) = largest.filter(|r| r.area() >= min_area) else {
        return result;
    };

    for (x, y, label) in labeled.enumerate_pixels() {
        if label[0] == largest.label {
            result.put_pixel(x, y, FOREGROUND);
        }
    }
    fill_holes(&result)
}

/// Fill background pockets that are not connected to the image border.
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let inverted = invert(mask);
    let labeled = connected_components(&inverted, Connectivity::Four, BACKGROUND);
    let enclosed: HashMap<u32, bool> = collect_regions(&labeled)
        .into_iter()
        .map(|r| (r.label, !r.touches_border(width, height)))
        .collect();

    let mut filled = mask.clone();
    for (x, y, label) in labeled.enumerate_pixels() {
        if label[0] != 0 && enclosed.get(&label[0]).copied().unwrap_or(false) {
            filled.put_pixel(x, y, FOREGROUND);
        }
    }
    filled
}

pub fn invert(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([255 - mask.get_pixel(x, y)[0]])
    })
}

/// Total number of foreground pixels.
pub fn foreground_area(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != 0).count() as u64
}

/// True if some foreground region is strictly larger than `min_area`.
pub fn has_region_larger_than(mask: &GrayImage, min_area: u32) -> bool {
    label_regions(mask).1.iter().any(|r| r.area() > min_area)
}

/// Outer boundaries of the top-level foreground regions.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Contour with the largest enclosed area; the earliest one wins ties.
pub fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
    contours.into_iter().fold(None, |best: Option<(f64, Contour)>, c| {
        let area = c.area();
        match best {
            Some((best_area, b)) if best_area >= area => Some((best_area, b)),
            _ => Some((area, c)),
        }
    })
    .map(|(_, c)| c)
}

/// Stable left-to-right order by the x coordinate of each oriented box center.
pub fn sort_contours_left_to_right(mut contours: Vec<Contour>) -> Vec<Contour> {
    contours.sort_by(|a, b| {
        let ax = a.min_area_rect().center.0;
        let bx = b.min_area_rect().center.0;
        ax.total_cmp(&bx)
    });
    contours
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn mask_with_rects(rects: &[(i32, i32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(100, 100);
        for &(x, y, w, h) in rects {
            draw_filled_rect_mut(&mut mask, Rect::at(x, y).of_size(w, h), FOREGROUND);
        }
        mask
    }

    #[test]
    fn test_small_regions_removed_and_boundary_kept() {
        // 25 px, 24 px, 100 px
        let mask = mask_with_rects(&[(0, 0, 5, 5), (20, 20, 4, 6), (50, 50, 10, 10)]);
        let filtered = filter_out_small_regions(&mask, 25);

        assert_eq!(filtered.get_pixel(2, 2)[0], 255, "area == threshold is kept");
        assert_eq!(filtered.get_pixel(21, 21)[0], 0);
        assert_eq!(filtered.get_pixel(55, 55)[0], 255);
        assert_eq!(foreground_area(&filtered), 125);
    }

    #[test]
    fn test_largest_region_fills_holes() {
        let mut mask = mask_with_rects(&[(10, 10, 40, 40), (70, 70, 5, 5)]);
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(5, 5), BACKGROUND);

        let largest = filter_for_largest_region(&mask, 100);
        assert_eq!(largest.get_pixel(22, 22)[0], 255, "hole filled");
        assert_eq!(largest.get_pixel(72, 72)[0], 0, "smaller region dropped");
        assert_eq!(foreground_area(&largest), 1600);
    }

    #[test]
    fn test_largest_region_below_floor_is_empty() {
        let mask = mask_with_rects(&[(10, 10, 5, 5)]);
        assert_eq!(foreground_area(&filter_for_largest_region(&mask, 26)), 0);
        assert_eq!(foreground_area(&filter_for_largest_region(&GrayImage::new(8, 8), 0)), 0);
    }

    #[test]
    fn test_external_contours_ignore_holes() {
        let mut mask = mask_with_rects(&[(10, 10, 30, 30), (60, 10, 10, 10)]);
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(5, 5), BACKGROUND);

        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 2);

        let largest = largest_contour(contours).unwrap();
        assert!((largest.area() - 29.0 * 29.0).abs() < 1e-6);
    }

    #[test]
    fn test_sort_left_to_right() {
        let mask = mask_with_rects(&[(70, 10, 10, 30), (10, 10, 10, 30), (40, 10, 10, 30)]);
        let sorted = sort_contours_left_to_right(find_external_contours(&mask));
        let xs: Vec<f32> = sorted.iter().map(|c| c.min_area_rect().center.0).collect();
        assert_eq!(xs.len(), 3);
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);
    }
}
