//! Property tests for the mask filters and the sequence matcher.

use harness_inspect::detection::contours::{filter_out_small_regions, foreground_area, label_regions};
use harness_inspect::{matches_reference, WireColor};
use image::{GrayImage, Luma};
use proptest::prelude::*;

fn arb_mask() -> impl Strategy<Value = GrayImage> {
    (4u32..24, 4u32..24).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<bool>(), (w * h) as usize).prop_map(move |bits| {
            GrayImage::from_fn(w, h, |x, y| Luma([if bits[(y * w + x) as usize] { 255 } else { 0 }]))
        })
    })
}

fn arb_color() -> impl Strategy<Value = WireColor> {
    (0.0f32..255.0, 0.0f32..255.0, 0.0f32..255.0).prop_map(|(l, a, b)| WireColor::new(l, a, b))
}

proptest! {
    #[test]
    fn area_filter_never_grows(mask in arb_mask(), min_area in 0u32..20) {
        let filtered = filter_out_small_regions(&mask, min_area);
        prop_assert!(foreground_area(&filtered) <= foreground_area(&mask));
    }

    #[test]
    fn area_filter_removes_exactly_small_regions(mask in arb_mask(), min_area in 0u32..20) {
        let filtered = filter_out_small_regions(&mask, min_area);
        let (labels, regions) = label_regions(&mask);

        for (x, y, label) in labels.enumerate_pixels() {
            if label[0] == 0 {
                prop_assert_eq!(filtered.get_pixel(x, y)[0], 0);
                continue;
            }
            let region = regions.iter().find(|r| r.label == label[0]).unwrap();
            let kept = filtered.get_pixel(x, y)[0] != 0;
            prop_assert_eq!(kept, region.area() >= min_area);
        }
    }

    #[test]
    fn sequence_matches_itself(colors in prop::collection::vec(arb_color(), 0..8), threshold in 0.0f32..10.0) {
        let sequence: Vec<Option<WireColor>> = colors.into_iter().map(Some).collect();
        prop_assert!(matches_reference(&sequence, &sequence, threshold));
    }

    #[test]
    fn length_mismatch_never_matches(
        colors in prop::collection::vec(arb_color(), 1..8),
        threshold in 0.0f32..1000.0,
    ) {
        let reference: Vec<Option<WireColor>> = colors.into_iter().map(Some).collect();
        let shorter = &reference[..reference.len() - 1];
        prop_assert!(!matches_reference(shorter, &reference, threshold));
        prop_assert!(!matches_reference(&reference, shorter, threshold));
    }
}
