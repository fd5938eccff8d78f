//! Wire separation on synthetic wire strips.

mod common;

use harness_inspect::config::SegmentationParams;
use harness_inspect::detection::watershed::{watershed, Label};
use harness_inspect::detection::wires::find_wires;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Two disks overlapping in a narrow neck, red on the left and blue on the right.
fn touching_blobs() -> RgbImage {
    let mut roi = RgbImage::from_pixel(90, 40, WHITE);
    draw_filled_circle_mut(&mut roi, (32, 20), 14, common::BLUE);
    draw_filled_circle_mut(&mut roi, (56, 20), 14, common::BLUE);
    draw_filled_circle_mut(&mut roi, (32, 20), 14, common::RED);
    roi
}

#[test]
fn test_touching_blobs_become_two_wires() -> anyhow::Result<()> {
    let wires = find_wires(&touching_blobs(), &SegmentationParams::default())?;
    assert_eq!(wires.len(), 2);

    let center = |img: &RgbImage| *img.get_pixel(img.width() / 2, img.height() / 2);
    let left = center(&wires[0]);
    let right = center(&wires[1]);
    assert!(left[0] > 150 && left[2] < 80, "left crop should be red: {left:?}");
    assert!(right[2] > 150 && right[0] < 80, "right crop should be blue: {right:?}");
    Ok(())
}

#[test]
fn test_same_color_blobs_still_split() -> anyhow::Result<()> {
    let mut mask = GrayImage::new(90, 40);
    draw_filled_circle_mut(&mut mask, (32, 20), 14, image::Luma([255]));
    draw_filled_circle_mut(&mut mask, (56, 20), 14, image::Luma([255]));
    let roi = RgbImage::from_fn(90, 40, |x, y| if mask.get_pixel(x, y)[0] > 0 { common::GREEN } else { WHITE });

    let partition = watershed(&roi, &mask, &SegmentationParams::default())?;
    assert_eq!(partition.regions().len(), 2);
    assert!(matches!(partition.label(32, 20), Label::Region(_)));
    assert_ne!(partition.label(32, 20), partition.label(56, 20));

    // Raw encoding keeps the background/boundary convention
    let raw = partition.to_raw();
    assert_eq!(raw[0], 1);
    assert!(raw.iter().all(|&r| r >= -1));
    Ok(())
}

#[test]
fn test_blank_strip_yields_nothing() -> anyhow::Result<()> {
    let wires = find_wires(&RgbImage::from_pixel(60, 30, WHITE), &SegmentationParams::default())?;
    assert!(wires.is_empty());
    Ok(())
}
