//! Marker-based watershed over a labeled partition of the image.
//!
//! A [`Partition`] assigns every pixel one [`Label`]. Seeds come from the
//! peaks of the distance transform of a binary mask; flooding then grows the
//! seeds through the unknown band in order of color similarity, so two wires
//! touching in the mask still end up as separate regions.
//!
//! The integer encoding used by other tools (`0` unknown, `1` background,
//! `-1` boundary, `2..` regions) exists only at [`Partition::to_raw`] and
//! [`Partition::from_raw`].

use crate::config::SegmentationParams;
use crate::detection::contours::{self, BACKGROUND, FOREGROUND};
use crate::error::{InspectionError, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::{euclidean_squared_distance_transform, Norm};
use imageproc::morphology::{dilate, open};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Index of a region in its partition's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Not yet claimed by flooding.
    Unknown,
    Background,
    /// Pixel where two different labels met.
    Boundary,
    Region(RegionId),
}

impl Label {
    pub fn to_raw(self) -> i32 {
        match self {
            Label::Unknown => 0,
            Label::Background => 1,
            Label::Boundary => -1,
            Label::Region(RegionId(id)) => id as i32 + 2,
        }
    }

    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Label::Unknown),
            1 => Ok(Label::Background),
            -1 => Ok(Label::Boundary),
            n if n >= 2 => Ok(Label::Region(RegionId((n - 2) as u32))),
            n => Err(InspectionError::Precondition(format!("invalid watershed label {n}"))),
        }
    }

    /// Labels that flooding may spread from.
    fn is_settled(self) -> bool {
        matches!(self, Label::Background | Label::Region(_))
    }
}

/// Arena entry for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionInfo {
    pub id: RegionId,
    pub pixel_count: u32,
}

/// Per-pixel labels plus the arena of regions they refer to.
#[derive(Debug, Clone)]
pub struct Partition {
    width: u32,
    height: u32,
    labels: Vec<Label>,
    regions: Vec<RegionInfo>,
}

impl Partition {
    /// Build markers: `sure_foreground` components become regions, pixels of
    /// `sure_background` outside them are unknown, everything else background.
    pub fn from_markers(sure_background: &GrayImage, sure_foreground: &GrayImage) -> Result<Self> {
        if sure_background.dimensions() != sure_foreground.dimensions() {
            return Err(InspectionError::Precondition(
                "marker masks differ in size".into(),
            ));
        }

        let (width, height) = sure_foreground.dimensions();
        let seeds = connected_components(sure_foreground, Connectivity::Eight, BACKGROUND);
        let region_count = seeds.pixels().map(|p| p[0]).max().unwrap_or(0);

        let mut labels = Vec::with_capacity((width * height) as usize);
        for (x, y, seed) in seeds.enumerate_pixels() {
            let label = if seed[0] > 0 {
                Label::Region(RegionId(seed[0] - 1))
            } else if sure_background.get_pixel(x, y)[0] != 0 {
                Label::Unknown
            } else {
                Label::Background
            };
            labels.push(label);
        }

        let regions = (0..region_count)
            .map(|id| RegionInfo {
                id: RegionId(id),
                pixel_count: 0,
            })
            .collect();

        let mut partition = Self {
            width,
            height,
            labels,
            regions,
        };
        partition.recount();
        Ok(partition)
    }

    pub fn from_raw(width: u32, height: u32, raw: &[i32]) -> Result<Self> {
        if raw.len() != (width as usize) * (height as usize) {
            return Err(InspectionError::Precondition(format!(
                "{} labels for a {width}x{height} partition",
                raw.len()
            )));
        }

        let labels = raw.iter().map(|&r| Label::from_raw(r)).collect::<Result<Vec<_>>>()?;
        let region_count = labels
            .iter()
            .filter_map(|l| match l {
                Label::Region(RegionId(id)) => Some(id + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        let mut partition = Self {
            width,
            height,
            labels,
            regions: (0..region_count)
                .map(|id| RegionInfo {
                    id: RegionId(id),
                    pixel_count: 0,
                })
                .collect(),
        };
        partition.recount();
        Ok(partition)
    }

    pub fn to_raw(&self) -> Vec<i32> {
        self.labels.iter().map(|l| l.to_raw()).collect()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn label(&self, x: u32, y: u32) -> Label {
        self.labels[self.index(x, y)]
    }

    pub fn regions(&self) -> &[RegionInfo] {
        &self.regions
    }

    /// Binary mask of one region.
    pub fn region_mask(&self, id: RegionId) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.label(x, y) == Label::Region(id) {
                FOREGROUND
            } else {
                BACKGROUND
            }
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    fn recount(&mut self) {
        for region in &mut self.regions {
            region.pixel_count = 0;
        }
        for label in &self.labels {
            if let Label::Region(RegionId(id)) = label {
                self.regions[*id as usize].pixel_count += 1;
            }
        }
    }

    fn neighbors(&self, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> + use<> {
        four_neighbors(x, y, self.width, self.height)
    }

    /// Flood the unknown pixels from the settled ones, guided by `image`.
    ///
    /// Pixels are claimed lowest color difference first, ties in arrival
    /// order. A pixel reached from two different labels becomes a boundary
    /// and does not spread further.
    pub fn flood(&mut self, image: &RgbImage) -> Result<()> {
        if image.dimensions() != self.dimensions() {
            return Err(InspectionError::Precondition(
                "guide image and markers differ in size".into(),
            ));
        }

        let mut queued = vec![false; self.labels.len()];
        let mut heap = BinaryHeap::new();
        let mut arrival = 0u64;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.label(x, y) != Label::Unknown {
                    continue;
                }
                let here = image.get_pixel(x, y);
                let priority = self
                    .neighbors(x, y)
                    .filter(|&(nx, ny)| self.label(nx, ny).is_settled())
                    .map(|(nx, ny)| color_difference(here, image.get_pixel(nx, ny)))
                    .min();
                if let Some(priority) = priority {
                    heap.push(Reverse((priority, arrival, x, y)));
                    arrival += 1;
                    queued[self.index(x, y)] = true;
                }
            }
        }

        while let Some(Reverse((_, _, x, y))) = heap.pop() {
            let mut label = None;
            for (nx, ny) in self.neighbors(x, y) {
                let neighbor = self.label(nx, ny);
                if !neighbor.is_settled() {
                    continue;
                }
                label = match label {
                    None => Some(neighbor),
                    Some(current) if current == neighbor => Some(current),
                    Some(_) => Some(Label::Boundary),
                };
            }

            let label = label.unwrap_or(Label::Boundary);
            let idx = self.index(x, y);
            self.labels[idx] = label;
            if label == Label::Boundary {
                continue;
            }

            let here = image.get_pixel(x, y);
            for (nx, ny) in self.neighbors(x, y) {
                let nidx = self.index(nx, ny);
                if self.labels[nidx] == Label::Unknown && !queued[nidx] {
                    let priority = color_difference(image.get_pixel(nx, ny), here);
                    heap.push(Reverse((priority, arrival, nx, ny)));
                    arrival += 1;
                    queued[nidx] = true;
                }
            }
        }

        self.recount();
        Ok(())
    }
}

fn four_neighbors(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    [
        (x > 0).then(|| (x - 1, y)),
        (y > 0).then(|| (x, y - 1)),
        (x + 1 < width).then(|| (x + 1, y)),
        (y + 1 < height).then(|| (x, y + 1)),
    ]
    .into_iter()
    .flatten()
}

/// Largest per-channel absolute difference.
fn color_difference(a: &Rgb<u8>, b: &Rgb<u8>) -> u8 {
    (0..3).map(|c| a[c].abs_diff(b[c])).max().unwrap_or(0)
}

/// Seed markers from a coarse binary mask of touching objects.
pub fn markers_from_mask(mask: &GrayImage, params: &SegmentationParams) -> Result<Partition> {
    let opened = open(mask, Norm::LInf, params.open_radius);
    let sure_background = dilate(&opened, Norm::LInf, params.background_dilate_radius);

    // Squared distance to the nearest background pixel
    let distance = euclidean_squared_distance_transform(&contours::invert(&opened));
    let peak = distance
        .pixels()
        .map(|p| p[0])
        .filter(|d| d.is_finite())
        .fold(0.0f64, f64::max)
        .sqrt();
    let cutoff = params.foreground_ratio as f64 * peak;
    tracing::debug!(peak, cutoff, "watershed seed distance");

    let sure_foreground = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let d = distance.get_pixel(x, y)[0];
        if peak > 0.0 && d.is_finite() && d.sqrt() > cutoff {
            FOREGROUND
        } else {
            Luma([0])
        }
    });

    Partition::from_markers(&sure_background, &sure_foreground)
}

/// Segment `mask` into separate objects, flooding over `image`.
pub fn watershed(image: &RgbImage, mask: &GrayImage, params: &SegmentationParams) -> Result<Partition> {
    let mut partition = markers_from_mask(mask, params)?;
    partition.flood(image)?;
    tracing::debug!(regions = partition.regions().len(), "watershed done");
    Ok(partition)
}
