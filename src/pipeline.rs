use crate::config::{InspectionConfig, ThresholdStrategy};
use crate::detection::{connector, display, preprocessing, wire_color, wire_roi, wires};
use crate::error::{InspectionError, Result};
use crate::models::{ColorSequence, Connector, Contour, Inspection, WireColor};
use image::{DynamicImage, GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Runs every detection stage on a frame, from thresholding to wire colors.
///
/// Built once per session and reused for every frame:
///
/// ```no_run
/// # use harness_inspect::{InspectionConfig, InspectionPipeline};
/// # fn demo(background: image::RgbImage, frame: image::RgbImage) -> harness_inspect::Result<()> {
/// let pipeline = InspectionPipeline::new(InspectionConfig::default())
///     .with_background(&background)?;
/// if let Some(inspection) = pipeline.run(&frame)? {
///     println!("{} wires", inspection.colors.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct InspectionPipeline {
    config: InspectionConfig,
    /// Blurred brightness channel of the background reference.
    background: Option<GrayImage>,
    debug: Option<DebugConfig>,
    runs: AtomicUsize,
}

impl InspectionPipeline {
    pub fn new(config: InspectionConfig) -> Self {
        Self {
            config,
            background: None,
            debug: None,
            runs: AtomicUsize::new(0),
        }
    }

    /// Use `background` as the reference for background-relative thresholding.
    pub fn with_background(mut self, background: &RgbImage) -> Result<Self> {
        check_frame(background)?;
        let blurred = preprocessing::apply_blur(background, self.config.blur_sigma);
        self.background = Some(preprocessing::brightness_channel(&blurred));
        Ok(self)
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(InspectionError::DebugDirNotEmpty(output_dir));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Foreground mask of a frame using the configured strategy.
    pub fn threshold(&self, frame: &RgbImage) -> Result<GrayImage> {
        check_frame(frame)?;
        let blurred = preprocessing::apply_blur(frame, self.config.blur_sigma);
        self.threshold_blurred(&blurred)
    }

    fn threshold_blurred(&self, blurred: &RgbImage) -> Result<GrayImage> {
        match self.config.threshold_strategy {
            ThresholdStrategy::BackgroundRelative => {
                let background = self.background.as_ref().ok_or_else(|| {
                    InspectionError::Precondition(
                        "background-relative thresholding needs a background reference".into(),
                    )
                })?;
                preprocessing::threshold_background_relative(
                    &preprocessing::brightness_channel(blurred),
                    background,
                    self.config.min_background_value,
                    self.config.min_region_area,
                )
            }
            ThresholdStrategy::Otsu => Ok(preprocessing::threshold_otsu(blurred, self.config.min_region_area)),
        }
    }

    /// Find the connector, or `None` when the frame holds no candidate.
    pub fn locate_connector(&self, frame: &RgbImage) -> Result<Option<Connector>> {
        let mask = self.threshold(frame)?;
        self.connector_in_mask(&mask)
    }

    fn connector_in_mask(&self, mask: &GrayImage) -> Result<Option<Connector>> {
        if !preprocessing::has_connector_candidate(mask, &self.config.candidate) {
            tracing::debug!("no connector candidate");
            return Ok(None);
        }

        match connector::find_connector(mask, &self.config.connector) {
            Ok(connector) => Ok(Some(connector)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(error = %e, "connector lost after wire removal");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Inspect a decoded image; fails on anything but a 3-channel frame.
    pub fn run_image(&self, img: &DynamicImage) -> Result<Option<Inspection>> {
        let frame = preprocessing::ensure_frame(img)?;
        self.run(&frame)
    }

    /// Inspect one frame. `Ok(None)` means nothing to inspect in this frame.
    pub fn run(&self, frame: &RgbImage) -> Result<Option<Inspection>> {
        let run = self.runs.fetch_add(1, Ordering::Relaxed);
        let debug = self.debug.as_ref().map(|d| d.output_dir.join(format!("frame_{:02}", run + 1)));
        let debug = debug.as_deref();
        check_frame(frame)?;
        save_stage(debug, 0, "Input", std::slice::from_ref(frame))?;

        let blurred = preprocessing::apply_blur(frame, self.config.blur_sigma);
        let mask = self.threshold_blurred(&blurred)?;
        save_stage(debug, 1, "Threshold", std::slice::from_ref(&mask))?;

        let Some(connector) = self.connector_in_mask(&mask)? else {
            return Ok(None);
        };
        save_stage(debug, 2, "Connector", std::slice::from_ref(&connector.mask))?;

        let white_frame = preprocessing::fill_background_white(&blurred, &mask);
        save_stage(debug, 3, "White Background", std::slice::from_ref(&white_frame))?;

        let extraction = wire_roi::extract_wire_roi(frame, &white_frame, &connector.rect, &self.config);
        save_stage(debug, 4, "Wire ROI", std::slice::from_ref(&extraction.roi))?;

        let wires = wires::find_wires(&extraction.roi, &self.config.segmentation)?;
        save_stage(debug, 5, "Wires", &wires)?;

        let colors = wire_color::color_sequence(&wires, &self.config.colorimeter);
        tracing::info!(
            wires = colors.len(),
            angle = extraction.angle,
            attempts = extraction.attempts,
            "frame inspected"
        );

        Ok(Some(Inspection {
            colors,
            display: extraction.display,
            roi: extraction.roi,
            wires,
            connector,
        }))
    }

    /// Inspect `frame` and compare it against `reference`; the candidate
    /// section and the verdict badge are drawn on the returned display.
    pub fn check(&self, frame: &RgbImage, reference: &[Option<WireColor>]) -> Result<Option<(bool, Inspection)>> {
        let Some(mut inspection) = self.run(frame)? else {
            return Ok(None);
        };
        let matched = wire_color::matches_reference(&inspection.colors, reference, self.config.color_match_threshold);
        display::draw_check_section(&mut inspection.display, &self.config.candidate);
        display::draw_verdict(&mut inspection.display, matched);
        tracing::info!(matched, "reference check");
        Ok(Some((matched, inspection)))
    }
}

fn check_frame(frame: &RgbImage) -> Result<()> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(InspectionError::Precondition("frame is empty".into()));
    }
    Ok(())
}

/// Save one stage's images as `NN_stage_name/MM.png` when debugging.
fn save_stage<P>(dir: Option<&Path>, index: usize, name: &str, images: &[image::ImageBuffer<P, Vec<u8>>]) -> Result<()>
where
    P: image::Pixel<Subpixel = u8> + image::PixelWithColorType,
{
    let Some(dir) = dir else {
        return Ok(());
    };

    let step_dir_name = format!("{:02}_{}", index, name.to_lowercase().replace(' ', "_"));
    let step_dir = dir.join(&step_dir_name);
    std::fs::create_dir_all(&step_dir)?;

    for (idx, img) in images.iter().enumerate() {
        img.save(step_dir.join(format!("{:02}.png", idx + 1)))?;
    }
    tracing::debug!("saved {} images to {}/", images.len(), step_dir_name);
    Ok(())
}

/// Connector contour of `frame`, or `None` when there is none.
pub fn locate_connector(
    frame: &RgbImage,
    background: Option<&RgbImage>,
    config: &InspectionConfig,
) -> Result<Option<Contour>> {
    let pipeline = build(background, config)?;
    Ok(pipeline.locate_connector(frame)?.map(|c| c.contour))
}

/// Wire colors of `frame` with the annotated display, or `None` when no
/// connector is present.
pub fn extract_wire_color_sequence(
    frame: &RgbImage,
    background: Option<&RgbImage>,
    config: &InspectionConfig,
) -> Result<Option<(ColorSequence, RgbImage)>> {
    let pipeline = build(background, config)?;
    Ok(pipeline.run(frame)?.map(|i| (i.colors, i.display)))
}

fn build(background: Option<&RgbImage>, config: &InspectionConfig) -> Result<InspectionPipeline> {
    let pipeline = InspectionPipeline::new(config.clone());
    match background {
        Some(background) => pipeline.with_background(background),
        None => Ok(pipeline),
    }
}
