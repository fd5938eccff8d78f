use crate::config::ConnectorParams;
use crate::detection::contours;
use crate::error::{InspectionError, Result};
use crate::models::Connector;
use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate, erode};

/// Cut the thin wires off the connector body.
///
/// Erosion severs the wires, the largest surviving region is taken as the
/// body, and dilation by the same radius grows it back. The boundary shape is
/// not preserved exactly; only the oriented box is used afterwards. Returns an
/// empty mask when nothing above `min_connector_area` survives erosion.
pub fn remove_wires(mask: &GrayImage, params: &ConnectorParams) -> GrayImage {
    let radius = params.radius(params.erode_iterations);
    let eroded = erode(mask, Norm::LInf, radius);
    let body = contours::filter_for_largest_region(&eroded, params.min_connector_area);
    if contours::foreground_area(&body) == 0 {
        return body;
    }

    let restored = dilate(&body, Norm::LInf, radius);
    // Specular highlights leave small holes
    close(&restored, Norm::LInf, params.radius(params.close_iterations))
}

/// Locate the connector in a foreground mask.
///
/// Fails with [`InspectionError::EmptyMask`] when no contour remains after
/// wire removal; callers that already know a candidate is present may treat
/// that as a hard failure.
pub fn find_connector(mask: &GrayImage, params: &ConnectorParams) -> Result<Connector> {
    let body = remove_wires(mask, params);
    let found = contours::find_external_contours(&body);
    tracing::debug!(contours = found.len(), "connector contours after wire removal");

    let contour = contours::largest_contour(found).ok_or(InspectionError::EmptyMask)?;
    let rect = contour.min_area_rect();
    tracing::debug!(
        center = ?rect.center,
        size = ?rect.size,
        angle = rect.angle,
        "connector located"
    );

    Ok(Connector {
        contour,
        rect,
        mask: body,
    })
}
