//! Detection stages, leaf first: thresholding and contour filtering, connector
//! location, orientation, wire strip extraction, wire segmentation and wire
//! colors. [`crate::pipeline::InspectionPipeline`] chains them per frame.

pub mod connector;
pub mod contours;
pub mod display;
pub mod orientation;
pub mod preprocessing;
pub mod transform;
pub mod watershed;
pub mod wire_color;
pub mod wire_roi;
pub mod wires;
