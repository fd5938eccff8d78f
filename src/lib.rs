pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod workflow;

pub use capture::{FrameSlot, FrameSource, ReplayStream};
pub use config::{InspectionConfig, ThresholdStrategy};
pub use detection::wire_color::{is_same_wire_color, matches_reference};
pub use error::{InspectionError, Result};
pub use models::{ColorSequence, Connector, Contour, Inspection, RotatedRect, WireColor};
pub use pipeline::{extract_wire_color_sequence, locate_connector, InspectionPipeline};
pub use workflow::{transition, Event, Key, Session, Stage};
