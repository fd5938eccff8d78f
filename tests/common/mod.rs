mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from harness_inspect for tests
pub use harness_inspect::{
    ColorSequence, InspectionConfig, InspectionError, InspectionPipeline, ThresholdStrategy, WireColor,
};
