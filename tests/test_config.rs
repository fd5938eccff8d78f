//! Loading and saving configuration files.

mod common;

use common::*;
use std::io::Write;

#[test]
fn test_round_trip_through_file() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("inspect.json");

    let config = InspectionConfig {
        threshold_strategy: ThresholdStrategy::Otsu,
        color_match_threshold: 4.5,
        ..wide_connector_config()
    };
    config.to_json_file(&path)?;

    let loaded = InspectionConfig::from_json_file(&path)?;
    assert_eq!(loaded.threshold_strategy, ThresholdStrategy::Otsu);
    assert_eq!(loaded.color_match_threshold, 4.5);
    assert!(!loaded.height_greater_than_width);
    Ok(())
}

#[test]
fn test_invalid_values_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"{{ "connector": {{ "kernel_size": 4 }} }}"#)?;

    let result = InspectionConfig::from_json_file(file.path());
    assert!(matches!(result, Err(InspectionError::Config(_))));
    Ok(())
}

#[test]
fn test_malformed_json_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "{{ not json")?;

    let result = InspectionConfig::from_json_file(file.path());
    assert!(matches!(result, Err(InspectionError::Json(_))));
    Ok(())
}
