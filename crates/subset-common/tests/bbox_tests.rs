//! Comprehensive tests for BoundingBox and AreaValue operations.

use subset_common::{AreaValue, BboxParseError, BoundingBox, SubsetError};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    assert_eq!(bbox.west, -180.0);
    assert_eq!(bbox.south, -90.0);
    assert_eq!(bbox.east, 180.0);
    assert_eq!(bbox.north, 90.0);
    assert_eq!(bbox.width(), 360.0);
    assert_eq!(bbox.height(), 180.0);
}

#[test]
fn test_bbox_copy() {
    let bbox1 = BoundingBox::new(0.0, 49.0, 10.0, 65.0);
    let bbox2 = bbox1;
    assert_eq!(bbox1, bbox2);
}

// ============================================================================
// from_values tests
// ============================================================================

#[test]
fn test_from_values_mixed_numbers_and_strings() {
    let values = vec![
        AreaValue::from(0i32),
        AreaValue::from("49.0"),
        AreaValue::from(10.0f64),
        AreaValue::from(" 65 "),
    ];
    let bbox = BoundingBox::from_values(&values).unwrap();
    assert_eq!(bbox, BoundingBox::new(0.0, 49.0, 10.0, 65.0));
}

#[test]
fn test_from_values_rejects_non_finite() {
    let values: Vec<AreaValue> = vec!["0".into(), "NaN".into(), "10".into(), "65".into()];
    assert!(matches!(
        BoundingBox::from_values(&values),
        Err(BboxParseError::InvalidNumber(_))
    ));

    let values: Vec<AreaValue> = vec![0.0f64.into(), f64::INFINITY.into(), 10.0f64.into(), 65.0f64.into()];
    assert!(BoundingBox::from_values(&values).is_err());
}

#[test]
fn test_from_values_too_many() {
    let values: Vec<AreaValue> = (0..5i32).map(AreaValue::from).collect();
    assert_eq!(
        BoundingBox::from_values(&values),
        Err(BboxParseError::WrongLength(5))
    );
}

#[test]
fn test_from_values_empty() {
    assert_eq!(BoundingBox::from_values(&[]), Err(BboxParseError::WrongLength(0)));
}

// ============================================================================
// from_csv tests
// ============================================================================

#[test]
fn test_parse_csv_floating() {
    let bbox = BoundingBox::from_csv("-125.5,24.75,-66.25,50.125").unwrap();
    assert_eq!(bbox.west, -125.5);
    assert_eq!(bbox.south, 24.75);
    assert_eq!(bbox.east, -66.25);
    assert_eq!(bbox.north, 50.125);
}

#[test]
fn test_parse_csv_with_spaces() {
    let bbox = BoundingBox::from_csv(" 0 , 49 , 10 , 65 ").unwrap();
    assert_eq!(bbox.lon_bnds(), (0.0, 10.0));
    assert_eq!(bbox.lat_bnds(), (49.0, 65.0));
}

#[test]
fn test_parse_csv_wrong_count() {
    assert!(matches!(
        BoundingBox::from_csv("0,49,10"),
        Err(BboxParseError::InvalidFormat(_))
    ));
}

#[test]
fn test_parse_csv_word() {
    let err = BoundingBox::from_csv("zero,49,10,65").unwrap_err();
    assert_eq!(err, BboxParseError::InvalidNumber("\"zero\"".to_string()));
}

// ============================================================================
// Geometry tests
// ============================================================================

#[test]
fn test_lat_bnds_from_north_first_box() {
    let bbox = BoundingBox::new(100.0, -10.0, 150.0, -40.0);
    assert_eq!(bbox.lat_bnds(), (-40.0, -10.0));
}

#[test]
fn test_crosses_antimeridian() {
    assert!(BoundingBox::new(160.0, -50.0, -140.0, 50.0).crosses_antimeridian());
    assert!(!BoundingBox::new(-140.0, -50.0, 160.0, 50.0).crosses_antimeridian());
}

#[test]
fn test_contains_point_edges() {
    let bbox = BoundingBox::new(0.0, 49.0, 10.0, 65.0);
    assert!(bbox.contains_point(0.0, 49.0));
    assert!(bbox.contains_point(10.0, 65.0));
    assert!(!bbox.contains_point(10.000001, 50.0));
}

#[test]
fn test_intersects_touching_edge() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    let c = BoundingBox::new(20.5, 0.0, 30.0, 10.0);
    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));
}

// ============================================================================
// Error mapping tests
// ============================================================================

#[test]
fn test_bbox_error_is_invalid_area_parameter() {
    let err = SubsetError::from_bbox(BboxParseError::WrongLength(3));
    assert_eq!(err.exception_code(), "InvalidParameterValue");
    assert!(err.is_parameter_error());
    assert!(err.to_string().contains("area"));
}

// ============================================================================
// Serde tests
// ============================================================================

#[test]
fn test_area_values_deserialize_untagged() {
    let values: Vec<AreaValue> = serde_json::from_str(r#"[0, "49", 10.5, "65"]"#).unwrap();
    assert_eq!(values[0], AreaValue::Number(0.0));
    assert_eq!(values[1], AreaValue::Text("49".to_string()));
    assert_eq!(BoundingBox::from_values(&values).unwrap().east, 10.5);
}
