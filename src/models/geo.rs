// SPDX-License-Identifier: MIT

//! DMS coordinate derivation and point geometry.
//!
//! Slope surveys record positions as degree/minute/second components.
//! The derived decimal-degree pair is stored next to the raw components
//! so that either form can be read back. Derivation happens as an
//! explicit step before persistence (see `routes::slopes`), never as an
//! implicit save hook.

use serde::{Deserialize, Serialize};

/// GeoJSON point geometry.
///
/// Invariant: `coordinates` is always `[longitude, latitude]` - GeoJSON
/// order, not natural reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    /// True when the pair carries no usable position (both components 0).
    pub fn is_zero(&self) -> bool {
        self.coordinates[0] == 0.0 && self.coordinates[1] == 0.0
    }
}

/// One degree/minute/second group as captured from survey sheets.
/// Missing components are treated as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DmsComponent {
    pub degree: Option<f64>,
    pub minute: Option<f64>,
    pub second: Option<f64>,
}

impl DmsComponent {
    pub fn new(degree: f64, minute: f64, second: f64) -> Self {
        Self {
            degree: Some(degree),
            minute: Some(minute),
            second: Some(second),
        }
    }

    /// Derive the decimal-degree value.
    ///
    /// The degree is rounded to the nearest integer before combination
    /// (half-way cases away from zero, so -37.5 degrees rounds to -38);
    /// minute and second are not rounded. Total: never fails, and range
    /// validity is deliberately not checked here.
    pub fn decimal_degrees(&self) -> f64 {
        self.degree.unwrap_or(0.0).round()
            + self.minute.unwrap_or(0.0) / 60.0
            + self.second.unwrap_or(0.0) / 3600.0
    }
}

/// Derive a point from a latitude group and a longitude group.
pub fn derive_point(latitude: DmsComponent, longitude: DmsComponent) -> GeoPoint {
    GeoPoint::new(longitude.decimal_degrees(), latitude.decimal_degrees())
}

/// Decide whether a derived pair must be recomputed.
///
/// Combined rule: recompute when the raw DMS inputs changed since the
/// last derivation, or when the stored pair is absent or zero-valued.
/// A manually corrected pair with no matching DMS edit is left alone.
pub fn needs_rederivation(existing: Option<&GeoPoint>, dms_changed: bool) -> bool {
    dms_changed || existing.map_or(true, GeoPoint::is_zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_degrees_exact() {
        let dms = DmsComponent::new(37.0, 30.0, 0.0);
        assert_eq!(dms.decimal_degrees(), 37.5);
    }

    #[test]
    fn test_decimal_degrees_all_absent() {
        let dms = DmsComponent::default();
        assert_eq!(dms.decimal_degrees(), 0.0);
    }

    #[test]
    fn test_decimal_degrees_seconds() {
        // 127 degrees, 0 minutes, 36 seconds = 127.01
        let dms = DmsComponent::new(127.0, 0.0, 36.0);
        assert!((dms.decimal_degrees() - 127.01).abs() < 1e-12);
    }

    #[test]
    fn test_degree_rounded_before_combination() {
        // 37.6 degrees rounds to 38 before minutes are added
        let dms = DmsComponent::new(37.6, 30.0, 0.0);
        assert_eq!(dms.decimal_degrees(), 38.5);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let dms = DmsComponent::new(35.0, 12.0, 45.5);
        assert_eq!(dms.decimal_degrees(), dms.decimal_degrees());
    }

    #[test]
    fn test_negative_input_does_not_fail() {
        let dms = DmsComponent::new(-37.0, 30.0, 0.0);
        assert_eq!(dms.decimal_degrees(), -36.5);
    }

    #[test]
    fn test_negative_half_degree_ties_away_from_zero() {
        let dms = DmsComponent::new(-37.5, 0.0, 0.0);
        assert_eq!(dms.decimal_degrees(), -38.0);
    }

    #[test]
    fn test_derive_point_geojson_order() {
        let lat = DmsComponent::new(37.0, 30.0, 0.0);
        let lon = DmsComponent::new(127.0, 0.0, 0.0);
        let point = derive_point(lat, lon);
        // Longitude first
        assert_eq!(point.coordinates, [127.0, 37.5]);
        assert_eq!(point.kind, "Point");
    }

    #[test]
    fn test_needs_rederivation_rules() {
        let derived = GeoPoint::new(127.0, 37.5);
        let zero = GeoPoint::new(0.0, 0.0);

        // DMS changed: always recompute
        assert!(needs_rederivation(Some(&derived), true));
        // Untouched DMS with a usable pair: keep the manual correction
        assert!(!needs_rederivation(Some(&derived), false));
        // Absent or zero pair: recompute even without a DMS edit
        assert!(needs_rederivation(None, false));
        assert!(needs_rederivation(Some(&zero), false));
    }
}
