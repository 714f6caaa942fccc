// SPDX-License-Identifier: MIT

//! Steep-slope (hazard) site records.

use serde::{Deserialize, Serialize};

use crate::models::backup::SlopeImageSet;
use crate::models::geo::{derive_point, needs_rederivation, DmsComponent, GeoPoint};

/// One endpoint of the slope, carrying the raw DMS components and the
/// derived decimal pair side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateGroup {
    /// Derived decimal-degree pair ([longitude, latitude])
    pub point: Option<GeoPoint>,
    pub latitude: DmsComponent,
    pub longitude: DmsComponent,
}

impl CoordinateGroup {
    /// Re-derive the decimal pair when warranted.
    ///
    /// `dms_changed` is decided by the caller that edited the record;
    /// see `needs_rederivation` for the combined policy.
    pub fn derive(&mut self, dms_changed: bool) {
        if needs_rederivation(self.point.as_ref(), dms_changed) {
            self.point = Some(derive_point(self.latitude, self.longitude));
        }
    }
}

/// Administrative location of the slope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlopeLocation {
    pub province: String,
    pub city: String,
    pub district: String,
    pub address: Option<String>,
    pub road_address: Option<String>,
    pub start: CoordinateGroup,
    pub end: CoordinateGroup,
}

/// Managing authority fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlopeManagement {
    pub organization: Option<String>,
    pub department: Option<String>,
    pub authority: Option<String>,
}

/// One inspection of the slope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub date: String,
    pub result: String,
    pub risk_level: String,
    pub risk_type: String,
}

/// Collapse-risk district designation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollapseRisk {
    pub district_no: Option<String>,
    pub district_name: Option<String>,
    pub designated: bool,
    pub designation_date: Option<String>,
}

/// Maintenance project assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceProject {
    pub year: Option<String>,
    pub kind: Option<String>,
}

/// A steep-slope site.
///
/// `history_number` is the stable inspection-history identifier used as
/// the owner key for image backups and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slope {
    /// Management number (unique, also the document id)
    pub management_no: String,
    pub name: String,
    /// Inspection-history number (owner key for backups/comments)
    pub history_number: String,
    pub location: SlopeLocation,
    pub management: SlopeManagement,
    pub inspections: Vec<Inspection>,
    pub collapse_risk: CollapseRisk,
    pub maintenance_project: MaintenanceProject,
    #[serde(default)]
    pub images: SlopeImageSet,
    pub created_at: String,
}

impl Slope {
    /// Derive both endpoint pairs before persistence.
    ///
    /// This is the explicit pipeline step writers call instead of a
    /// save hook, so the recompute policy stays visible and testable.
    pub fn derive_coordinates(&mut self, dms_changed: bool) {
        self.location.start.derive(dms_changed);
        self.location.end.derive(dms_changed);
    }

    /// Required fields that legacy bulk imports sometimes left empty.
    /// The create route validates these, so only imported records can
    /// come up short; the admin data-quality view reports them.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.history_number.trim().is_empty() {
            missing.push("history_number");
        }
        if self.location.province.trim().is_empty() {
            missing.push("location.province");
        }
        if self.location.city.trim().is_empty() {
            missing.push("location.city");
        }
        if self.location.district.trim().is_empty() {
            missing.push("location.district");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(lat: DmsComponent, lon: DmsComponent) -> CoordinateGroup {
        CoordinateGroup {
            point: None,
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn test_derive_fills_absent_pair() {
        let mut g = group(
            DmsComponent::new(37.0, 30.0, 0.0),
            DmsComponent::new(127.0, 0.0, 0.0),
        );
        g.derive(false);
        assert_eq!(g.point, Some(GeoPoint::new(127.0, 37.5)));
    }

    #[test]
    fn test_derive_preserves_manual_correction() {
        let mut g = group(
            DmsComponent::new(37.0, 30.0, 0.0),
            DmsComponent::new(127.0, 0.0, 0.0),
        );
        // Operator corrected the pair by hand; DMS untouched
        g.point = Some(GeoPoint::new(127.123, 37.456));
        g.derive(false);
        assert_eq!(g.point, Some(GeoPoint::new(127.123, 37.456)));
    }

    #[test]
    fn test_derive_recomputes_on_dms_change() {
        let mut g = group(
            DmsComponent::new(37.0, 30.0, 0.0),
            DmsComponent::new(127.0, 0.0, 0.0),
        );
        g.point = Some(GeoPoint::new(127.123, 37.456));
        g.derive(true);
        assert_eq!(g.point, Some(GeoPoint::new(127.0, 37.5)));
    }

    fn complete_slope() -> Slope {
        Slope {
            management_no: "M-1".to_string(),
            name: "Test slope".to_string(),
            history_number: "H-1".to_string(),
            location: SlopeLocation {
                province: "Gyeonggi".to_string(),
                city: "Seongnam".to_string(),
                district: "Bundang".to_string(),
                ..Default::default()
            },
            management: Default::default(),
            inspections: Vec::new(),
            collapse_risk: Default::default(),
            maintenance_project: Default::default(),
            images: Default::default(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_complete_record_has_no_missing_fields() {
        assert!(complete_slope().missing_required_fields().is_empty());
    }

    #[test]
    fn test_missing_fields_reported_by_path() {
        let mut slope = complete_slope();
        slope.name = String::new();
        slope.location.city = "   ".to_string();

        assert_eq!(
            slope.missing_required_fields(),
            vec!["name", "location.city"]
        );
    }

    #[test]
    fn test_derive_recomputes_zero_pair() {
        let mut g = group(
            DmsComponent::new(37.0, 30.0, 0.0),
            DmsComponent::new(127.0, 0.0, 0.0),
        );
        g.point = Some(GeoPoint::new(0.0, 0.0));
        g.derive(false);
        assert_eq!(g.point, Some(GeoPoint::new(127.0, 37.5)));
    }
}
