use foundation::{BuildingId, Polygon};
use serde::{Deserialize, Serialize};

/// Zoning attributes attached to a building when known.
///
/// Field aliases accept the open-data column names (`lu_code`, `major`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandUseRecord {
    #[serde(default, alias = "lu_code")]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "major")]
    pub category: Option<String>,
    #[serde(default, alias = "generalize")]
    pub generalized_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "lu_bylaw")]
    pub bylaw: Option<String>,
}

impl LandUseRecord {
    /// True when `needle` equals (case-insensitively) any of the textual
    /// attributes, or is contained in the description or label.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let exact = [
            &self.code,
            &self.category,
            &self.generalized_type,
            &self.bylaw,
        ]
        .into_iter()
        .flatten()
        .any(|v| v.to_lowercase() == needle);
        exact
            || [&self.description, &self.label]
                .into_iter()
                .flatten()
                .any(|v| v.to_lowercase().contains(&needle))
    }
}

/// A building as loaded from the data source. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    #[serde(default)]
    pub footprint: Polygon,
    #[serde(default)]
    pub ground_elevation: Option<f64>,
    #[serde(default)]
    pub roof_elevation: Option<f64>,
    #[serde(default)]
    pub land_use: Option<LandUseRecord>,
}

impl Building {
    pub fn new(id: impl Into<BuildingId>, footprint: Polygon) -> Self {
        Self {
            id: id.into(),
            footprint,
            ground_elevation: None,
            roof_elevation: None,
            land_use: None,
        }
    }

    pub fn with_elevations(mut self, ground: f64, roof: f64) -> Self {
        self.ground_elevation = Some(ground);
        self.roof_elevation = Some(roof);
        self
    }

    pub fn with_land_use(mut self, land_use: LandUseRecord) -> Self {
        self.land_use = Some(land_use);
        self
    }

    /// `roof - ground` clamped at zero, or `None` when either elevation is
    /// missing or not finite.
    pub fn height(&self) -> Option<f64> {
        let ground = self.ground_elevation.filter(|v| v.is_finite())?;
        let roof = self.roof_elevation.filter(|v| v.is_finite())?;
        Some((roof - ground).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{Building, LandUseRecord};
    use foundation::{BuildingId, GeoPoint, Polygon};
    use pretty_assertions::assert_eq;

    #[test]
    fn height_clamps_and_needs_both_elevations() {
        let b = Building::new(1, Polygon::default());
        assert_eq!(b.height(), None);
        assert_eq!(b.clone().with_elevations(1040.0, 1070.5).height(), Some(30.5));
        assert_eq!(b.clone().with_elevations(1070.0, 1040.0).height(), Some(0.0));
        assert_eq!(b.with_elevations(f64::NAN, 10.0).height(), None);
    }

    #[test]
    fn land_use_accepts_open_data_names() {
        let json = r#"{"lu_code":"R-C1","description":"Residential - Contextual One Dwelling",
            "major":"Residential","generalize":"Low Density","label":"R-C1","lu_bylaw":"1P2007"}"#;
        let lu: LandUseRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(lu.code.as_deref(), Some("R-C1"));
        assert_eq!(lu.category.as_deref(), Some("Residential"));
        assert_eq!(lu.bylaw.as_deref(), Some("1P2007"));
        assert!(lu.matches_text("residential"));
        assert!(lu.matches_text("r-c1"));
        assert!(!lu.matches_text("industrial"));
    }

    #[test]
    fn building_deserializes_string_id_as_canonical() {
        let json = r#"{"id":"42","footprint":[[-114.0,51.0],[-114.0,51.001],[-113.999,51.0]]}"#;
        let b: Building = serde_json::from_str(json).expect("parse");
        assert_eq!(b.id, BuildingId::from_int(42));
        assert_eq!(b.footprint.points()[1], GeoPoint::new(-114.0, 51.001));
        assert!(b.land_use.is_none());
    }
}
