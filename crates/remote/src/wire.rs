//! JSON shapes exchanged with the backend.

use buildings::{Building, LandUseRecord};
use catalog::FilterSpec;
use foundation::{BuildingId, GeoPoint, Polygon};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// GeoJSON geometry of a footprint. Only the outer ring is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<GeoPoint>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<GeoPoint>>> },
}

impl Geometry {
    /// Outer ring; for a multipolygon, the first polygon's outer ring.
    pub fn outer_ring(&self) -> Option<Polygon> {
        let ring = match self {
            Geometry::Polygon { coordinates } => coordinates.first()?,
            Geometry::MultiPolygon { coordinates } => coordinates.first()?.first()?,
        };
        Some(Polygon::new(ring.clone()))
    }

    /// Every outer ring (one for a polygon).
    pub fn outer_rings(&self) -> Vec<Polygon> {
        match self {
            Geometry::Polygon { coordinates } => {
                coordinates.first().cloned().map(Polygon::new).into_iter().collect()
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|p| p.first().cloned().map(Polygon::new))
                .collect(),
        }
    }
}

/// Building record as served by `GET buildings` (open-data column names).
///
/// Elevations arrive as numbers or numeric strings; unreadable values become
/// `None`. An unreadable geometry becomes `None` rather than failing the whole
/// response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawBuilding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BuildingId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub struct_id: Option<BuildingId>,
    #[serde(default, deserialize_with = "lenient_geometry")]
    pub polygon: Option<Geometry>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grd_elev_min_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grd_elev_max_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grd_elev_min_y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grd_elev_max_y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grd_elev_min_z: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grd_elev_max_z: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rooftop_elev_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rooftop_elev_y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rooftop_elev_z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_use: Option<LandUseRecord>,
}

impl RawBuilding {
    /// `id`, else `struct_id`, else the record's position in the response.
    pub fn resolved_id(&self, position: usize) -> BuildingId {
        self.id
            .clone()
            .or_else(|| self.struct_id.clone())
            .unwrap_or_else(|| BuildingId::from_int(position as i64))
    }

    pub fn footprint(&self) -> Polygon {
        self.polygon
            .as_ref()
            .and_then(Geometry::outer_ring)
            .unwrap_or_default()
    }

    /// Rooftop minus lowest ground elevation, when both are known.
    pub fn height(&self) -> Option<f64> {
        Some(self.rooftop_elev_z? - self.grd_elev_min_z?)
    }

    pub fn into_building(self, position: usize) -> Building {
        Building {
            id: self.resolved_id(position),
            footprint: self.footprint(),
            ground_elevation: self.grd_elev_min_z,
            roof_elevation: self.rooftop_elev_z,
            land_use: self.land_use,
        }
    }
}

pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

pub fn lenient_geometry<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Geometry>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Body of `POST filter-buildings`: one query or several.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
}

impl FilterRequest {
    pub fn single(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            queries: None,
        }
    }

    pub fn batch(queries: Vec<String>) -> Self {
        Self {
            query: None,
            queries: Some(queries),
        }
    }

    /// The queries in declaration order; `queries` wins when both are set.
    pub fn into_queries(self) -> Vec<String> {
        match (self.queries, self.query) {
            (Some(qs), _) => qs,
            (None, Some(q)) => vec![q],
            (None, None) => Vec::new(),
        }
    }
}

/// Both response shapes of the filter service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterResponse {
    /// Legacy shape: a bare array of matched ids.
    Legacy(Vec<BuildingId>),
    Envelope(FilterEnvelope),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterEnvelope {
    #[serde(default)]
    pub all_matches: Vec<BuildingId>,
    #[serde(default)]
    pub filter_results: Vec<WireFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireFilterResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub matches: Vec<BuildingId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Missing fields read as empty so the service can answer with its own
/// validation error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub filter_name: String,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub filter_name: String,
}

/// Uniform persistence envelope: `{success, error?}` plus whatever payload
/// the endpoint returns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistenceEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_sets: Option<Vec<WireFilterSet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_names: Option<Vec<WireFilterName>>,
}

impl PersistenceEnvelope {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFilterSet {
    pub filter_name: String,
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub updated_at: u64,
}

/// A listed name; older services send bare strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireFilterName {
    Entry {
        name: String,
        #[serde(default)]
        updated_at: u64,
    },
    Plain(String),
}

#[cfg(test)]
mod tests {
    use super::{FilterRequest, FilterResponse, RawBuilding, WireFilterName};
    use foundation::{BuildingId, GeoPoint};
    use pretty_assertions::assert_eq;

    #[test]
    fn open_data_record_converts() {
        let json = r#"{
            "struct_id": "1187",
            "grd_elev_min_z": "1043.5",
            "grd_elev_max_z": 1045.0,
            "rooftop_elev_z": "1071.5",
            "polygon": {"type": "Polygon", "coordinates": [[[-114.07, 51.04], [-114.06, 51.04], [-114.06, 51.05], [-114.07, 51.04]]]}
        }"#;
        let raw: RawBuilding = serde_json::from_str(json).expect("parse");
        assert_eq!(raw.height(), Some(28.0));

        let b = raw.into_building(5);
        assert_eq!(b.id, BuildingId::from(1187));
        assert_eq!(b.footprint.len(), 4);
        assert_eq!(b.footprint.points()[0], GeoPoint::new(-114.07, 51.04));
        assert_eq!(b.height(), Some(28.0));
    }

    #[test]
    fn missing_id_falls_back_to_position_and_bad_geometry_is_empty() {
        let json = r#"[
            {"polygon": {"type": "Point", "coordinates": [1.0, 2.0]}, "rooftop_elev_z": "n/a"},
            {"id": 9, "polygon": {"type": "MultiPolygon", "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]]}}
        ]"#;
        let raws: Vec<RawBuilding> = serde_json::from_str(json).expect("parse");
        let buildings: Vec<_> = raws
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_building(i))
            .collect();
        assert_eq!(buildings[0].id, BuildingId::from(0));
        assert!(buildings[0].footprint.is_empty());
        assert_eq!(buildings[0].roof_elevation, None);
        assert_eq!(buildings[1].id, BuildingId::from(9));
        assert_eq!(buildings[1].footprint.len(), 3);
    }

    #[test]
    fn filter_request_shapes() {
        assert_eq!(
            serde_json::to_string(&FilterRequest::single("tall")).expect("json"),
            r#"{"query":"tall"}"#
        );
        let req: FilterRequest = serde_json::from_str(r#"{"queries":["a","b"]}"#).expect("parse");
        assert_eq!(req.into_queries(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn both_response_shapes_parse() {
        let legacy: FilterResponse = serde_json::from_str(r#"[1, "2"]"#).expect("legacy");
        assert!(matches!(legacy, FilterResponse::Legacy(ref ids) if ids.len() == 2));

        let current: FilterResponse = serde_json::from_str(
            r#"{"all_matches":[1],"filter_results":[{"filter_index":0,"matches":[1],"query":"tall"}]}"#,
        )
        .expect("envelope");
        assert!(matches!(current, FilterResponse::Envelope(ref e) if e.filter_results.len() == 1));
    }

    #[test]
    fn listed_names_accept_strings_and_entries() {
        let names: Vec<WireFilterName> =
            serde_json::from_str(r#"["a", {"name": "b", "updated_at": 5}]"#).expect("names");
        assert_eq!(names[0], WireFilterName::Plain("a".to_string()));
        assert_eq!(
            names[1],
            WireFilterName::Entry {
                name: "b".to_string(),
                updated_at: 5
            }
        );
    }
}
