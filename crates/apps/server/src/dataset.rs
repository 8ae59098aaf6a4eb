//! Upstream open-data access with an in-process cache.

use std::sync::Arc;

use buildings::LandUseRecord;
use foundation::{GeoPoint, Polygon};
use remote::wire::{lenient_geometry, Geometry, RawBuilding};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Land-use district as published upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLandUse {
    #[serde(flatten)]
    pub record: LandUseRecord,
    #[serde(default, alias = "the_geom", deserialize_with = "lenient_geometry")]
    pub multipolygon: Option<Geometry>,
}

#[derive(Debug, Clone)]
pub struct LandUseArea {
    pub record: LandUseRecord,
    pub rings: Vec<Polygon>,
}

impl LandUseArea {
    pub fn new(record: LandUseRecord, rings: Vec<Polygon>) -> Self {
        Self { record, rings }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.rings.iter().any(|ring| ring.contains(point))
    }
}

impl From<RawLandUse> for LandUseArea {
    fn from(raw: RawLandUse) -> Self {
        let rings = raw
            .multipolygon
            .as_ref()
            .map(Geometry::outer_rings)
            .unwrap_or_default();
        Self::new(raw.record, rings)
    }
}

/// First district containing `point`.
pub fn land_use_at(areas: &[LandUseArea], point: GeoPoint) -> Option<&LandUseRecord> {
    areas.iter().find(|a| a.contains(point)).map(|a| &a.record)
}

struct Upstream {
    http: reqwest::Client,
    buildings_url: String,
    limit: u32,
    land_use_url: String,
    land_use_limit: u32,
}

/// Building and land-use data, fetched from upstream once and then reused.
pub struct Dataset {
    upstream: Option<Upstream>,
    buildings: RwLock<Option<Arc<Vec<RawBuilding>>>>,
    land_use: RwLock<Option<Arc<Vec<LandUseArea>>>>,
}

impl Dataset {
    pub fn from_config(http: reqwest::Client, config: &ServerConfig) -> Self {
        Self {
            upstream: Some(Upstream {
                http,
                buildings_url: config.upstream_url.clone(),
                limit: config.limit,
                land_use_url: config.land_use_url.clone(),
                land_use_limit: config.land_use_limit,
            }),
            buildings: RwLock::new(None),
            land_use: RwLock::new(None),
        }
    }

    /// Fixed data, no upstream.
    pub fn fixed(buildings: Vec<RawBuilding>, land_use: Vec<LandUseArea>) -> Self {
        Self {
            upstream: None,
            buildings: RwLock::new(Some(Arc::new(buildings))),
            land_use: RwLock::new(Some(Arc::new(land_use))),
        }
    }

    pub async fn buildings(&self) -> Result<Arc<Vec<RawBuilding>>, String> {
        if let Some(cached) = self.buildings.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let mut slot = self.buildings.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }
        let upstream = self.upstream.as_ref().ok_or("no building source configured")?;
        let fetched: Vec<RawBuilding> =
            fetch_json(&upstream.http, &upstream.buildings_url, upstream.limit).await?;
        info!(count = fetched.len(), "building dataset fetched");
        let fetched = Arc::new(fetched);
        *slot = Some(fetched.clone());
        Ok(fetched)
    }

    pub async fn land_use(&self) -> Result<Arc<Vec<LandUseArea>>, String> {
        if let Some(cached) = self.land_use.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let mut slot = self.land_use.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }
        let upstream = self.upstream.as_ref().ok_or("no land-use source configured")?;
        let raw: Vec<RawLandUse> =
            fetch_json(&upstream.http, &upstream.land_use_url, upstream.land_use_limit).await?;
        let areas: Vec<LandUseArea> = raw.into_iter().map(LandUseArea::from).collect();
        info!(count = areas.len(), "land-use districts fetched");
        let areas = Arc::new(areas);
        *slot = Some(areas.clone());
        Ok(areas)
    }

    /// Buildings with `land_use` set to the district containing each
    /// footprint's vertex average.
    pub async fn buildings_with_land_use(&self) -> Result<Vec<RawBuilding>, String> {
        let buildings = self.buildings().await?;
        let areas = match self.land_use().await {
            Ok(areas) => areas,
            Err(e) => {
                warn!("land use unavailable, serving buildings without it: {e}");
                Arc::new(Vec::new())
            }
        };
        Ok(buildings
            .iter()
            .cloned()
            .map(|mut b| {
                b.land_use = b
                    .footprint()
                    .vertex_average()
                    .and_then(|c| land_use_at(&areas, c))
                    .cloned();
                b
            })
            .collect())
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    limit: u32,
) -> Result<T, String> {
    let resp = http
        .get(url)
        .query(&[("$limit", limit.to_string())])
        .send()
        .await
        .map_err(|e| format!("upstream fetch failed: {e}"))?;
    if !resp.status().is_success() {
        return Err(format!("upstream HTTP {}", resp.status()));
    }
    resp.json::<T>()
        .await
        .map_err(|e| format!("upstream response unreadable: {e}"))
}

#[cfg(test)]
mod tests {
    use super::{land_use_at, Dataset, LandUseArea, RawLandUse};
    use buildings::LandUseRecord;
    use foundation::{GeoPoint, Polygon};
    use remote::wire::{Geometry, RawBuilding};

    fn square(lon: f64, lat: f64, d: f64) -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(lon - d, lat - d),
            GeoPoint::new(lon + d, lat - d),
            GeoPoint::new(lon + d, lat + d),
            GeoPoint::new(lon - d, lat + d),
        ]
    }

    fn district(code: &str, lon: f64, lat: f64) -> LandUseArea {
        LandUseArea::new(
            LandUseRecord {
                code: Some(code.to_string()),
                ..LandUseRecord::default()
            },
            vec![Polygon::new(square(lon, lat, 0.01))],
        )
    }

    #[test]
    fn raw_land_use_parses_open_data_record() {
        let json = r#"{"lu_code":"CC-X","major":"Commercial",
            "multipolygon":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,1]]]]}}"#;
        let area: LandUseArea = serde_json::from_str::<RawLandUse>(json).expect("parse").into();
        assert_eq!(area.record.code.as_deref(), Some("CC-X"));
        assert!(area.contains(GeoPoint::new(0.5, 0.5)));
        assert!(!area.contains(GeoPoint::new(1.5, 0.5)));
    }

    #[test]
    fn lookup_picks_containing_district() {
        let areas = vec![district("A", 0.0, 0.0), district("B", 1.0, 1.0)];
        let hit = land_use_at(&areas, GeoPoint::new(1.001, 0.999)).expect("district");
        assert_eq!(hit.code.as_deref(), Some("B"));
        assert!(land_use_at(&areas, GeoPoint::new(5.0, 5.0)).is_none());
    }

    #[tokio::test]
    async fn buildings_get_land_use_from_footprint_center() {
        let inside = RawBuilding {
            id: Some(1.into()),
            polygon: Some(Geometry::Polygon {
                coordinates: vec![square(0.0, 0.0, 0.001)],
            }),
            ..RawBuilding::default()
        };
        let outside = RawBuilding {
            id: Some(2.into()),
            polygon: Some(Geometry::Polygon {
                coordinates: vec![square(3.0, 3.0, 0.001)],
            }),
            ..RawBuilding::default()
        };
        let dataset = Dataset::fixed(vec![inside, outside], vec![district("A", 0.0, 0.0)]);
        let out = dataset.buildings_with_land_use().await.expect("buildings");
        assert_eq!(
            out[0].land_use.as_ref().and_then(|l| l.code.as_deref()),
            Some("A")
        );
        assert!(out[1].land_use.is_none());
    }
}
