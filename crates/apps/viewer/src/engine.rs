use buildings::mesh::MeshBuilder;
use buildings::picker::{self, Selection};
use buildings::sync::{GridConfig, RebuildStats, SceneSync};
use buildings::{Building, BuildingStore, FilterResult, apply_filters};
use catalog::FilterSpec;
use foundation::GeoPoint;
use foundation::math::{Vec2, Vec3};
use gpu::{RenderFrame, Renderer};
use remote::{BuildingSource, Evaluation, FilterEvaluator, QueryFailure, RemoteError};
use runtime::{Event, EventBus, Frame, SupersedeGate, Ticket};
use scene::camera::{Camera, Viewport};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Presentation zoom applied to projected meters and heights.
    pub scale: f64,
    /// Fixed reference point. `None` centres the scene on the first loaded
    /// footprint that has vertices.
    pub reference: Option<GeoPoint>,
    pub grid: GridConfig,
    pub fallback_height: f64,
    /// Overview camera distance from the origin, before scaling.
    pub camera_distance: f64,
    pub viewport: Viewport,
    pub frame_dt_s: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            reference: None,
            grid: GridConfig::default(),
            fallback_height: buildings::mesh::FALLBACK_HEIGHT_M,
            camera_distance: 800.0,
            viewport: Viewport::new(1280.0, 720.0),
            frame_dt_s: 1.0 / 60.0,
        }
    }
}

/// Pointer notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    BuildingSelected { building: Building, local: Vec2 },
    BuildingDeselected,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { highlighted: usize },
    /// A newer submission started after this one; its results were dropped.
    Superseded,
}

/// One viewer session: building store, drawable scene, highlight state and
/// pointer events.
///
/// Every store mutation is followed by a full scene rebuild before control
/// returns, so the render side never sees a half-updated store.
pub struct Engine {
    config: EngineConfig,
    store: BuildingStore,
    scene: SceneSync,
    reference: Option<GeoPoint>,
    camera: Camera,
    frame: Frame,
    events: EventBus<ViewerEvent>,
    gate: SupersedeGate,
    active_filters: Vec<FilterSpec>,
    last_failures: Vec<QueryFailure>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let scene = SceneSync::new(MeshBuilder::new(config.fallback_height), config.grid);
        let camera = Camera::overview(Vec3::ZERO, config.camera_distance * config.scale);
        let frame = Frame::new(0, config.frame_dt_s);
        Self {
            reference: config.reference,
            config,
            store: BuildingStore::new(),
            scene,
            camera,
            frame,
            events: EventBus::new(),
            gate: SupersedeGate::new(),
            active_filters: Vec::new(),
            last_failures: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &BuildingStore {
        &self.store
    }

    pub fn scene(&self) -> &SceneSync {
        &self.scene
    }

    pub fn reference(&self) -> Option<GeoPoint> {
        self.reference
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.config.viewport = viewport;
    }

    /// Filters behind the current highlight state.
    pub fn active_filters(&self) -> &[FilterSpec] {
        &self.active_filters
    }

    /// Per-query failures reported by the last applied evaluation.
    pub fn last_failures(&self) -> &[QueryFailure] {
        &self.last_failures
    }

    /// Shared handle for checking tickets off the engine's task.
    pub fn gate(&self) -> SupersedeGate {
        self.gate.clone()
    }

    /// Replaces the building set and rebuilds the scene. Highlight state
    /// starts neutral; outstanding filter submissions are superseded.
    pub fn load_buildings(&mut self, buildings: Vec<Building>) -> RebuildStats {
        self.gate.invalidate();
        self.store.replace_all(buildings);
        self.active_filters.clear();
        self.last_failures.clear();
        if self.config.reference.is_none() {
            self.reference = self
                .store
                .iter()
                .find_map(|b| b.building().footprint.vertex_average());
        }
        info!(count = self.store.len(), reference = ?self.reference, "buildings loaded");
        self.rebuild()
    }

    /// Fetches and loads a fresh building set. On failure the current set
    /// stays as it is.
    pub async fn reload(
        &mut self,
        source: &dyn BuildingSource,
        with_land_use: bool,
    ) -> Result<RebuildStats, RemoteError> {
        match source.fetch_buildings(with_land_use).await {
            Ok(buildings) => Ok(self.load_buildings(buildings)),
            Err(err) => {
                warn!(%err, kept = self.store.len(), "building fetch failed");
                Err(err)
            }
        }
    }

    /// Starts a filter submission. Only the newest ticket's results apply.
    pub fn begin_filters(&self) -> Ticket {
        self.gate.begin()
    }

    /// Applies an evaluation for `queries` if `ticket` is still the newest
    /// submission.
    pub fn apply_evaluation(
        &mut self,
        ticket: Ticket,
        queries: &[String],
        evaluation: &Evaluation,
    ) -> ApplyOutcome {
        if !self.gate.is_current(ticket) {
            debug!(ticket = ticket.get(), "discarding superseded filter results");
            return ApplyOutcome::Superseded;
        }
        for failure in &evaluation.failures {
            warn!(%failure, "filter evaluation failed");
        }
        self.last_failures = evaluation.failures.clone();
        self.active_filters = queries.iter().map(FilterSpec::new).collect();
        let highlighted = self.highlight(&evaluation.results);
        ApplyOutcome::Applied { highlighted }
    }

    /// Evaluates `queries` and applies the result. An empty list clears.
    pub async fn apply_queries(
        &mut self,
        evaluator: &dyn FilterEvaluator,
        queries: Vec<String>,
    ) -> Result<ApplyOutcome, RemoteError> {
        if queries.is_empty() {
            self.clear_filters();
            return Ok(ApplyOutcome::Applied { highlighted: 0 });
        }
        let ticket = self.begin_filters();
        let evaluation = evaluator.evaluate(queries.clone()).await?;
        Ok(self.apply_evaluation(ticket, &queries, &evaluation))
    }

    /// Drops every highlight, superseding any submission still in flight.
    pub fn clear_filters(&mut self) {
        self.gate.invalidate();
        self.active_filters.clear();
        self.last_failures.clear();
        self.highlight(&[]);
    }

    fn highlight(&mut self, results: &[FilterResult]) -> usize {
        let highlighted = apply_filters(&mut self.store, results);
        self.rebuild();
        highlighted
    }

    fn rebuild(&mut self) -> RebuildStats {
        match self.reference {
            Some(reference) => self.scene.rebuild(&mut self.store, reference, self.config.scale),
            None => {
                // Nothing loaded yet: grid only.
                self.scene
                    .rebuild(&mut self.store, GeoPoint::new(0.0, 0.0), self.config.scale)
            }
        }
    }

    /// Resolves a pointer position and emits the matching selection event.
    pub fn pointer(&mut self, x_px: f64, y_px: f64) -> Option<Selection> {
        let selection = picker::pick(
            self.scene.world(),
            &self.store,
            &self.camera,
            self.config.viewport,
            x_px,
            y_px,
        );
        let event = match &selection {
            Some(s) => ViewerEvent::BuildingSelected {
                building: s.building.clone(),
                local: s.local_center,
            },
            None => ViewerEvent::BuildingDeselected,
        };
        self.events.emit(self.frame, event);
        selection
    }

    /// Render-loop step: snapshot of the current drawables. Never mutates
    /// the store.
    pub fn frame(&mut self) -> RenderFrame {
        let frame = Renderer::collect(
            self.scene.world(),
            self.camera,
            self.config.viewport,
            self.frame,
        );
        self.frame = self.frame.next();
        frame
    }

    pub fn drain_events(&mut self) -> Vec<Event<ViewerEvent>> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplyOutcome, Engine, EngineConfig, ViewerEvent};
    use buildings::{Building, FilterResult};
    use foundation::{BuildingId, GeoPoint, Polygon};
    use pretty_assertions::assert_eq;
    use remote::{BoxFuture, BuildingSource, Evaluation, FilterEvaluator, RemoteError};
    use scene::camera::Viewport;

    const REF: GeoPoint = GeoPoint::new(-114.0719, 51.0447);

    fn square(dlon: f64, d: f64) -> Polygon {
        let (lon, lat) = (REF.longitude + dlon, REF.latitude);
        Polygon::new(vec![
            GeoPoint::new(lon - d, lat - d),
            GeoPoint::new(lon + d, lat - d),
            GeoPoint::new(lon + d, lat + d),
            GeoPoint::new(lon - d, lat + d),
        ])
    }

    fn two_buildings() -> Vec<Building> {
        vec![
            Building::new(1, square(0.0, 0.0003)).with_elevations(1040.0, 1100.0),
            Building::new(2, square(0.003, 0.0003)).with_elevations(1040.0, 1050.0),
        ]
    }

    fn engine() -> Engine {
        let mut engine = Engine::new(EngineConfig {
            reference: Some(REF),
            ..EngineConfig::default()
        });
        engine.load_buildings(two_buildings());
        engine
    }

    fn highlighted(engine: &Engine, id: i64) -> (bool, Option<usize>) {
        let b = engine.store().get(&BuildingId::from(id)).expect("building");
        (b.presentation.highlighted, b.presentation.owning_filter)
    }

    struct Canned(Evaluation);

    impl FilterEvaluator for Canned {
        fn evaluate(&self, _queries: Vec<String>) -> BoxFuture<'_, Result<Evaluation, RemoteError>> {
            let eval = self.0.clone();
            Box::pin(async move { Ok(eval) })
        }
    }

    struct Offline;

    impl BuildingSource for Offline {
        fn fetch_buildings(
            &self,
            _with_land_use: bool,
        ) -> BoxFuture<'_, Result<Vec<Building>, RemoteError>> {
            Box::pin(async { Err(RemoteError::Unavailable("connection refused".to_string())) })
        }
    }

    #[tokio::test]
    async fn tall_filter_highlights_one_building() {
        let mut engine = engine();
        let evaluator = Canned(Evaluation {
            results: vec![FilterResult::new(0, "tall", vec![BuildingId::from(1)])],
            failures: Vec::new(),
        });
        let outcome = engine
            .apply_queries(&evaluator, vec!["tall".to_string()])
            .await
            .expect("apply");

        assert_eq!(outcome, ApplyOutcome::Applied { highlighted: 1 });
        assert_eq!(highlighted(&engine, 1), (true, Some(0)));
        assert_eq!(highlighted(&engine, 2), (false, None));
        assert_eq!(engine.active_filters().len(), 1);
    }

    #[test]
    fn older_submission_is_superseded() {
        let mut engine = engine();
        let first = engine.begin_filters();
        let second = engine.begin_filters();

        let newer = Evaluation {
            results: vec![FilterResult::new(0, "b", vec![BuildingId::from(2)])],
            failures: Vec::new(),
        };
        let older = Evaluation {
            results: vec![FilterResult::new(0, "a", vec![BuildingId::from(1)])],
            failures: Vec::new(),
        };

        let applied = engine.apply_evaluation(second, &["b".to_string()], &newer);
        assert_eq!(applied, ApplyOutcome::Applied { highlighted: 1 });
        let late = engine.apply_evaluation(first, &["a".to_string()], &older);
        assert_eq!(late, ApplyOutcome::Superseded);

        assert_eq!(highlighted(&engine, 1), (false, None));
        assert_eq!(highlighted(&engine, 2), (true, Some(0)));
    }

    #[test]
    fn clearing_supersedes_in_flight_results() {
        let mut engine = engine();
        let ticket = engine.begin_filters();
        engine.clear_filters();
        let eval = Evaluation {
            results: vec![FilterResult::new(0, "a", vec![BuildingId::from(1)])],
            failures: Vec::new(),
        };
        assert_eq!(
            engine.apply_evaluation(ticket, &["a".to_string()], &eval),
            ApplyOutcome::Superseded
        );
        assert_eq!(engine.store().highlighted_count(), 0);
    }

    #[test]
    fn scene_holds_grid_plus_valid_buildings() {
        let mut engine = engine();
        let mut buildings = two_buildings();
        buildings.push(Building::new(3, Polygon::new(vec![REF, REF])));
        let stats = engine.load_buildings(buildings);

        assert_eq!(stats.drawn, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(engine.scene().world().len(), 3);
        assert_eq!(engine.frame().mesh_count(), 2);
    }

    #[test]
    fn reference_defaults_to_first_footprint() {
        let mut engine = Engine::new(EngineConfig::default());
        assert_eq!(engine.reference(), None);
        engine.load_buildings(two_buildings());
        let reference = engine.reference().expect("reference");
        assert!((reference.longitude - REF.longitude).abs() < 1e-9);
        assert!((reference.latitude - REF.latitude).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_reload_keeps_buildings() {
        let mut engine = engine();
        let err = engine.reload(&Offline, false).await.expect_err("offline");
        assert!(matches!(err, RemoteError::Unavailable(_)));
        assert_eq!(engine.store().len(), 2);
        assert_eq!(engine.scene().building_count(), 2);
    }

    #[test]
    fn pointer_emits_selection_events() {
        let mut engine = engine();
        engine.set_viewport(Viewport::new(800.0, 600.0));

        let selection = engine.pointer(400.0, 300.0).expect("centre hits building 1");
        assert_eq!(selection.building.id, BuildingId::from(1));
        assert!(engine.pointer(0.0, 0.0).is_none());

        let events = engine.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0].payload,
            ViewerEvent::BuildingSelected { building, .. } if building.id == BuildingId::from(1)
        ));
        assert_eq!(events[1].payload, ViewerEvent::BuildingDeselected);
        assert!(engine.drain_events().is_empty());
    }
}
