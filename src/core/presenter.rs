use crate::core::route::{RouteOutcome, RouteRenderer};
use crate::domain::model::{AppEvent, ClassifiedFeature, LngLat};
use crate::domain::overlay::{MarkerId, MarkerSpec, Visibility, ROUTE_OVERLAY_ID};
use crate::domain::ports::{EventSink, MapHandle};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Instrument;

/// 一次繪製後留在地圖上的 marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnMarkers {
    pub features: Vec<MarkerId>,
    pub center: MarkerId,
}

#[derive(Debug, Clone)]
struct ClickBinding {
    origin: LngLat,
    feature: ClassifiedFeature,
}

#[derive(Debug, Default)]
struct DrawState {
    markers: Vec<MarkerId>,
    bindings: HashMap<MarkerId, ClickBinding>,
}

/// 管理中心點與 feature marker 的生命週期：每次繪製都整批替換
pub struct MarkerPresenter {
    map: Arc<dyn MapHandle>,
    router: Arc<RouteRenderer>,
    events: Arc<dyn EventSink>,
    icon_path: String,
    state: Mutex<DrawState>,
}

impl MarkerPresenter {
    pub fn new(
        map: Arc<dyn MapHandle>,
        router: Arc<RouteRenderer>,
        events: Arc<dyn EventSink>,
        icon_path: impl Into<String>,
    ) -> Self {
        Self {
            map,
            router,
            events,
            icon_path: icon_path.into(),
            state: Mutex::new(DrawState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DrawState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn present(&self, features: Vec<ClassifiedFeature>, center: LngLat) -> DrawnMarkers {
        let mut state = self.state();
        self.teardown_locked(&mut state);

        let mut drawn = Vec::with_capacity(features.len());
        for feature in features {
            let id = self.map.add_marker(MarkerSpec::feature(
                feature.feature.coordinates(),
                feature.icon.clone(),
            ));
            state.markers.push(id);
            state.bindings.insert(
                id,
                ClickBinding {
                    origin: center,
                    feature,
                },
            );
            drawn.push(id);
        }

        // 中心點最後畫
        let center_id = self
            .map
            .add_marker(MarkerSpec::center(center, format!("{}center.png", self.icon_path)));
        state.markers.push(center_id);

        tracing::info!("🗺️ Presented {} feature markers around {}", drawn.len(), center);

        DrawnMarkers {
            features: drawn,
            center: center_id,
        }
    }

    /// 移除這個 presenter 建立的所有 marker，並隱藏路線
    pub fn teardown(&self) {
        let mut state = self.state();
        self.teardown_locked(&mut state);
    }

    fn teardown_locked(&self, state: &mut DrawState) {
        let removed = state.markers.len();
        for id in state.markers.drain(..) {
            self.map.remove_marker(id);
        }
        state.bindings.clear();

        // 先讓路線請求失效再隱藏，還沒回來的路線才不會把它打開
        self.router.invalidate();
        if self.map.has_overlay(ROUTE_OVERLAY_ID) {
            self.map.set_visibility(ROUTE_OVERLAY_ID, Visibility::None);
        }

        if removed > 0 {
            tracing::debug!("Removed {} markers from previous draw", removed);
        }
    }

    pub fn marker_count(&self) -> usize {
        self.state().markers.len()
    }

    pub fn feature_for(&self, marker: MarkerId) -> Option<ClassifiedFeature> {
        self.state()
            .bindings
            .get(&marker)
            .map(|binding| binding.feature.clone())
    }

    /// 點擊 feature marker：先同步送出事件，再查詢從中心點出發的路線。
    /// 不做 debounce，每次點擊都是獨立的請求。
    /// 不屬於目前繪製的 marker 回傳 `Ok(None)`。
    pub async fn click(&self, marker: MarkerId) -> Result<Option<RouteOutcome>> {
        let binding = self.state().bindings.get(&marker).cloned();
        let Some(binding) = binding else {
            tracing::debug!("Ignoring click on {} (not part of current draw)", marker);
            return Ok(None);
        };

        let feature = &binding.feature.feature;
        let event = AppEvent::marker_click(feature);
        tracing::info!(
            marker = %marker,
            layer = feature.source_layer(),
            distance = feature.distance(),
            icon = %binding.feature.icon,
            "👆 {}",
            event.message
        );
        self.events.emit(event);

        let outcome = self
            .router
            .route_and_render(binding.origin, feature.coordinates())
            .instrument(tracing::info_span!("walking_route", marker = %marker))
            .await?;
        Ok(Some(outcome))
    }
}

impl std::fmt::Debug for MarkerPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerPresenter")
            .field("icon_path", &self.icon_path)
            .field("router", &self.router)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_map::InMemoryMap;
    use crate::domain::model::{DirectionsResponse, DirectionsRoute, RawFeature, RouteGeometry};
    use crate::domain::overlay::MarkerKind;
    use crate::domain::ports::RouteSource;
    use crate::utils::error::LayerError;
    use async_trait::async_trait;
    use serde_json::json;

    const CENTER: LngLat = LngLat(-73.5681, 45.5186);

    struct StraightRoutes;

    #[async_trait]
    impl RouteSource for StraightRoutes {
        async fn walking_routes(&self, origin: LngLat, destination: LngLat) -> Result<DirectionsResponse> {
            Ok(DirectionsResponse {
                routes: vec![DirectionsRoute {
                    geometry: RouteGeometry {
                        coordinates: vec![origin, destination],
                    },
                    distance: None,
                    duration: None,
                }],
            })
        }
    }

    struct NoRoutes;

    #[async_trait]
    impl RouteSource for NoRoutes {
        async fn walking_routes(&self, _: LngLat, _: LngLat) -> Result<DirectionsResponse> {
            Ok(DirectionsResponse { routes: vec![] })
        }
    }

    fn classified(name: &str, class: &str, coordinates: [f64; 2], distance: f64) -> ClassifiedFeature {
        let feature: RawFeature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": coordinates},
            "properties": {
                "name": name,
                "class": class,
                "tilequery": {"layer": "poi_label", "distance": distance}
            }
        }))
        .unwrap();
        ClassifiedFeature {
            feature,
            icon: format!("/icons/{}.png", class),
        }
    }

    fn setup(
        routes: Arc<dyn RouteSource>,
    ) -> (Arc<InMemoryMap>, MarkerPresenter, Arc<Mutex<Vec<AppEvent>>>) {
        let map = Arc::new(InMemoryMap::new(CENTER));
        let router = Arc::new(RouteRenderer::new(routes, map.clone()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = events.clone();
            move |event: AppEvent| events.lock().unwrap().push(event)
        };
        let presenter = MarkerPresenter::new(map.clone(), router, Arc::new(sink), "/icons/");
        (map, presenter, events)
    }

    #[test]
    fn test_empty_present_draws_only_center() {
        let (map, presenter, _) = setup(Arc::new(StraightRoutes));

        let drawn = presenter.present(vec![], CENTER);

        assert!(drawn.features.is_empty());
        assert_eq!(map.marker_count(), 1);
        let center = map.marker(drawn.center).unwrap();
        assert_eq!(center.kind, MarkerKind::Center);
        assert_eq!(center.icon, "/icons/center.png");
        assert!(!center.draggable);
        assert!(!center.clickable);
    }

    #[test]
    fn test_present_draws_features_then_center() {
        let (map, presenter, _) = setup(Arc::new(StraightRoutes));

        let drawn = presenter.present(
            vec![
                classified("Olimpico", "food_and_drink", [-73.569, 45.519], 80.0),
                classified("McGill", "education", [-73.577, 45.504], 950.0),
            ],
            CENTER,
        );

        assert_eq!(drawn.features.len(), 2);
        assert!(drawn.features.iter().all(|id| *id < drawn.center));
        let first = map.marker(drawn.features[0]).unwrap();
        assert_eq!(first.kind, MarkerKind::Feature);
        assert_eq!(first.position, LngLat(-73.569, 45.519));
        assert_eq!(first.icon, "/icons/food_and_drink.png");
        assert!(first.clickable);
        assert_eq!(presenter.marker_count(), 3);
    }

    #[test]
    fn test_second_present_replaces_all_markers() {
        let (map, presenter, _) = setup(Arc::new(StraightRoutes));

        let first = presenter.present(
            vec![classified("Olimpico", "food_and_drink", [-73.569, 45.519], 80.0)],
            CENTER,
        );
        let second = presenter.present(
            vec![classified("McGill", "education", [-73.577, 45.504], 950.0)],
            LngLat(-73.6, 45.5),
        );

        assert_eq!(map.marker_count(), 2);
        assert!(map.marker(first.center).is_none());
        assert!(map.marker(first.features[0]).is_none());
        assert!(map.marker(second.center).is_some());
        assert!(presenter.feature_for(first.features[0]).is_none());
    }

    #[tokio::test]
    async fn test_click_emits_event_and_draws_route() {
        let (map, presenter, events) = setup(Arc::new(StraightRoutes));
        let drawn = presenter.present(
            vec![classified("Olimpico", "food_and_drink", [-73.569, 45.519], 80.7)],
            CENTER,
        );

        let outcome = presenter.click(drawn.features[0]).await.unwrap();

        assert_eq!(outcome, Some(RouteOutcome::Rendered { points: 2 }));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "clicked on Olimpico (distance: 80m)");
        assert_eq!(events[0].data["class"], json!("food_and_drink"));

        let line = map.line(ROUTE_OVERLAY_ID).unwrap();
        assert_eq!(line.geometry.coordinates, vec![CENTER, LngLat(-73.569, 45.519)]);
        assert_eq!(line.visibility, Visibility::Visible);
    }

    #[tokio::test]
    async fn test_present_hides_existing_route() {
        let (map, presenter, _) = setup(Arc::new(StraightRoutes));
        let drawn = presenter.present(
            vec![classified("Olimpico", "food_and_drink", [-73.569, 45.519], 80.0)],
            CENTER,
        );
        presenter.click(drawn.features[0]).await.unwrap();

        presenter.present(vec![], CENTER);

        assert_eq!(
            map.line(ROUTE_OVERLAY_ID).unwrap().visibility,
            Visibility::None
        );
    }

    #[tokio::test]
    async fn test_click_on_center_or_stale_marker_is_ignored() {
        let (_, presenter, events) = setup(Arc::new(StraightRoutes));
        let first = presenter.present(
            vec![classified("Olimpico", "food_and_drink", [-73.569, 45.519], 80.0)],
            CENTER,
        );
        presenter.present(vec![], CENTER);

        assert_eq!(presenter.click(first.features[0]).await.unwrap(), None);
        assert_eq!(presenter.click(first.center).await.unwrap(), None);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_click_without_route_still_emits_event() {
        let (map, presenter, events) = setup(Arc::new(NoRoutes));
        let drawn = presenter.present(
            vec![classified("Île", "park_like", [-73.53, 45.51], 2400.2)],
            CENTER,
        );

        let err = presenter.click(drawn.features[0]).await.unwrap_err();

        assert!(matches!(err, LayerError::NoRouteFound { .. }));
        assert_eq!(events.lock().unwrap().len(), 1);
        assert!(!map.has_overlay(ROUTE_OVERLAY_ID));
    }
}
