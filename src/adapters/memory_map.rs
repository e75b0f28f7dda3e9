use crate::domain::model::{LngLat, RouteGeometry};
use crate::domain::overlay::{LineStyle, MarkerId, MarkerSpec, Visibility};
use crate::domain::ports::MapHandle;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOverlay {
    pub geometry: RouteGeometry,
    pub style: LineStyle,
    pub visibility: Visibility,
    /// 每次 `set_line_geometry` 加一，用來確認是原地更新而非重新加入
    pub revision: u32,
}

#[derive(Debug, Default)]
struct MapState {
    center: Option<LngLat>,
    next_marker: u64,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    lines: BTreeMap<String, LineOverlay>,
}

/// 不需要畫面的地圖：記錄 marker 與線圖層的狀態，CLI 與測試都用它
#[derive(Debug, Default)]
pub struct InMemoryMap {
    state: Mutex<MapState>,
}

impl InMemoryMap {
    pub fn new(center: LngLat) -> Self {
        Self {
            state: Mutex::new(MapState {
                center: Some(center),
                ..MapState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn marker(&self, id: MarkerId) -> Option<MarkerSpec> {
        self.state().markers.get(&id).cloned()
    }

    pub fn marker_count(&self) -> usize {
        self.state().markers.len()
    }

    pub fn line(&self, id: &str) -> Option<LineOverlay> {
        self.state().lines.get(id).cloned()
    }

    /// 目前可見的 marker 與線圖層，輸出成 GeoJSON FeatureCollection
    pub fn to_geojson(&self) -> Value {
        let state = self.state();
        let mut features: Vec<Value> = state
            .markers
            .iter()
            .map(|(id, spec)| {
                json!({
                    "type": "Feature",
                    "id": id.0,
                    "geometry": {"type": "Point", "coordinates": spec.position},
                    "properties": {
                        "class": spec.kind.class_name(),
                        "icon": spec.icon,
                        "clickable": spec.clickable,
                    }
                })
            })
            .collect();

        features.extend(
            state
                .lines
                .iter()
                .filter(|(_, line)| line.visibility == Visibility::Visible)
                .map(|(id, line)| {
                    json!({
                        "type": "Feature",
                        "id": id,
                        "geometry": {"type": "LineString", "coordinates": line.geometry.coordinates},
                        "properties": {
                            "line-color": line.style.color,
                            "line-width": line.style.width,
                            "line-opacity": line.style.opacity,
                        }
                    })
                }),
        );

        json!({"type": "FeatureCollection", "features": features})
    }
}

impl MapHandle for InMemoryMap {
    fn center(&self) -> LngLat {
        self.state().center.unwrap_or(LngLat(0.0, 0.0))
    }

    fn add_marker(&self, spec: MarkerSpec) -> MarkerId {
        let mut state = self.state();
        state.next_marker += 1;
        let id = MarkerId(state.next_marker);
        state.markers.insert(id, spec);
        id
    }

    fn remove_marker(&self, id: MarkerId) {
        self.state().markers.remove(&id);
    }

    fn has_overlay(&self, id: &str) -> bool {
        self.state().lines.contains_key(id)
    }

    fn add_line_overlay(&self, id: &str, geometry: &RouteGeometry, style: &LineStyle) {
        self.state().lines.insert(
            id.to_string(),
            LineOverlay {
                geometry: geometry.clone(),
                style: style.clone(),
                visibility: Visibility::Visible,
                revision: 0,
            },
        );
    }

    fn set_line_geometry(&self, id: &str, geometry: &RouteGeometry) {
        match self.state().lines.get_mut(id) {
            Some(line) => {
                line.geometry = geometry.clone();
                line.revision += 1;
            }
            None => tracing::warn!("set_line_geometry on unknown overlay '{}'", id),
        }
    }

    fn set_visibility(&self, id: &str, visibility: Visibility) {
        if let Some(line) = self.state().lines.get_mut(id) {
            line.visibility = visibility;
        }
    }
}
