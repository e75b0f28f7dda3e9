use crate::utils::error::{LayerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Tile query 服務允許的最大回傳筆數
pub const MAX_RESULTS_CEILING: usize = 50;

/// `[longitude, latitude]`，序列化成 GeoJSON 的座標陣列
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    pub fn lng(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// 公尺
    pub radius: f64,
    pub max_results: usize,
    pub layer_names: Vec<String>,
}

impl QueryParameters {
    /// 缺少的經緯度以地圖目前的中心補上
    pub fn with_default_center(mut self, viewport_center: LngLat) -> Self {
        if self.longitude.is_none() {
            self.longitude = Some(viewport_center.lng());
        }
        if self.latitude.is_none() {
            self.latitude = Some(viewport_center.lat());
        }
        self
    }

    pub fn center(&self) -> Result<LngLat> {
        let longitude = self.longitude.ok_or_else(|| LayerError::MissingConfigError {
            field: "query.longitude".to_string(),
        })?;
        let latitude = self.latitude.ok_or_else(|| LayerError::MissingConfigError {
            field: "query.latitude".to_string(),
        })?;
        Ok(LngLat(longitude, latitude))
    }

    pub fn effective_limit(&self) -> usize {
        self.max_results.min(MAX_RESULTS_CEILING)
    }

    /// 去除重複但保留原順序的圖層清單，以逗號串接
    pub fn layers_csv(&self) -> String {
        let mut seen: Vec<&str> = Vec::with_capacity(self.layer_names.len());
        for name in &self.layer_names {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
            }
        }
        seen.join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    pub features: Vec<RawFeature>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: LngLat,
}

fn point_type() -> String {
    "Point".to_string()
}

/// `properties.tilequery`：來源圖層與距離查詢中心的距離
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileQueryInfo {
    pub layer: String,
    pub distance: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub tilequery: TileQueryInfo,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

impl RawFeature {
    pub fn coordinates(&self) -> LngLat {
        self.geometry.coordinates
    }

    pub fn source_layer(&self) -> &str {
        &self.properties.tilequery.layer
    }

    pub fn distance(&self) -> f64 {
        self.properties.tilequery.distance
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.fields.get(key)
    }

    /// 只有字串屬性能對應到圖示表的 key
    pub fn selection_value(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.selection_value("name")
    }

    pub fn properties_json(&self) -> Value {
        serde_json::to_value(&self.properties).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerFilterRule {
    pub source_layer: String,
    pub selection_key: Option<String>,
    pub icons_by_selection_value: Option<BTreeMap<String, String>>,
}

impl LayerFilterRule {
    pub fn for_layer(source_layer: impl Into<String>) -> Self {
        Self {
            source_layer: source_layer.into(),
            ..Self::default()
        }
    }

    pub fn with_selection(
        mut self,
        selection_key: impl Into<String>,
        icons: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.selection_key = Some(selection_key.into());
        self.icons_by_selection_value = Some(icons.into_iter().collect());
        self
    }

    /// 空的圖示表視同沒有設定
    pub fn icon_mapping(&self) -> Option<&BTreeMap<String, String>> {
        self.icons_by_selection_value
            .as_ref()
            .filter(|icons| !icons.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedFeature {
    pub feature: RawFeature,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteGeometry {
    pub coordinates: Vec<LngLat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub geometry: RouteGeometry,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

/// 點擊 marker 時送給 UI（例如 log panel）的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub message: String,
    pub data: Value,
    pub at: DateTime<Utc>,
}

impl AppEvent {
    pub fn marker_click(feature: &RawFeature) -> Self {
        let name = feature.name().unwrap_or("unnamed");
        Self {
            kind: "user".to_string(),
            value: "click".to_string(),
            message: format!(
                "clicked on {} (distance: {}m)",
                name,
                feature.distance().floor() as i64
            ),
            data: feature.properties_json(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_feature() -> RawFeature {
        serde_json::from_value(json!({
            "type": "Feature",
            "id": 42,
            "geometry": {"type": "Point", "coordinates": [-73.5690, 45.5190]},
            "properties": {
                "name": "Café Olimpico",
                "class": "food_and_drink",
                "sizerank": 16,
                "tilequery": {"distance": 57.93, "geometry": "point", "layer": "poi_label"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_feature_accessors() {
        let feature = sample_feature();
        assert_eq!(feature.coordinates(), LngLat(-73.5690, 45.5190));
        assert_eq!(feature.source_layer(), "poi_label");
        assert_eq!(feature.selection_value("class"), Some("food_and_drink"));
        // 數字屬性不能當作 selection value
        assert_eq!(feature.selection_value("sizerank"), None);
        assert_eq!(feature.selection_value("missing"), None);
        assert_eq!(
            feature.properties.tilequery.extra.get("geometry"),
            Some(&json!("point"))
        );
    }

    #[test]
    fn test_properties_json_keeps_tilequery() {
        let data = sample_feature().properties_json();
        assert_eq!(data["name"], json!("Café Olimpico"));
        assert_eq!(data["tilequery"]["layer"], json!("poi_label"));
    }

    #[test]
    fn test_query_defaults_to_viewport_center() {
        let query = QueryParameters {
            longitude: None,
            latitude: Some(45.5),
            radius: 500.0,
            max_results: 10,
            layer_names: vec![],
        }
        .with_default_center(LngLat(-73.0, 40.0));

        assert_eq!(query.center().unwrap(), LngLat(-73.0, 45.5));
    }

    #[test]
    fn test_query_limit_and_layers() {
        let query = QueryParameters {
            longitude: Some(0.0),
            latitude: Some(0.0),
            radius: 1000.0,
            max_results: 200,
            layer_names: vec![
                "poi_label".to_string(),
                "transit_stop_label".to_string(),
                "poi_label".to_string(),
            ],
        };
        assert_eq!(query.effective_limit(), 50);
        assert_eq!(query.layers_csv(), "poi_label,transit_stop_label");
    }

    #[test]
    fn test_empty_icon_mapping_is_no_mapping() {
        let rule = LayerFilterRule::for_layer("poi_label").with_selection("class", vec![]);
        assert!(rule.icon_mapping().is_none());
    }

    #[test]
    fn test_marker_click_event_message() {
        let event = AppEvent::marker_click(&sample_feature());
        assert_eq!(event.kind, "user");
        assert_eq!(event.value, "click");
        assert_eq!(event.message, "clicked on Café Olimpico (distance: 57m)");
        assert_eq!(event.data["class"], json!("food_and_drink"));
    }

    #[test]
    fn test_directions_without_routes() {
        let response: DirectionsResponse =
            serde_json::from_value(json!({"code": "NoRoute", "routes": []})).unwrap();
        assert!(response.routes.is_empty());
    }
}
