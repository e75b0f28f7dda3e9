use crate::adapters::mapbox::{DEFAULT_HOST, DEFAULT_TILESET};
use crate::domain::model::{LayerFilterRule, LngLat, QueryParameters};
use crate::utils::error::{LayerError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub layers: Vec<LayerRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_tileset")]
    pub tileset: String,
    pub access_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            tileset: default_tileset(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapConfig {
    /// 地圖初始中心 `[longitude, latitude]`
    pub center: Option<LngLat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default, deserialize_with = "optional_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "optional_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            longitude: None,
            latitude: None,
            radius: default_radius(),
            max_items: default_max_items(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_icon_path")]
    pub icon_path: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            icon_path: default_icon_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRuleConfig {
    pub layer: String,
    pub selection_key: Option<String>,
    #[serde(default)]
    pub icons: BTreeMap<String, String>,
    /// 舊格式：`selection = [{ group = "station", icon = "metro.png" }]`
    #[serde(default)]
    pub selection: Vec<SelectionGroup>,
}

/// `selection` 列出的 group 會和 `icons` 合併成同一張圖示表，所以只畫出列出的 group，
/// 其餘 feature 不會退回依來源圖層全部顯示。要顯示整個圖層時 `icons` 與 `selection` 都不要設定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionGroup {
    pub group: String,
    pub icon: String,
}

impl LayerRuleConfig {
    pub fn to_rule(&self) -> LayerFilterRule {
        let mut icons = self.icons.clone();
        for entry in &self.selection {
            icons
                .entry(entry.group.clone())
                .or_insert_with(|| entry.icon.clone());
        }

        LayerFilterRule {
            source_layer: self.layer.clone(),
            selection_key: self.selection_key.clone(),
            icons_by_selection_value: (!icons.is_empty()).then_some(icons),
        }
    }

    fn has_icons(&self) -> bool {
        !self.icons.is_empty() || !self.selection.is_empty()
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_tileset() -> String {
    DEFAULT_TILESET.to_string()
}

fn default_radius() -> f64 {
    1000.0
}

fn default_max_items() -> usize {
    50
}

fn default_icon_path() -> String {
    "/assets/icons/".to_string()
}

/// 經緯度可以是數字、數字字串、空字串或不填；空字串與不填都代表使用地圖中心
fn optional_coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCoordinate {
        Number(f64),
        Text(String),
    }

    match Option::<RawCoordinate>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCoordinate::Number(value)) => Ok(Some(value)),
        Some(RawCoordinate::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawCoordinate::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid coordinate '{}': {}", text, e))),
    }
}

impl LayerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LayerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LayerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MAPBOX_API})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| LayerError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("service.host", &self.service.host)?;
        validation::validate_non_empty_string("service.tileset", &self.service.tileset)?;
        self.access_token()?;

        if let Some(center) = self.map.center {
            validation::validate_coordinate("map.center", center.lng(), center.lat())?;
        }
        if let Some(longitude) = self.query.longitude {
            validation::validate_range("query.longitude", longitude, -180.0, 180.0)?;
        }
        if let Some(latitude) = self.query.latitude {
            validation::validate_range("query.latitude", latitude, -90.0, 90.0)?;
        }
        if self.query.radius.is_nan() || self.query.radius < 0.0 {
            return Err(LayerError::InvalidConfigValueError {
                field: "query.radius".to_string(),
                value: self.query.radius.to_string(),
                reason: "Radius must be a non-negative number of meters".to_string(),
            });
        }
        validation::validate_positive_number("query.max_items", self.query.max_items, 1)?;

        if self.layers.is_empty() {
            return Err(LayerError::MissingConfigError {
                field: "layers".to_string(),
            });
        }
        for (i, layer) in self.layers.iter().enumerate() {
            validation::validate_non_empty_string(&format!("layers[{}].layer", i), &layer.layer)?;
            if layer.has_icons() && layer.selection_key.is_none() {
                return Err(LayerError::ConfigError {
                    message: format!(
                        "layers[{}] ({}) defines icons but no selection_key",
                        i, layer.layer
                    ),
                });
            }
        }

        Ok(())
    }

    /// 未設定、空白或未替換的 `${VAR}` 都視為缺少
    pub fn access_token(&self) -> Result<&str> {
        let token = validation::validate_required_field(
            "service.access_token",
            &self.service.access_token,
        )?;
        if token.trim().is_empty() || token.starts_with("${") {
            return Err(LayerError::MissingConfigError {
                field: "service.access_token".to_string(),
            });
        }
        Ok(token.as_str())
    }

    pub fn query_parameters(&self) -> QueryParameters {
        QueryParameters {
            longitude: self.query.longitude,
            latitude: self.query.latitude,
            radius: self.query.radius,
            max_results: self.query.max_items,
            layer_names: self.layers.iter().map(|l| l.layer.clone()).collect(),
        }
    }

    pub fn filter_rules(&self) -> Vec<LayerFilterRule> {
        self.layers.iter().map(LayerRuleConfig::to_rule).collect()
    }

    pub fn map_center(&self) -> LngLat {
        self.map.center.unwrap_or(LngLat(0.0, 0.0))
    }
}

impl Validate for LayerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[service]
access_token = "pk.test"

[map]
center = [-73.5681, 45.5186]

[query]
longitude = -73.5681
latitude = "45.5186"
radius = 1000
max_items = 200

[display]
icon_path = "/assets/icons/"

[[layers]]
layer = "poi_label"
selection_key = "class"

[layers.icons]
food_and_drink = "food_and_drink.png"
education = "education.png"

[[layers]]
layer = "transit_stop_label"
selection_key = "stop_type"
selection = [
    { group = "station", icon = "metro.png" },
    { group = "stop", icon = "stop.png" },
]
"#;

    #[test]
    fn test_parse_basic_config() {
        let config = LayerConfig::from_toml_str(BASIC).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.service.host, "https://api.mapbox.com");
        assert_eq!(config.service.tileset, "mapbox.mapbox-streets-v8");
        assert_eq!(config.map_center(), LngLat(-73.5681, 45.5186));

        let query = config.query_parameters();
        assert_eq!(query.longitude, Some(-73.5681));
        assert_eq!(query.latitude, Some(45.5186));
        assert_eq!(query.effective_limit(), 50);
        assert_eq!(query.layers_csv(), "poi_label,transit_stop_label");

        let rules = config.filter_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selection_key.as_deref(), Some("class"));
        let transit = rules[1].icon_mapping().unwrap();
        assert_eq!(transit.get("station").map(String::as_str), Some("metro.png"));
        assert_eq!(transit.len(), 2);
    }

    #[test]
    fn test_empty_coordinates_mean_viewport_center() {
        let config = LayerConfig::from_toml_str(
            r#"
[service]
access_token = "pk.test"

[query]
longitude = ""
latitude = "  "

[[layers]]
layer = "poi_label"
"#,
        )
        .unwrap();

        assert_eq!(config.query.longitude, None);
        assert_eq!(config.query.latitude, None);
        assert_eq!(config.query.radius, 1000.0);
        assert!(config.filter_rules()[0].icon_mapping().is_none());
    }

    #[test]
    fn test_invalid_coordinate_text() {
        let result = LayerConfig::from_toml_str(
            r#"
[query]
longitude = "west"
"#,
        );
        assert!(matches!(result, Err(LayerError::ConfigError { .. })));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("POI_LAYER_TEST_TOKEN", "pk.from-env");

        let config = LayerConfig::from_toml_str(
            r#"
[service]
access_token = "${POI_LAYER_TEST_TOKEN}"

[[layers]]
layer = "poi_label"
"#,
        )
        .unwrap();
        assert_eq!(config.access_token().unwrap(), "pk.from-env");

        std::env::remove_var("POI_LAYER_TEST_TOKEN");
    }

    #[test]
    fn test_unresolved_token_is_missing() {
        let config = LayerConfig::from_toml_str(
            r#"
[service]
access_token = "${POI_LAYER_UNSET_VARIABLE}"

[[layers]]
layer = "poi_label"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(LayerError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = LayerConfig::from_toml_str(BASIC).unwrap();
        config.query.max_items = 0;
        assert!(config.validate().is_err());

        let mut config = LayerConfig::from_toml_str(BASIC).unwrap();
        config.service.host = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = LayerConfig::from_toml_str(BASIC).unwrap();
        config.layers.clear();
        assert!(config.validate().is_err());

        let mut config = LayerConfig::from_toml_str(BASIC).unwrap();
        config.layers[0].selection_key = None;
        assert!(matches!(
            config.validate(),
            Err(LayerError::ConfigError { .. })
        ));

        let mut config = LayerConfig::from_toml_str(BASIC).unwrap();
        config.query.latitude = Some(-120.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_selection_groups_limit_drawn_features() {
        let config = LayerConfig::from_toml_str(BASIC).unwrap();
        let collection: crate::domain::model::FeatureCollection =
            serde_json::from_value(serde_json::json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "geometry": {"coordinates": [-73.5697, 45.5176]},
                        "properties": {
                            "stop_type": "station",
                            "tilequery": {"layer": "transit_stop_label", "distance": 120.0}
                        }
                    },
                    {
                        "geometry": {"coordinates": [-73.5702, 45.5171]},
                        "properties": {
                            "stop_type": "entrance",
                            "tilequery": {"layer": "transit_stop_label", "distance": 180.0}
                        }
                    }
                ]
            }))
            .unwrap();

        let rules = config.filter_rules();
        let classified = crate::core::classifier::FeatureClassifier::new("/icons/")
            .classify(&collection, &rules[1..]);

        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].icon, "/icons/station.png");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = LayerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.layers.len(), 2);
    }
}
