use crate::domain::model::{ClassifiedFeature, FeatureCollection, LayerFilterRule, RawFeature};

/// 依照設定的子圖層規則挑出 feature 並附上圖示路徑
#[derive(Debug, Clone)]
pub struct FeatureClassifier {
    icon_path: String,
}

impl FeatureClassifier {
    pub fn new(icon_path: impl Into<String>) -> Self {
        Self {
            icon_path: icon_path.into(),
        }
    }

    /// 規則之間不互斥：同一個 feature 符合幾條規則就出現幾次，
    /// 輸出順序為規則順序，再依原始 feature 順序
    pub fn classify(
        &self,
        collection: &FeatureCollection,
        rules: &[LayerFilterRule],
    ) -> Vec<ClassifiedFeature> {
        let classified: Vec<ClassifiedFeature> = rules
            .iter()
            .flat_map(|rule| {
                collection
                    .features
                    .iter()
                    .filter(move |feature| Self::matches(rule, feature))
                    .map(move |feature| ClassifiedFeature {
                        icon: self.resolve_icon(rule, feature),
                        feature: feature.clone(),
                    })
            })
            .collect();

        tracing::debug!(
            "Classified {} of {} features with {} rules",
            classified.len(),
            collection.features.len(),
            rules.len()
        );

        classified
    }

    fn matches(rule: &LayerFilterRule, feature: &RawFeature) -> bool {
        match rule.icon_mapping() {
            Some(icons) => rule
                .selection_key
                .as_deref()
                .and_then(|key| feature.selection_value(key))
                .is_some_and(|value| icons.contains_key(value)),
            None => feature.source_layer() == rule.source_layer,
        }
    }

    fn resolve_icon(&self, rule: &LayerFilterRule, feature: &RawFeature) -> String {
        let file = match rule
            .selection_key
            .as_deref()
            .map(|key| feature.selection_value(key))
        {
            Some(Some(value)) => format!("{}.png", value),
            // 沒有 selection key，或 feature 缺少該屬性
            _ => format!("{}.png", rule.source_layer),
        };
        format!("{}{}", self.icon_path, file)
    }
}
