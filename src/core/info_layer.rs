use crate::core::classifier::FeatureClassifier;
use crate::core::generation::Generation;
use crate::core::presenter::{DrawnMarkers, MarkerPresenter};
use crate::core::route::{RouteOutcome, RouteRenderer};
use crate::domain::model::{LayerFilterRule, QueryParameters};
use crate::domain::overlay::MarkerId;
use crate::domain::ports::{EventSink, FeatureSource, MapHandle, RouteSource};
use crate::utils::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Presented(DrawnMarkers),
    /// 之後又發出了新的查詢，這次結果不畫
    Superseded,
}

/// 查詢 → 分類 → 繪製 的入口。點擊 marker 會另外觸發路線查詢。
pub struct InfoLayer {
    map: Arc<dyn MapHandle>,
    features: Arc<dyn FeatureSource>,
    classifier: FeatureClassifier,
    rules: Vec<LayerFilterRule>,
    presenter: MarkerPresenter,
    generation: Generation,
}

impl InfoLayer {
    pub fn new(
        map: Arc<dyn MapHandle>,
        features: Arc<dyn FeatureSource>,
        routes: Arc<dyn RouteSource>,
        events: Arc<dyn EventSink>,
        icon_path: &str,
        rules: Vec<LayerFilterRule>,
    ) -> Self {
        let router = Arc::new(RouteRenderer::new(routes, map.clone()));
        let presenter = MarkerPresenter::new(map.clone(), router, events, icon_path);

        Self {
            map,
            features,
            classifier: FeatureClassifier::new(icon_path),
            rules,
            presenter,
            generation: Generation::new(),
        }
    }

    pub fn presenter(&self) -> &MarkerPresenter {
        &self.presenter
    }

    /// 沒指定圖層時使用所有規則的來源圖層
    pub fn prepare_query(&self, mut query: QueryParameters) -> QueryParameters {
        if query.layer_names.is_empty() {
            query.layer_names = self
                .rules
                .iter()
                .map(|rule| rule.source_layer.clone())
                .collect();
        }
        query.with_default_center(self.map.center())
    }

    /// 查詢一定在分類與繪製之前完成；失敗時不動既有的 marker
    pub async fn show(&self, query: QueryParameters) -> Result<DrawOutcome> {
        let query = self.prepare_query(query);
        let center = query.center()?;
        let ticket = self.generation.issue();

        tracing::info!(
            "🔎 Querying layers [{}] within {}m of {}",
            query.layers_csv(),
            query.radius,
            center
        );
        let collection = self.features.query_features(&query).await?;

        if !self.generation.is_current(ticket) {
            tracing::debug!("Discarding stale tile query result around {}", center);
            return Ok(DrawOutcome::Superseded);
        }

        let classified = self.classifier.classify(&collection, &self.rules);
        Ok(DrawOutcome::Presented(self.presenter.present(classified, center)))
    }

    pub async fn click(&self, marker: MarkerId) -> Result<Option<RouteOutcome>> {
        self.presenter.click(marker).await
    }

    /// 地圖關閉時清掉所有 overlay，也讓還在路上的查詢失效
    pub fn clear(&self) {
        self.generation.issue();
        self.presenter.teardown();
    }
}

impl std::fmt::Debug for InfoLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoLayer")
            .field("classifier", &self.classifier)
            .field("rules", &self.rules)
            .field("presenter", &self.presenter)
            .finish_non_exhaustive()
    }
}
