use crate::domain::model::{
    AppEvent, DirectionsResponse, FeatureCollection, LngLat, QueryParameters, RouteGeometry,
};
use crate::domain::overlay::{LineStyle, MarkerId, MarkerSpec, Visibility};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 依中心點、半徑、圖層查詢附近的 feature
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn query_features(&self, query: &QueryParameters) -> Result<FeatureCollection>;
}

/// 步行路線查詢
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn walking_routes(&self, origin: LngLat, destination: LngLat)
        -> Result<DirectionsResponse>;
}

/// 地圖引擎對外提供的最小介面，core 只透過它操作 overlay
pub trait MapHandle: Send + Sync {
    fn center(&self) -> LngLat;

    fn add_marker(&self, spec: MarkerSpec) -> MarkerId;
    fn remove_marker(&self, id: MarkerId);

    fn has_overlay(&self, id: &str) -> bool;
    fn add_line_overlay(&self, id: &str, geometry: &RouteGeometry, style: &LineStyle);
    fn set_line_geometry(&self, id: &str, geometry: &RouteGeometry);
    fn set_visibility(&self, id: &str, visibility: Visibility);
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}

impl<F> EventSink for F
where
    F: Fn(AppEvent) + Send + Sync,
{
    fn emit(&self, event: AppEvent) {
        self(event)
    }
}

/// 把事件送進 channel，由 UI 端的 task 消化
#[derive(Debug, Clone)]
pub struct ChannelSink(pub tokio::sync::mpsc::UnboundedSender<AppEvent>);

impl EventSink for ChannelSink {
    fn emit(&self, event: AppEvent) {
        if self.0.send(event).is_err() {
            tracing::debug!("Event receiver dropped, click event discarded");
        }
    }
}
