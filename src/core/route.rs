use crate::core::generation::Generation;
use crate::domain::model::{LngLat, RouteGeometry};
use crate::domain::overlay::{LineStyle, Visibility, ROUTE_OVERLAY_ID};
use crate::domain::ports::{MapHandle, RouteSource};
use crate::utils::error::{LayerError, Result};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Rendered { points: usize },
    /// 較新的路線請求已經發出，這次的回應被丟棄
    Superseded,
}

/// 查詢步行路線並畫到唯一的路線圖層上
pub struct RouteRenderer {
    source: Arc<dyn RouteSource>,
    map: Arc<dyn MapHandle>,
    style: LineStyle,
    generation: Generation,
    /// ticket 檢查與繪製必須和 `invalidate` 互斥
    render_lock: Mutex<()>,
}

impl RouteRenderer {
    pub fn new(source: Arc<dyn RouteSource>, map: Arc<dyn MapHandle>) -> Self {
        Self {
            source,
            map,
            style: LineStyle::walking_route(),
            generation: Generation::new(),
            render_lock: Mutex::new(()),
        }
    }

    /// 失敗時不動地圖上既有的路線，包含它的可見狀態
    pub async fn route_and_render(&self, origin: LngLat, destination: LngLat) -> Result<RouteOutcome> {
        let ticket = self.generation.issue();

        let response = self.source.walking_routes(origin, destination).await?;
        let route = response
            .routes
            .into_iter()
            .next()
            .filter(|route| !route.geometry.coordinates.is_empty())
            .ok_or_else(|| LayerError::NoRouteFound {
                origin: origin.to_string(),
                destination: destination.to_string(),
            })?;

        {
            let _guard = self.render_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.generation.is_current(ticket) {
                tracing::debug!("Discarding stale route {} -> {}", origin, destination);
                return Ok(RouteOutcome::Superseded);
            }
            self.render(&route.geometry);
        }
        tracing::info!(
            "🚶 Walking route rendered with {} points",
            route.geometry.coordinates.len()
        );

        Ok(RouteOutcome::Rendered {
            points: route.geometry.coordinates.len(),
        })
    }

    /// 讓所有尚未回來的路線請求失效。正在繪製中的路線會先畫完才返回，
    /// 之後才隱藏路線就不會被重新打開。
    pub fn invalidate(&self) {
        let _guard = self.render_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.issue();
    }

    fn render(&self, geometry: &RouteGeometry) {
        if self.map.has_overlay(ROUTE_OVERLAY_ID) {
            self.map.set_line_geometry(ROUTE_OVERLAY_ID, geometry);
        } else {
            self.map.add_line_overlay(ROUTE_OVERLAY_ID, geometry, &self.style);
        }

        // 唯一會把先前隱藏的路線重新顯示的地方
        self.map.set_visibility(ROUTE_OVERLAY_ID, Visibility::Visible);
    }
}

impl std::fmt::Debug for RouteRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRenderer")
            .field("style", &self.style)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
