use crate::domain::model::LngLat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 路線圖層固定使用的 id，同一時間只會有一條路線
pub const ROUTE_OVERLAY_ID: &str = "route";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Center,
    Feature,
}

impl MarkerKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            MarkerKind::Center => "center",
            MarkerKind::Feature => "marker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub kind: MarkerKind,
    pub position: LngLat,
    pub icon: String,
    pub draggable: bool,
    pub clickable: bool,
}

impl MarkerSpec {
    pub fn center(position: LngLat, icon: String) -> Self {
        Self {
            kind: MarkerKind::Center,
            position,
            icon,
            draggable: false,
            clickable: false,
        }
    }

    pub fn feature(position: LngLat, icon: String) -> Self {
        Self {
            kind: MarkerKind::Feature,
            position,
            icon,
            draggable: false,
            clickable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Round,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub line_join: LineJoin,
    pub line_cap: LineCap,
    pub color: String,
    pub width: f32,
    pub opacity: f32,
}

impl LineStyle {
    pub fn walking_route() -> Self {
        Self {
            line_join: LineJoin::Round,
            line_cap: LineCap::Round,
            color: "#1c86a7".to_string(),
            width: 5.0,
            opacity: 0.75,
        }
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::walking_route()
    }
}
