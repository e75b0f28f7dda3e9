pub mod classifier;
pub mod generation;
pub mod info_layer;
pub mod presenter;
pub mod route;

pub use crate::domain::model::{ClassifiedFeature, FeatureCollection, LayerFilterRule, QueryParameters};
pub use crate::domain::ports::{EventSink, FeatureSource, MapHandle, RouteSource};
pub use crate::utils::error::Result;
