pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliArgs;
pub use crate::config::LayerConfig;

pub use crate::adapters::{mapbox::MapboxClient, memory_map::InMemoryMap};
pub use crate::core::{
    classifier::FeatureClassifier,
    info_layer::{DrawOutcome, InfoLayer},
    presenter::{DrawnMarkers, MarkerPresenter},
    route::{RouteOutcome, RouteRenderer},
};
pub use crate::domain::model::{
    AppEvent, ClassifiedFeature, FeatureCollection, LayerFilterRule, LngLat, QueryParameters,
    RawFeature, RouteGeometry,
};
pub use crate::domain::ports::{ChannelSink, EventSink, FeatureSource, MapHandle, RouteSource};
pub use crate::utils::error::{LayerError, Result};
