// Adapters layer: concrete implementations of the map handle and the HTTP services.

pub mod mapbox;
pub mod memory_map;
