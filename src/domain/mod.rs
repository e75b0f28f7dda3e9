// Domain layer: core models, overlay types and ports (interfaces).

pub mod model;
pub mod overlay;
pub mod ports;
