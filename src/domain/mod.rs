// Domain layer: guest book models and ports. Only serde/chrono here, no IO.

pub mod model;
pub mod ports;
