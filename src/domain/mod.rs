// Domain layer: record shapes and ports. The join/render logic itself lives in core.

pub mod model;
pub mod ports;
