// Domain layer: film records, geocoding outcomes and the ports the pipeline talks through.

pub mod model;
pub mod ports;
