// Adapters layer: concrete implementations for external systems (geocoding service, local files, map output).

pub mod geocoder;
pub mod map_renderer;
pub mod storage;
