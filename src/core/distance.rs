use crate::domain::model::Coordinate;
use geo::{GeodesicDistance, Point};

/// WGS-84 橢球上的大地線距離（公里）
pub fn geodesic_km(a: Coordinate, b: Coordinate) -> f64 {
    let from = Point::new(a.lon, a.lat);
    let to = Point::new(b.lon, b.lat);
    from.geodesic_distance(&to) / 1000.0
}
