use geo_types::{Geometry, LineString, Point};
use geozero::{ToGeo, ToWkt, wkb::Wkb};

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("invalid geometry: {0}")]
    Codec(#[from] geozero::error::GeozeroError),
    #[error("expected a point geometry")]
    NotAPoint,
}

/// Decode a node location from `ST_AsBinary(geom)` output.
pub fn point_from_wkb(bytes: &[u8]) -> Result<Point<f64>, GeometryError> {
    match Wkb(bytes.to_vec()).to_geo()? {
        Geometry::Point(point) => Ok(point),
        _ => Err(GeometryError::NotAPoint),
    }
}

/// Encode a segment polyline for `ST_GeomFromText`.
pub fn line_to_wkt(line: &LineString<f64>) -> Result<String, GeometryError> {
    Ok(Geometry::LineString(line.clone()).to_wkt()?)
}

#[cfg(test)]
pub(crate) fn point_to_wkb(x: f64, y: f64) -> Vec<u8> {
    use geozero::{CoordDimensions, ToWkb};

    Geometry::Point(Point::new(x, y))
        .to_wkb(CoordDimensions::xy())
        .expect("encode point")
}
