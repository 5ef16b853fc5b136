use geo_types::{Coord, LineString};

use crate::{
    attributes::{is_oneway, maxspeed},
    geometry::{GeometryError, line_to_wkt, point_from_wkb},
    road_types::RoadTypes,
    tags::{TagMap, parse_tags},
    way::WayRow,
};

/// Length written for every segment. The consumer does not read it.
// TODO: compute the geodesic length of the polyline once the map reader uses it.
pub const PLACEHOLDER_LENGTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Oneway,
    Bidirectional,
}

impl Direction {
    pub fn from_tags(tags: &TagMap) -> Self {
        if is_oneway(tags) {
            Direction::Oneway
        } else {
            Direction::Bidirectional
        }
    }

    /// Value of the `reverse` column: -1 for one-way roads, 1 otherwise.
    pub fn value(self) -> i32 {
        match self {
            Direction::Oneway => -1,
            Direction::Bidirectional => 1,
        }
    }
}

/// A directed piece of a way between two split points.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub osm_id: i64,
    pub class_id: i32,
    pub source: i64,
    pub target: i64,
    pub length: f64,
    pub direction: Direction,
    /// km/h, `None` when the way has no usable speed tag.
    pub maxspeed_forward: Option<f64>,
    pub maxspeed_backward: Option<f64>,
    pub priority: f64,
    pub geometry: LineString<f64>,
}

impl Segment {
    pub fn wkt(&self) -> Result<String, GeometryError> {
        line_to_wkt(&self.geometry)
    }
}

/// Split a way into segments at every node shared with another way.
///
/// Rows that cannot be segmented (no tags, fewer than two nodes, no matching
/// road type, undecodable node geometry) yield no segments.
pub fn segment_way(road_types: &RoadTypes, row: &WayRow) -> Vec<Segment> {
    if !row.is_segmentable() {
        tracing::debug!(way_id = row.way_id, "skipping way without tags or nodes");
        return Vec::new();
    }

    let tags = parse_tags(&row.tags);
    let Some(class) = road_types.classify(&tags) else {
        return Vec::new();
    };

    let nodes = row.sorted_nodes();
    let coords = match nodes
        .iter()
        .map(|node| point_from_wkb(node.geometry).map(|point| point.0))
        .collect::<Result<Vec<Coord<f64>>, _>>()
    {
        Ok(coords) => coords,
        Err(err) => {
            tracing::warn!(way_id = row.way_id, "skipping way with invalid node geometry: {err}");
            return Vec::new();
        }
    };

    let direction = Direction::from_tags(&tags);
    let (maxspeed_forward, maxspeed_backward) = maxspeed(&tags);
    let last = nodes.len() - 1;

    let mut segments = Vec::new();
    let mut source = nodes[0].node_id;
    let mut line = vec![coords[0]];

    for (i, (node, &coord)) in nodes.iter().zip(&coords).enumerate().skip(1) {
        line.push(coord);

        if node.is_intersection() || i == last {
            let geometry = LineString::new(std::mem::replace(&mut line, vec![coord]));
            segments.push(Segment {
                osm_id: row.way_id,
                class_id: class.road_type.class_id,
                source,
                target: node.node_id,
                length: PLACEHOLDER_LENGTH,
                direction,
                maxspeed_forward,
                maxspeed_backward,
                priority: class.road_type.priority,
                geometry,
            });
            source = node.node_id;
        }
    }

    segments
}
