//! Conversion of osmosis OSM imports into the road segment table read by the
//! map matcher.
//!
//! `osm2ways` aggregates the raw import into one row per way, `ways2bfmap`
//! splits those ways at intersections into directed, classified segments.

pub mod attributes;
pub mod cli;
pub mod config;
pub mod convert;
pub mod database;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod road_types;
pub mod segment;
pub mod tags;
pub mod way;

pub use convert::{ConversionStats, SegmentSink, WayRowSource, convert};
pub use road_types::RoadTypes;
pub use segment::{Direction, Segment, segment_way};
pub use way::WayRow;
