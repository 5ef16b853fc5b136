use std::collections::VecDeque;

use bfmap::{
    ConversionStats, RoadTypes, Segment, SegmentSink, WayRow, WayRowSource, convert,
    error::ConvertError,
};
use geo_types::{Geometry, Point};
use geozero::{CoordDimensions, ToWkb};

const ROAD_TYPES: &str = r#"{"tags": [
    {"tag": "highway", "values": [
        {"name": "trunk", "id": 101, "priority": 1.0, "maxspeed": 120},
        {"name": "residential", "id": 113, "priority": 1.5, "maxspeed": 50}
    ]}
]}"#;

/// Hands out pre-built pages, then empty pages. Records requested sizes.
struct MemorySource {
    rows: VecDeque<WayRow>,
    requested: Vec<usize>,
}

impl MemorySource {
    fn new(rows: Vec<WayRow>) -> Self {
        Self {
            rows: rows.into(),
            requested: Vec::new(),
        }
    }
}

impl WayRowSource for MemorySource {
    async fn next_page(&mut self, limit: usize) -> Result<Vec<WayRow>, ConvertError> {
        self.requested.push(limit);
        let n = limit.min(self.rows.len());
        Ok(self.rows.drain(..n).collect())
    }
}

#[derive(Default)]
struct RecordingSink {
    batches: Vec<Vec<Segment>>,
}

impl SegmentSink for RecordingSink {
    async fn insert(&mut self, segments: &[Segment]) -> Result<(), ConvertError> {
        self.batches.push(segments.to_vec());
        Ok(())
    }
}

fn wkb(x: f64, y: f64) -> Vec<u8> {
    Geometry::Point(Point::new(x, y))
        .to_wkb(CoordDimensions::xy())
        .unwrap()
}

fn way(way_id: i64, tags: &str, ref_counts: &[i64]) -> WayRow {
    let n = ref_counts.len();
    // reversed input order, the converter has to sort
    let sequence_ids: Vec<i64> = (0..n as i64).rev().collect();
    WayRow {
        way_id,
        tags: tags.to_string(),
        node_ids: sequence_ids.iter().map(|seq| way_id * 100 + seq).collect(),
        ref_counts: sequence_ids.iter().map(|&seq| ref_counts[seq as usize]).collect(),
        geometries: sequence_ids.iter().map(|&seq| wkb(seq as f64, way_id as f64)).collect(),
        sequence_ids,
    }
}

fn road_types() -> RoadTypes {
    RoadTypes::from_reader(ROAD_TYPES.as_bytes()).unwrap()
}

#[tokio::test]
async fn single_page_yields_one_insert() {
    let rows = vec![
        way(1, r#""highway"=>"trunk""#, &[1, 1, 1]),
        way(2, r#""highway"=>"residential", "oneway"=>"yes""#, &[1, 2, 1, 3]),
        way(3, r#""highway"=>"footway""#, &[1, 1]),
        way(4, "", &[1, 1]),
        way(5, r#""highway"=>"trunk""#, &[1]),
        way(6, r#""highway"=>"trunk", "maxspeed"=>"50""#, &[1, 2, 2, 1]),
    ];
    let mut source = MemorySource::new(rows);
    let mut sink = RecordingSink::default();

    let stats = convert(&mut source, &mut sink, &road_types(), 10_000)
        .await
        .unwrap();

    // way 1: 1, way 2: 2, way 6: 3
    assert_eq!(
        stats,
        ConversionStats {
            pages: 1,
            ways: 6,
            segments: 6
        }
    );
    assert_eq!(sink.batches.len(), 1);
    assert_eq!(sink.batches[0].len(), 6);

    let osm_ids: Vec<i64> = sink.batches[0].iter().map(|s| s.osm_id).collect();
    assert_eq!(osm_ids, vec![1, 2, 2, 6, 6, 6]);
    assert_eq!(source.requested, vec![10_000, 10_000]);
}

#[tokio::test]
async fn segments_keep_way_attributes() {
    let mut source = MemorySource::new(vec![way(
        2,
        r#""highway"=>"residential", "oneway"=>"yes", "maxspeed:backward"=>"30 mph""#,
        &[1, 2, 1, 3],
    )]);
    let mut sink = RecordingSink::default();

    convert(&mut source, &mut sink, &road_types(), 100).await.unwrap();

    let segments = &sink.batches[0];
    assert_eq!(segments.len(), 2);
    for segment in segments {
        assert_eq!(segment.class_id, 113);
        assert_eq!(segment.priority, 1.5);
        assert_eq!(segment.direction.value(), -1);
        assert_eq!(segment.maxspeed_forward, None);
        assert_eq!(segment.maxspeed_backward, Some(30.0 * 1.609));
        assert_eq!(segment.length, 1.0);
    }
    assert_eq!((segments[0].source, segments[0].target), (200, 201));
    assert_eq!((segments[1].source, segments[1].target), (201, 203));
}

#[tokio::test]
async fn pages_are_inserted_separately() {
    let rows = (1..=5)
        .map(|id| way(id, r#""highway"=>"trunk""#, &[1, 1]))
        .collect();
    let mut source = MemorySource::new(rows);
    let mut sink = RecordingSink::default();

    let stats = convert(&mut source, &mut sink, &road_types(), 2).await.unwrap();

    assert_eq!(stats.pages, 3);
    assert_eq!(stats.ways, 5);
    assert_eq!(stats.segments, 5);
    let sizes: Vec<usize> = sink.batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[tokio::test]
async fn page_without_segments_is_not_inserted() {
    let rows = vec![
        way(1, r#""highway"=>"trunk""#, &[1, 1]),
        way(2, r#""building"=>"yes""#, &[1, 1]),
        way(3, r#""building"=>"yes""#, &[1, 1]),
    ];
    let mut source = MemorySource::new(rows);
    let mut sink = RecordingSink::default();

    let stats = convert(&mut source, &mut sink, &road_types(), 1).await.unwrap();

    assert_eq!(stats.pages, 3);
    assert_eq!(stats.ways, 3);
    assert_eq!(stats.segments, 1);
    assert_eq!(sink.batches.len(), 1);
}

#[tokio::test]
async fn empty_source() {
    let mut source = MemorySource::new(Vec::new());
    let mut sink = RecordingSink::default();

    let stats = convert(&mut source, &mut sink, &road_types(), 10).await.unwrap();

    assert_eq!(stats, ConversionStats::default());
    assert!(sink.batches.is_empty());
}

struct FailingSink;

impl SegmentSink for FailingSink {
    async fn insert(&mut self, _segments: &[Segment]) -> Result<(), ConvertError> {
        Err(ConvertError::Database(
            bfmap::database::DatabaseError::InvalidIdentifier("broken".to_string()),
        ))
    }
}

#[tokio::test]
async fn sink_failure_aborts() {
    let rows = (1..=3)
        .map(|id| way(id, r#""highway"=>"trunk""#, &[1, 1]))
        .collect();
    let mut source = MemorySource::new(rows);

    let result = convert(&mut source, &mut FailingSink, &road_types(), 1).await;

    assert!(matches!(result, Err(ConvertError::Database(_))));
    // nothing read after the failing page
    assert_eq!(source.requested.len(), 1);
}
