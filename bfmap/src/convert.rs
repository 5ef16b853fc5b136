use std::future::Future;

use rayon::prelude::*;

use crate::{
    error::ConvertError,
    road_types::RoadTypes,
    segment::{Segment, segment_way},
    way::WayRow,
};

pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Pages of aggregated way rows, in whatever order the source produces them.
pub trait WayRowSource {
    /// Fetch up to `limit` rows. An empty page means the source is exhausted.
    fn next_page(
        &mut self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<WayRow>, ConvertError>> + Send;
}

/// Destination of converted segments; one call per page.
pub trait SegmentSink {
    fn insert(
        &mut self,
        segments: &[Segment],
    ) -> impl Future<Output = Result<(), ConvertError>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub pages: u64,
    pub ways: u64,
    pub segments: u64,
}

/// Segment every row of a page. Rows are processed in parallel but the
/// output keeps row order, and segment order within a row.
pub fn segment_page(road_types: &RoadTypes, rows: &[WayRow]) -> Vec<Segment> {
    rows.par_iter()
        .flat_map_iter(|row| segment_way(road_types, row))
        .collect()
}

/// Read the source page by page, segment each page and write it to the sink.
///
/// Pages that produce no segments are not written. Any source or sink error
/// aborts the run; pages written before stay written.
pub async fn convert<S, K>(
    source: &mut S,
    sink: &mut K,
    road_types: &RoadTypes,
    page_size: usize,
) -> Result<ConversionStats, ConvertError>
where
    S: WayRowSource,
    K: SegmentSink,
{
    let page_size = page_size.max(1);
    let mut stats = ConversionStats::default();

    loop {
        let rows = source.next_page(page_size).await?;
        if rows.is_empty() {
            break;
        }

        let segments = segment_page(road_types, &rows);
        if !segments.is_empty() {
            sink.insert(&segments).await?;
        }

        stats.pages += 1;
        stats.ways += rows.len() as u64;
        stats.segments += segments.len() as u64;
        tracing::info!(
            "{} segments from {} ways inserted.",
            stats.segments,
            stats.ways
        );
    }

    tracing::info!(
        "{} segments from {} ways inserted and finished.",
        stats.segments,
        stats.ways
    );
    Ok(stats)
}
