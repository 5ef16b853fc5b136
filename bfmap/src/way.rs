use sqlx::FromRow;

/// One row of the aggregated ways table: a way with its node occurrences as
/// parallel arrays, in no particular order.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WayRow {
    pub way_id: i64,
    pub tags: String,
    pub sequence_ids: Vec<i64>,
    pub node_ids: Vec<i64>,
    /// Number of ways referencing each node, across the whole dataset.
    pub ref_counts: Vec<i64>,
    /// Node locations as WKB points.
    pub geometries: Vec<Vec<u8>>,
}

/// A node of a way, at its position along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOccurrence<'a> {
    pub sequence_id: i64,
    pub node_id: i64,
    pub ref_count: i64,
    pub geometry: &'a [u8],
}

impl NodeOccurrence<'_> {
    /// Shared with another way, i.e. a point where the way must be split.
    pub fn is_intersection(&self) -> bool {
        self.ref_count >= 2
    }
}

impl WayRow {
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Rows without tags or with fewer than two nodes cannot form a segment.
    pub fn is_segmentable(&self) -> bool {
        !self.tags.trim().is_empty() && self.node_count() >= 2 && self.has_parallel_arrays()
    }

    fn has_parallel_arrays(&self) -> bool {
        let n = self.node_ids.len();
        self.sequence_ids.len() == n && self.ref_counts.len() == n && self.geometries.len() == n
    }

    /// Node occurrences ordered by ascending sequence id. The sort is stable,
    /// so duplicate sequence ids keep their input order.
    pub fn sorted_nodes(&self) -> Vec<NodeOccurrence<'_>> {
        let mut nodes: Vec<NodeOccurrence<'_>> = self
            .sequence_ids
            .iter()
            .zip(&self.node_ids)
            .zip(&self.ref_counts)
            .zip(&self.geometries)
            .map(|(((&sequence_id, &node_id), &ref_count), geometry)| NodeOccurrence {
                sequence_id,
                node_id,
                ref_count,
                geometry: geometry.as_slice(),
            })
            .collect();
        nodes.sort_by_key(|node| node.sequence_id);
        nodes
    }
}
