//! Builds the aggregated ways table `(way_id, tags, seq, nodes, counts, geoms)`
//! from an osmosis pgsnapshot import (`way_nodes`, `nodes`, `ways`).
//!
//! The plan is computed up front as a list of [`Step`]s and then executed in
//! order against a [`Database`].

use crate::database::{Database, DatabaseError, validate_identifier};

pub const DEFAULT_PREFIX: &str = "_tmp";

const NO_HASHAGG: &str = "set enable_hashagg = false;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationMode {
    /// Everything in a single query. Needs enough memory for the whole join.
    Slim,
    /// Five steps through intermediate tables named `<prefix>_*`.
    Staged { prefix: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    CreateTable {
        label: String,
        table: String,
        sql: String,
    },
    CreateIndex {
        table: String,
        column: String,
    },
    DropTable {
        table: String,
    },
    /// Leftovers of an aborted staged run.
    DropIfExists {
        table: String,
    },
}

pub fn plan(table: &str, mode: &AggregationMode) -> Result<Vec<Step>, DatabaseError> {
    let table = validate_identifier(table)?;
    match mode {
        AggregationMode::Slim => Ok(vec![Step::CreateTable {
            label: format!("Create table {table} (slim mode)"),
            table: table.to_string(),
            sql: slim_sql(table),
        }]),
        AggregationMode::Staged { prefix } => staged_plan(table, validate_identifier(prefix)?),
    }
}

fn slim_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {table} AS \
         SELECT way_aggs.way_id, ways.tags AS tags, way_aggs.seq AS seq, way_aggs.nodes AS nodes, \
         way_aggs.counts AS counts, way_aggs.geoms AS geoms \
         FROM ( \
         SELECT way_geoms.way_id AS way_id, array_agg(way_geoms.seq_id) AS seq, \
         array_agg(way_geoms.node_id) AS nodes, array_agg(node_counts.count) AS counts, \
         array_agg(ST_AsBinary(way_geoms.geom)) AS geoms \
         FROM ( \
         SELECT way_nodes.way_id AS way_id, way_nodes.node_id AS node_id, \
         way_nodes.sequence_id AS seq_id, nodes.geom AS geom \
         FROM way_nodes INNER JOIN nodes ON (way_nodes.node_id = nodes.id) \
         ) AS way_geoms \
         INNER JOIN ( \
         SELECT node_id, count(way_id) AS count FROM way_nodes GROUP BY node_id \
         ) AS node_counts ON (way_geoms.node_id = node_counts.node_id) \
         GROUP BY way_geoms.way_id \
         ) AS way_aggs \
         INNER JOIN ways ON (way_aggs.way_id = ways.id);"
    )
}

fn staged_plan(table: &str, prefix: &str) -> Result<Vec<Step>, DatabaseError> {
    let way_nodes = format!("{prefix}_way_nodes");
    let node_counts = format!("{prefix}_node_counts");
    let way_counts = format!("{prefix}_way_counts");
    let way_aggs = format!("{prefix}_way_aggs");
    for name in [&way_nodes, &node_counts, &way_counts, &way_aggs] {
        validate_identifier(name)?;
    }

    let create = |stage: usize, target: &str, intermediate: bool, body: String| Step::CreateTable {
        label: format!(
            "({stage}/5) Create {}table {target}",
            if intermediate { "intermediate " } else { "" }
        ),
        table: target.to_string(),
        sql: format!("{NO_HASHAGG} CREATE TABLE {target} AS {body}"),
    };
    let clear = |target: &str| Step::DropIfExists {
        table: target.to_string(),
    };
    let index = |target: &str, column: &str| Step::CreateIndex {
        table: target.to_string(),
        column: column.to_string(),
    };
    let drop = |target: &str| Step::DropTable {
        table: target.to_string(),
    };

    Ok(vec![
        clear(&way_nodes),
        create(
            1,
            &way_nodes,
            true,
            "SELECT way_nodes.way_id AS way_id, way_nodes.node_id AS node_id, \
             way_nodes.sequence_id AS seq_id, nodes.geom AS geom \
             FROM way_nodes INNER JOIN nodes ON (way_nodes.node_id = nodes.id);"
                .to_string(),
        ),
        index(&way_nodes, "node_id"),
        clear(&node_counts),
        create(
            2,
            &node_counts,
            true,
            "SELECT way_nodes.node_id, count(way_nodes.way_id) AS count \
             FROM way_nodes GROUP BY node_id;"
                .to_string(),
        ),
        index(&node_counts, "node_id"),
        clear(&way_counts),
        create(
            3,
            &way_counts,
            true,
            format!(
                "SELECT {way_nodes}.way_id, {way_nodes}.node_id AS node_id, \
                 {way_nodes}.seq_id AS seq_id, {way_nodes}.geom AS geom, \
                 {node_counts}.count AS count \
                 FROM {way_nodes} INNER JOIN {node_counts} \
                 ON ({way_nodes}.node_id = {node_counts}.node_id);"
            ),
        ),
        drop(&way_nodes),
        drop(&node_counts),
        index(&way_counts, "way_id"),
        clear(&way_aggs),
        create(
            4,
            &way_aggs,
            true,
            format!(
                "SELECT {way_counts}.way_id, array_agg({way_counts}.seq_id) AS seq, \
                 array_agg({way_counts}.node_id) AS nodes, \
                 array_agg({way_counts}.count) AS counts, \
                 array_agg(ST_AsBinary({way_counts}.geom)) AS geoms \
                 FROM {way_counts} GROUP BY {way_counts}.way_id;"
            ),
        ),
        drop(&way_counts),
        index(&way_aggs, "way_id"),
        create(
            5,
            table,
            false,
            format!(
                "SELECT {way_aggs}.way_id, ways.tags AS tags, {way_aggs}.seq AS seq, \
                 {way_aggs}.nodes AS nodes, {way_aggs}.counts AS counts, \
                 {way_aggs}.geoms AS geoms \
                 FROM {way_aggs} INNER JOIN ways ON ({way_aggs}.way_id = ways.id);"
            ),
        ),
        drop(&way_aggs),
    ])
}

/// Execute the steps in order. Stops at the first failing step.
pub async fn run(database: &Database, steps: &[Step]) -> Result<(), DatabaseError> {
    for step in steps {
        match step {
            Step::CreateTable { label, sql, .. } => {
                tracing::info!("{label} ...");
                database.execute(sql).await?;
            }
            Step::CreateIndex { table, column } => {
                tracing::info!("Create index on {column} of table {table} ...");
                database.create_index(table, column).await?;
            }
            Step::DropTable { table } => {
                tracing::info!("Drop intermediate table {table}.");
                database.drop_table(table).await?;
            }
            Step::DropIfExists { table } => {
                database.drop_if_exists(table).await?;
            }
        }
    }
    tracing::info!("Finished.");
    Ok(())
}
