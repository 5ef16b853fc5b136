// Module database - PostgreSQL connections, table administration, and the
// source cursor / segment sink used by the conversion driver.

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction, postgres::PgPoolOptions};

use crate::{
    config::ConnectionSettings,
    convert::{SegmentSink, WayRowSource},
    error::ConvertError,
    segment::Segment,
    way::WayRow,
};

const SEGMENT_TABLE_SQL: &str = include_str!("../sql/segment_table.sql");

/// Ten bind parameters per row, Postgres accepts at most 65535 per statement.
const MAX_ROWS_PER_INSERT: usize = 5_000;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid table or column name: {0:?}")]
    InvalidIdentifier(String),
}

/// Reject anything but plain, optionally schema-qualified, identifiers before
/// they are interpolated into SQL.
pub fn validate_identifier(name: &str) -> Result<&str, DatabaseError> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|part| valid_part(part)) {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Split `schema.table`, defaulting to the `public` schema.
fn schema_and_table(name: &str) -> (&str, &str) {
    name.split_once('.').unwrap_or(("public", name))
}

fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table.replace('.', "_"), column)
}

pub fn segment_table_sql(table: &str) -> Result<String, DatabaseError> {
    let table = validate_identifier(table)?;
    Ok(SEGMENT_TABLE_SQL
        .replace("{index}", &table.replace('.', "_"))
        .replace("{table}", table))
}

/// Database connection pool
///
/// In print-only mode statements that would change the database are printed
/// to stdout instead of being executed. Reads still hit the database.
pub struct Database {
    pool: PgPool,
    print_only: bool,
}

impl Database {
    /// # Errors
    /// Returns DatabaseError if the connection cannot be established
    pub async fn connect(
        settings: &ConnectionSettings,
        print_only: bool,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_with(settings.connect_options())
            .await?;

        tracing::info!(
            "PostgreSQL connection pool created for {}@{}:{}/{}",
            settings.user,
            settings.host,
            settings.port,
            settings.database
        );

        Ok(Self::from_pool(pool, print_only))
    }

    pub fn from_pool(pool: PgPool, print_only: bool) -> Self {
        Self { pool, print_only }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn is_print_only(&self) -> bool {
        self.print_only
    }

    /// Run one or more statements (multi-statement strings are allowed).
    pub async fn execute(&self, sql: &str) -> Result<(), DatabaseError> {
        if self.print_only {
            println!("{sql}");
            return Ok(());
        }

        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Check whether the table already exists in the database.
    pub async fn exists(&self, table: &str) -> Result<bool, DatabaseError> {
        let (schema, table) = schema_and_table(validate_identifier(table)?);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(tablename) FROM pg_tables WHERE schemaname = $1 AND tablename = $2",
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn drop_table(&self, table: &str) -> Result<(), DatabaseError> {
        let table = validate_identifier(table)?;
        tracing::info!("Dropping table {table}.");
        self.execute(&format!("DROP TABLE {table};")).await
    }

    /// Drop the table if it exists. Returns whether a table was dropped.
    pub async fn drop_if_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        if self.exists(table).await? {
            tracing::info!("Table {table} already exists, dropping it.");
            self.drop_table(table).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub async fn create_index(&self, table: &str, column: &str) -> Result<(), DatabaseError> {
        let table = validate_identifier(table)?;
        let column = validate_identifier(column)?;
        self.execute(&format!(
            "CREATE INDEX {} ON {table} ({column});",
            index_name(table, column)
        ))
        .await
    }

    /// Create the segment table with a spatial index on its geometry.
    pub async fn create_segment_table(&self, table: &str) -> Result<(), DatabaseError> {
        self.execute(&segment_table_sql(table)?).await?;
        tracing::info!("Table '{table}' has been created.");
        Ok(())
    }
}

/// Reads aggregated way rows page by page through a server-side cursor.
///
/// The cursor lives in a transaction on the source database, which is held
/// until [`PgWaySource::close`].
pub struct PgWaySource {
    tx: Transaction<'static, Postgres>,
    cursor: String,
}

impl PgWaySource {
    pub async fn open(database: &Database, table: &str) -> Result<Self, DatabaseError> {
        let table = validate_identifier(table)?;
        let cursor = format!("{}_cursor", table.replace('.', "_"));
        let mut tx = database.pool().begin().await?;

        let declare = format!(
            "DECLARE {cursor} NO SCROLL CURSOR FOR \
             SELECT way_id, COALESCE(tags::text, '') AS tags, \
             seq::bigint[] AS sequence_ids, nodes::bigint[] AS node_ids, \
             counts::bigint[] AS ref_counts, geoms AS geometries \
             FROM {table}"
        );
        sqlx::raw_sql(&declare).execute(&mut *tx).await?;
        tracing::debug!("declared cursor {cursor} on {table}");

        Ok(Self { tx, cursor })
    }

    pub async fn close(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}

impl WayRowSource for PgWaySource {
    async fn next_page(&mut self, limit: usize) -> Result<Vec<WayRow>, ConvertError> {
        let fetch = format!("FETCH FORWARD {limit} FROM {}", self.cursor);
        let rows = sqlx::query_as::<_, WayRow>(&fetch)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }
}

/// Appends segments to the segment table. Each call is its own transaction,
/// so pages already inserted survive a later failure.
pub struct PgSegmentSink {
    pool: PgPool,
    table: String,
}

impl PgSegmentSink {
    pub fn new(database: &Database, table: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: database.pool().clone(),
            table: validate_identifier(table)?.to_string(),
        })
    }
}

/// The speed columns are integers; mph conversions are rounded.
fn speed_column(kph: f64) -> i32 {
    kph.round() as i32
}

impl SegmentSink for PgSegmentSink {
    async fn insert(&mut self, segments: &[Segment]) -> Result<(), ConvertError> {
        let mut tx = self.pool.begin().await?;

        for chunk in segments.chunks(MAX_ROWS_PER_INSERT) {
            let rows = chunk
                .iter()
                .map(|segment| Ok((segment, segment.wkt()?)))
                .collect::<Result<Vec<_>, ConvertError>>()?;

            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {} (osm_id, class_id, source, target, length, reverse, \
                 maxspeed_forward, maxspeed_backward, priority, geom) ",
                self.table
            ));
            builder.push_values(rows, |mut row, (segment, wkt)| {
                row.push_bind(segment.osm_id)
                    .push_bind(segment.class_id)
                    .push_bind(segment.source)
                    .push_bind(segment.target)
                    .push_bind(segment.length)
                    .push_bind(f64::from(segment.direction.value()))
                    .push_bind(segment.maxspeed_forward.map(speed_column))
                    .push_bind(segment.maxspeed_backward.map(speed_column))
                    .push_bind(segment.priority)
                    .push("ST_GeomFromText(")
                    .push_bind_unseparated(wkt)
                    .push_unseparated(", 4326)");
            });

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Sink for `--printonly` runs: nothing is written, the batch is only logged.
#[derive(Debug, Default)]
pub struct PrintOnlySink {
    table: String,
    pub batches: usize,
    pub segments: usize,
}

impl PrintOnlySink {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }
}

impl SegmentSink for PrintOnlySink {
    async fn insert(&mut self, segments: &[Segment]) -> Result<(), ConvertError> {
        self.batches += 1;
        self.segments += segments.len();
        tracing::info!(
            "print only: skipping insert of {} segments into {}",
            segments.len(),
            self.table
        );
        Ok(())
    }
}
