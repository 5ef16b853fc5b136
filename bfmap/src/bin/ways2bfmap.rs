use std::path::PathBuf;

use bfmap::{
    RoadTypes,
    cli::{confirm, init_tracing},
    config::{ConnectionSettings, DEFAULT_PORT},
    convert::{DEFAULT_PAGE_SIZE, convert},
    database::{Database, PgSegmentSink, PgWaySource, PrintOnlySink},
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Split aggregated OSM ways into road segments for the map matcher"
)]
struct Args {
    #[arg(long)]
    source_host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    source_port: u16,
    #[arg(long)]
    source_database: String,
    /// Table produced by osm2ways
    #[arg(long)]
    source_table: String,
    #[arg(long)]
    source_user: String,
    /// Falls back to PGPASSWORD or ~/.pgpass when omitted
    #[arg(long)]
    source_password: Option<String>,

    #[arg(long)]
    target_host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    target_port: u16,
    #[arg(long)]
    target_database: String,
    /// Segment table, created if it does not exist
    #[arg(long)]
    target_table: String,
    #[arg(long)]
    target_user: String,
    /// Falls back to PGPASSWORD or ~/.pgpass when omitted
    #[arg(long)]
    target_password: Option<String>,

    /// Road type configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Append data if the target table exists
    #[arg(long)]
    append: bool,

    /// Do not write to the target, print the schema statements instead
    #[arg(long)]
    printonly: bool,

    /// Number of ways fetched and inserted per batch
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

impl Args {
    fn source(&self) -> ConnectionSettings {
        ConnectionSettings {
            host: self.source_host.clone(),
            port: self.source_port,
            database: self.source_database.clone(),
            user: self.source_user.clone(),
            password: self.source_password.clone(),
        }
    }

    fn target(&self) -> ConnectionSettings {
        ConnectionSettings {
            host: self.target_host.clone(),
            port: self.target_port,
            database: self.target_database.clone(),
            user: self.target_user.clone(),
            password: self.target_password.clone(),
        }
    }
}

/// Create the segment table, or decide with the user what to do with an
/// existing one.
async fn prepare_target(target: &Database, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let table = &args.target_table;

    if !target.exists(table).await? {
        tracing::info!(
            "Table '{table}' does not exist in database '{}'.",
            args.target_database
        );
        target.create_segment_table(table).await?;
        return Ok(());
    }

    tracing::info!(
        "Table '{table}' already exists in database '{}'.",
        args.target_database
    );
    if args.append || !confirm(&format!("Do you want to remove table '{table}'"), None)? {
        tracing::info!("Append data to table '{table}'.");
        return Ok(());
    }

    target.drop_table(table).await?;
    tracing::info!("Table '{table}' has been removed.");
    target.create_segment_table(table).await?;
    tracing::info!("Table '{table}' has been recreated.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();

    let road_types = RoadTypes::from_file(&args.config)?;
    tracing::info!("Configuration imported ({} road types).", road_types.len());

    let target = Database::connect(&args.target(), args.printonly).await?;
    prepare_target(&target, &args).await?;

    let source = Database::connect(&args.source(), false).await?;
    let mut rows = PgWaySource::open(&source, &args.source_table).await?;

    tracing::info!("Inserting data ...");
    let stats = if target.is_print_only() {
        let mut sink = PrintOnlySink::new(&args.target_table);
        convert(&mut rows, &mut sink, &road_types, args.page_size).await?
    } else {
        let mut sink = PgSegmentSink::new(&target, &args.target_table)?;
        convert(&mut rows, &mut sink, &road_types, args.page_size).await?
    };
    rows.close().await?;

    tracing::info!(
        "Done: {} segments from {} ways in {} batches.",
        stats.segments,
        stats.ways,
        stats.pages
    );
    Ok(())
}
