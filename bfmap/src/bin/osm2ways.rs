use bfmap::{
    cli::{confirm, init_tracing},
    config::{ConnectionSettings, DEFAULT_PORT},
    database::Database,
    pipeline::{self, AggregationMode, DEFAULT_PREFIX},
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Aggregate an osmosis import into one row per way (way_id, tags, seq, nodes, counts, geoms)"
)]
struct Args {
    /// Hostname of the database
    #[arg(long, env = "PGHOST")]
    host: String,

    #[arg(long, env = "PGPORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Name of the database
    #[arg(long, env = "PGDATABASE")]
    database: String,

    /// Name of the table to create
    #[arg(long)]
    table: String,

    #[arg(long, env = "PGUSER")]
    user: String,

    /// Falls back to PGPASSWORD or ~/.pgpass when omitted
    #[arg(long)]
    password: Option<String>,

    /// Run everything in a single query. This requires memory to be
    /// sufficiently available.
    #[arg(long)]
    slim: bool,

    /// Prefix of the intermediate tables when not using slim mode
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Do not execute commands, but print them
    #[arg(long)]
    printonly: bool,

    /// Drop an existing target table without asking
    #[arg(long, short = 'y')]
    yes: bool,
}

impl Args {
    fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    fn mode(&self) -> AggregationMode {
        if self.slim {
            AggregationMode::Slim
        } else {
            AggregationMode::Staged {
                prefix: self.prefix.clone(),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let steps = pipeline::plan(&args.table, &args.mode())?;
    let database = Database::connect(&args.connection(), args.printonly).await?;

    if database.exists(&args.table).await? {
        tracing::info!(
            "Table '{}' already exists in database '{}'.",
            args.table,
            args.database
        );
        let remove = args.yes
            || confirm(
                &format!("Do you want to remove table '{}'", args.table),
                Some(false),
            )?;
        if !remove {
            tracing::info!("Cancelled by user.");
            return Ok(());
        }
        database.drop_table(&args.table).await?;
        tracing::info!("Table '{}' has been removed.", args.table);
    }

    match args.mode() {
        AggregationMode::Slim => tracing::info!("Execute in slim mode ..."),
        AggregationMode::Staged { .. } => tracing::info!("Execute in normal mode ..."),
    }
    pipeline::run(&database, &steps).await?;

    Ok(())
}
