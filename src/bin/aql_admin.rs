use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table as ComfyTable, presets::UTF8_FULL};
use sawitql::{DropTableRequest, PgBackend, SafeExecutor, Settings, logging};
use std::path::PathBuf;

/// Postgres administration through the safe executor
#[derive(Parser, Debug)]
#[command(name = "aql_admin")]
#[command(
    version,
    about = "Administer Postgres tables through the AQL safe executor",
    long_about = None
)]
struct Args {
    /// Database URL (overrides database.url)
    #[arg(long)]
    database_url: Option<String>,

    /// Config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List user tables (LIHAT LAHAN)
    Tables,
    /// Count rows of a table (HITUNG)
    Count { table: String },
    /// Drop a table (BAKAR LAHAN) after the confirmation gate
    DropTable {
        table: String,
        /// Must be CONFIRM_BAKAR_LAHAN_<table>
        #[arg(long)]
        confirm: String,
        /// Business justification, recorded in the audit log
        #[arg(long)]
        reason: String,
        /// Requester identity, recorded in the audit log
        #[arg(long)]
        requested_by: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    logging::init(&settings.log.filter);

    let url = args
        .database_url
        .or(settings.database.url)
        .context("no database url: pass --database-url or set database.url")?;
    let backend = PgBackend::connect(&url, settings.database.max_connections).await?;
    let executor = SafeExecutor::with_mode(backend, settings.database.translation);

    match args.command {
        Command::Tables => {
            let rows = executor.show_tables().await?.try_collect().await?;
            let mut table = ComfyTable::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![Cell::new("tablename")]);
            for row in &rows {
                table.add_row(row.values.iter().map(Cell::new));
            }
            println!("{table}");
            println!("({} rows)", rows.len());
        }
        Command::Count { table } => {
            println!("{}", executor.count(&table, None).await?);
        }
        Command::DropTable {
            table,
            confirm,
            reason,
            requested_by,
        } => {
            let request = DropTableRequest {
                table,
                confirmation: confirm,
                justification: reason,
                requested_by,
            };
            executor.safe_drop_table(&request).await?;
            println!("Dropped table {}", request.table);
        }
    }
    Ok(())
}
