use anyhow::Context;
use clap::Parser;
use comfy_table::{Cell, Table as ComfyTable, presets::UTF8_FULL};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sawitql::repository::parse_records;
use sawitql::{RemoteClient, Settings, TranslationMode, Translator, logging};
use serde_json::Value as Json;
use std::path::PathBuf;

/// SawitQL interactive AQL shell
#[derive(Parser, Debug)]
#[command(name = "sawitql")]
#[command(version, about = "Interactive AQL shell for SawitDB", long_about = None)]
struct Args {
    /// SawitDB host
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// SawitDB port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Config file (default: /etc/sawitql/sawitql.toml, then ./sawitql.toml)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "sawitql=trace"
    #[arg(long)]
    log: Option<String>,
}

const HELP: &str = "\
Meta-commands:
  \\q, \\quit          - Quit
  \\sql <aql>         - Show the SQL translation of a statement
  \\stats             - Show client counters
  \\?, \\h, \\help      - Show this help

AQL: LAHAN, TANAM KE, PANEN, PUPUK, GUSUR DARI, BAKAR LAHAN, LIHAT LAHAN, HITUNG";

/// AQL after a `\sql` meta-command; `None` for any other input.
fn sql_argument(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("\\sql")?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

/// Renders a response payload: rows as a table, anything else as JSON.
fn render(data: Json) -> String {
    match parse_records(data.clone()) {
        Ok(records) if records.is_empty() => "(0 rows)".to_string(),
        Ok(records) => {
            let mut columns: Vec<String> = Vec::new();
            for record in &records {
                for key in record.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }

            let mut table = ComfyTable::new();
            table.load_preset(UTF8_FULL);
            table.set_header(columns.iter().map(Cell::new));
            for record in &records {
                table.add_row(columns.iter().map(|c| match record.get(c) {
                    None | Some(Json::Null) => Cell::new(""),
                    Some(Json::String(s)) => Cell::new(s),
                    Some(other) => Cell::new(other),
                }));
            }
            format!("{table}\n({} rows)", records.len())
        }
        Err(_) => match data {
            Json::Null => "OK".to_string(),
            Json::String(text) => text,
            other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    if let Some(host) = args.host {
        settings.remote.host = host;
    }
    if let Some(port) = args.port {
        settings.remote.port = port;
    }
    logging::init(args.log.as_deref().unwrap_or(&settings.log.filter));

    let addr = settings.remote.addr();
    let client = RemoteClient::new(addr.clone(), settings.remote.client_config());
    let translator = Translator::new(TranslationMode::Strict);

    println!("SawitQL {} - connecting to {addr}...", env!("CARGO_PKG_VERSION"));
    match client.connect().await {
        Ok(()) => println!("✓ Connected!\n"),
        Err(e) => {
            eprintln!("✗ {e}");
            eprintln!("  Statements will retry the connection.\n");
        }
    }

    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".sawitql_history");
        p
    });
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    println!("Type '\\?' for help, '\\q' to quit.\n");

    loop {
        let input = match rl.readline("sawitql> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        if let Some(aql) = sql_argument(input) {
            match translator.to_sql(aql) {
                Ok(sql) => println!("{sql}"),
                Err(e) => eprintln!("✗ {e}"),
            }
            continue;
        }

        match input {
            "\\q" | "\\quit" => break,
            "\\?" | "\\h" | "\\help" => println!("{HELP}"),
            "\\stats" => {
                let stats = client.stats();
                println!(
                    "attempts: {}, reconnects: {}, failures: {}",
                    stats.attempts, stats.reconnects, stats.failures
                );
            }
            _ if input.starts_with('\\') => {
                println!("Unknown meta-command: {input}. Use \\? for help.");
            }
            statement => match client.query(statement).await {
                Ok(data) => println!("{}", render(data)),
                Err(e) => eprintln!("✗ {e}"),
            },
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
    client.close().await;
    println!("Bye.");
    Ok(())
}
