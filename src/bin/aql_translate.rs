use clap::Parser;
use sawitql::{TranslationMode, Translator};
use std::io::BufRead;
use std::process::ExitCode;

/// Translate AQL statements to SQL
#[derive(Parser, Debug)]
#[command(name = "aql_translate")]
#[command(version, about = "Translate AQL statements to SQL", long_about = None)]
struct Args {
    /// Forward unrecognized statements unchanged instead of failing
    #[arg(long)]
    passthrough: bool,

    /// Statements to translate; read one per line from stdin when empty
    statements: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    sawitql::logging::init("warn");

    let mode = if args.passthrough {
        TranslationMode::Passthrough
    } else {
        TranslationMode::Strict
    };
    let translator = Translator::new(mode);

    let statements = if args.statements.is_empty() {
        std::io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?
    } else {
        args.statements
    };

    let mut failed = false;
    for statement in statements.iter().filter(|s| !s.trim().is_empty()) {
        match translator.to_sql(statement) {
            Ok(sql) => println!("{sql}"),
            Err(e) => {
                eprintln!("error: {e}");
                failed = true;
            }
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
