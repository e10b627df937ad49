use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use ledgest_core::render::render_entries;
use ledgest_core::LedgerEntry;
use ledgest_import::{CsvStatementImporter, EmailImporter, ExtractConfig};

#[derive(Parser)]
#[command(name = "ledgest", about = "Convert bank statement exports to ledger entries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract a statement file and print ledger entries to stdout.
    Extract {
        file: PathBuf,
        #[arg(long, value_enum)]
        format: Format,
        #[arg(long, default_value = "ledgest.toml")]
        config: PathBuf,
        /// Also run balance and account validation on every entry.
        #[arg(long)]
        check: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Email,
    Csv,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Extract {
            file,
            format,
            config,
            check,
        } => {
            let config_text = std::fs::read_to_string(&config)
                .with_context(|| format!("reading config {}", config.display()))?;
            let config = ExtractConfig::from_toml(&config_text)?;

            let input = File::open(&file)
                .with_context(|| format!("opening statement {}", file.display()))?;
            let entries = extract(format, config, input)
                .with_context(|| format!("extracting {}", file.display()))?;

            if check {
                for entry in &entries {
                    entry
                        .check_balance()
                        .with_context(|| format!("entry {} {}", entry.date, entry.category))?;
                    entry
                        .check_accounts()
                        .with_context(|| format!("entry {} {}", entry.date, entry.category))?;
                }
            }

            tracing::info!("extracted {} entries", entries.len());
            print!("{}", render_entries(&entries));
            Ok(())
        }
    }
}

fn extract(
    format: Format,
    config: ExtractConfig,
    input: File,
) -> anyhow::Result<Vec<LedgerEntry>> {
    match format {
        Format::Email => {
            let section = config
                .email
                .context("config has no [email] section")?;
            Ok(EmailImporter::new(section).extract(BufReader::new(input))?)
        }
        Format::Csv => {
            let section = config.csv.context("config has no [csv] section")?;
            Ok(CsvStatementImporter::new(section).extract(input)?)
        }
    }
}
