mod config;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::loader::load_directory;
use crate::models::{DateRange, FirmCode};
use crate::pipeline::Pipeline;
use crate::scraper::cleaner::parse_input_date;

#[derive(Parser)]
#[command(name = "bvl-history", about = "Lima Stock Exchange price history extractor", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Download a firm's daily prices between two dates (inclusive)
    Extract {
        /// Exchange ticker, e.g. ALICORC1
        #[arg(value_parser = parse_firm)]
        firm: FirmCode,

        /// First day, YYYY-MM-DD or DD/MM/YYYY
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,

        /// Last day, YYYY-MM-DD or DD/MM/YYYY
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,

        /// Output file (default: <downloads_dir>/<FIRM>.csv)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Save today's quotes for every listed firm
    Latest {
        #[arg(short, long, default_value = "downloads/latest.csv")]
        out: PathBuf,
    },

    /// Scrape the exchange's company directory into the codes file
    Codes,

    /// List firms from the saved codes file
    Firms,
}

fn parse_firm(s: &str) -> std::result::Result<FirmCode, String> {
    FirmCode::new(s).ok_or_else(|| "ticker must not be empty".to_string())
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_input_date(s).ok_or_else(|| format!("invalid date {:?}", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "bvl_history=info,warn",
        1 => "bvl_history=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Extract { firm, from, to, out } => {
            let _t = utils::Timer::start(format!("{} history", firm));
            let path = Pipeline::new(config).extract(&firm, DateRange::new(from, to), out.as_deref())?;
            info!("Saved {:?}", path);
        }

        Command::Latest { out } => {
            let _t = utils::Timer::start("Latest day");
            Pipeline::new(config).latest(&out)?;
            info!("Saved {:?}", out);
        }

        Command::Codes => {
            let _t = utils::Timer::start("Firm directory");
            let path = Pipeline::new(config).refresh_codes()?;
            info!("Saved {:?}", path);
        }

        Command::Firms => {
            let firms = load_directory(&config.output.codes_path)?;
            if firms.is_empty() {
                println!("No firms saved yet. Run `bvl-history codes` first.");
            } else {
                println!("{} firms:", firms.len());
                for f in &firms {
                    println!("  {:<12} {}", f.ticker, f.name);
                }
            }
        }
    }

    Ok(())
}
