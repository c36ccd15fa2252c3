//! Fundview CLI: run dashboard queries headlessly.
//!
//! Every command drives a `Session` the same way the TUI does, waits for the
//! requests it issued and prints the result as JSON on stdout. Logs go to
//! stderr, filtered by `FUNDVIEW_LOG`.
//!
//! Commands:
//! - `markets`, `tickers`: option lists for the selection
//! - `stock-data`, `market-index`: report rows
//! - `beta`, `portfolio-beta`: beta coefficients
//! - `analyze`, `latest`: SVM analysis
//! - `import`, `recalculate`, `research-analyze`: server-side jobs
//!
//! `--research` sends the selection and analysis commands to the research
//! server instead of the fund server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fundview_core::api::{
    parse_rows, Backend, Department, HttpBackend, ImportTarget, ScriptedBackend, StockDataKind,
};
use fundview_core::fetch::Slot;
use fundview_core::selection::{ParamValue, DAYS_TO_PREDICT, USE_BETA};
use fundview_core::view::DataRegion;
use fundview_core::{Session, SessionEvent, Settings};

#[derive(Parser)]
#[command(
    name = "fundview",
    about = "Fundview CLI: query the fund dashboard backend"
)]
struct Cli {
    /// Use the built-in scripted backend instead of the HTTP server.
    #[arg(long, global = true, default_value_t = false)]
    demo: bool,

    /// Settings file. Defaults to <config dir>/fundview/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ask the research server for markets, tickers and analyses.
    #[arg(long, global = true, default_value_t = false)]
    research: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List market codes.
    Markets,
    /// List tickers, optionally for one market code.
    Tickers {
        #[arg(long)]
        market: Option<String>,
    },
    /// Stock rows from one of the stock-data reports.
    StockData {
        #[arg(long, value_enum, default_value_t = ReportKind::Plain)]
        kind: ReportKind,

        /// Market filter (asset report only).
        #[arg(long)]
        market: Option<String>,
    },
    /// Beta for one ticker, or for every stock when no ticker is given.
    Beta {
        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        ticker: Option<String>,
    },
    /// Weighted beta of a portfolio given as STOCK=WEIGHT pairs.
    PortfolioBeta {
        /// Holdings, e.g. FPT=0.6 VNM=0.4.
        #[arg(required = true)]
        holdings: Vec<String>,

        #[arg(long)]
        days: Option<u32>,
    },
    /// Run the SVM analysis for a ticker.
    Analyze {
        #[arg(long)]
        market: String,

        #[arg(long)]
        ticker: String,

        /// Days to predict. Defaults to the configured value.
        #[arg(long)]
        days: Option<u32>,

        /// Train without the beta feature.
        #[arg(long, default_value_t = false)]
        no_beta: bool,
    },
    /// The last analysis stored server-side.
    Latest {
        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        ticker: Option<String>,
    },
    /// Import rows from a JSON file (an array, or {"data": [...]}).
    Import {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = Target::Fund)]
        target: Target,
    },
    /// Market index rows.
    MarketIndex,
    /// Recalculate betas and retrain the model.
    Recalculate,
    /// Run the research analysis job.
    ResearchAnalyze,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Plain,
    Beta,
    Asset,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Fund,
    Research,
    ResearchMarketIndex,
}

impl From<Target> for ImportTarget {
    fn from(t: Target) -> Self {
        match t {
            Target::Fund => ImportTarget::Fund,
            Target::Research => ImportTarget::Research,
            Target::ResearchMarketIndex => ImportTarget::ResearchMarketIndex,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("FUNDVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(cli.config.as_deref())?;
    let dept = if cli.research {
        Department::Research
    } else {
        Department::Fund
    };
    if cli.demo {
        run(ScriptedBackend::demo(), &settings, dept, cli.command)
    } else {
        run(HttpBackend::new(&settings)?, &settings, dept, cli.command)
    }
}

fn run<B: Backend + 'static>(
    backend: B,
    settings: &Settings,
    dept: Department,
    command: Commands,
) -> Result<()> {
    let mut cli = Headless {
        session: Session::with_pool(backend, settings),
        // A request never outlives the HTTP timeout; leave room for the pool.
        wait: Duration::from_secs(settings.request_timeout_secs + 5),
    };
    cli.session.use_department(dept);

    match command {
        Commands::Markets => {
            cli.session.load_market_codes();
            cli.settle()?;
            let codes: Vec<&str> = cli
                .session
                .store()
                .market_codes()
                .map(|set| set.iter().collect())
                .unwrap_or_default();
            print_json(&codes)
        }
        Commands::Tickers { market } => {
            if cli.session.set_market_code(market.as_deref().unwrap_or("")).is_some() {
                cli.settle()?;
            }
            let tickers: Vec<&str> = cli
                .session
                .store()
                .tickers()
                .map(|set| set.iter().collect())
                .unwrap_or_default();
            print_json(&tickers)
        }
        Commands::StockData { kind, market } => {
            let (kind, slot) = match kind {
                ReportKind::Plain => (StockDataKind::Plain, Slot::StockData),
                ReportKind::Beta => (StockDataKind::WithBeta, Slot::StockData),
                ReportKind::Asset => (
                    StockDataKind::Asset {
                        market_code: market.filter(|m| !m.is_empty()),
                    },
                    Slot::AssetReport,
                ),
            };
            cli.session.load_stock_data(kind);
            cli.settle()?;
            print_json(&ready(cli.session.rows_view(slot))?)
        }
        Commands::Beta { market, ticker } => {
            match ticker {
                Some(ticker) => {
                    cli.select(market.as_deref(), &ticker)?;
                    cli.session.calculate_beta()?;
                }
                None => {
                    cli.session.calculate_all_betas();
                }
            }
            cli.settle()?;
            print_json(&ready(cli.session.beta_view())?)
        }
        Commands::PortfolioBeta { holdings, days } => {
            if let Some(days) = days {
                cli.session.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(days.into()))?;
            }
            for holding in &holdings {
                let (code, weight) = parse_holding(holding)?;
                cli.session.add_to_portfolio(code)?;
                cli.session.set_weight(code, weight)?;
            }
            cli.session.calculate_portfolio_beta()?;
            cli.settle()?;
            print_json(&ready(cli.session.portfolio_view())?)
        }
        Commands::Analyze {
            market,
            ticker,
            days,
            no_beta,
        } => {
            cli.select(Some(market.as_str()), &ticker)?;
            if let Some(days) = days {
                cli.session.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(days.into()))?;
            }
            cli.session.set_parameter(USE_BETA, ParamValue::Bool(!no_beta))?;
            cli.session.analyze()?;
            cli.settle()?;
            print_json(&ready(cli.session.analysis_view())?)
        }
        Commands::Latest { market, ticker } => {
            if let Some(ticker) = ticker {
                cli.select(market.as_deref(), &ticker)?;
            } else if let Some(market) = market {
                cli.select(Some(market.as_str()), "")?;
            }
            cli.session.latest_analysis();
            cli.settle()?;
            print_json(&ready(cli.session.latest_view())?)
        }
        Commands::Import { file, target } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let rows = parse_rows(&content).with_context(|| format!("parse {}", file.display()))?;
            cli.session.import_rows(target.into(), rows)?;
            cli.settle()?;
            print_json(&ready(cli.session.receipt_view(Slot::DataImport))?)
        }
        Commands::MarketIndex => {
            cli.session.load_market_index();
            cli.settle()?;
            print_json(&ready(cli.session.market_index_view())?)
        }
        Commands::Recalculate => {
            cli.session.recalculate();
            cli.settle()?;
            print_json(&ready(cli.session.receipt_view(Slot::Recalculate))?)
        }
        Commands::ResearchAnalyze => {
            cli.session.research_analyze();
            cli.settle()?;
            print_json(&ready(cli.session.receipt_view(Slot::ResearchAnalysis))?)
        }
    }
}

struct Headless<B: Backend + 'static> {
    session: Session<B>,
    wait: Duration,
}

impl<B: Backend + 'static> Headless<B> {
    /// Wait for every issued request. The first failure becomes the command's error.
    fn settle(&mut self) -> Result<()> {
        let events = self.session.wait_idle(self.wait);
        if let Some(SessionEvent::Failed { slot, error }) = events
            .into_iter()
            .find(|e| matches!(e, SessionEvent::Failed { .. }))
        {
            bail!("{} failed: {error}", slot.label());
        }
        if self.session.any_pending() {
            bail!("no answer from the backend within {}s", self.wait.as_secs());
        }
        Ok(())
    }

    /// Commit market code then ticker, loading the ticker list in between.
    fn select(&mut self, market: Option<&str>, ticker: &str) -> Result<()> {
        if let Some(market) = market.filter(|m| !m.is_empty()) {
            if self.session.set_market_code(market).is_some() {
                self.settle()?;
            }
        }
        self.session.set_ticker(ticker)?;
        Ok(())
    }
}

fn ready<T>(region: DataRegion<T>) -> Result<T> {
    match region {
        DataRegion::Ready(value) => Ok(value),
        DataRegion::Error(message) => Err(anyhow!(message)),
        DataRegion::Loading => bail!("request still in flight"),
        DataRegion::Idle => bail!("no result"),
    }
}

/// `STOCK=WEIGHT`.
fn parse_holding(raw: &str) -> Result<(&str, f64)> {
    let (code, weight) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected STOCK=WEIGHT, got {raw:?}"))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .with_context(|| format!("weight for {code} is not a number"))?;
    Ok((code.trim(), weight))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holdings_parse_code_and_weight() {
        assert_eq!(parse_holding("FPT=0.6").unwrap(), ("FPT", 0.6));
        assert_eq!(parse_holding(" VNM = 2 ").unwrap(), ("VNM", 2.0));
        assert!(parse_holding("FPT").is_err());
        assert!(parse_holding("FPT=heavy").is_err());
    }

    #[test]
    fn ready_maps_every_region() {
        assert_eq!(ready(DataRegion::Ready(3)).unwrap(), 3);
        assert_eq!(
            ready::<i32>(DataRegion::Error("boom".into())).unwrap_err().to_string(),
            "boom"
        );
        assert!(ready::<i32>(DataRegion::Loading).is_err());
        assert!(ready::<i32>(DataRegion::Idle).is_err());
    }

    fn demo() -> Headless<ScriptedBackend> {
        Headless {
            session: Session::with_pool(ScriptedBackend::demo(), &Settings::default()),
            wait: Duration::from_secs(5),
        }
    }

    #[test]
    fn select_loads_tickers_before_committing() {
        let mut cli = demo();
        cli.select(Some("HNX"), "PVS").unwrap();
        assert_eq!(cli.session.selection().market_code, "HNX");
        assert_eq!(cli.session.selection().ticker, "PVS");
        assert!(cli.select(Some("HNX"), "FPT").is_err());
    }

    #[test]
    fn analyze_settles_into_cache() {
        let mut cli = demo();
        cli.select(Some("HOSE"), "FPT").unwrap();
        cli.session.analyze().unwrap();
        cli.settle().unwrap();
        assert_eq!(cli.session.cache().len(), 1);
        assert!(ready(cli.session.analysis_view()).is_ok());
    }

    #[test]
    fn research_flag_routes_analysis_to_research_server() {
        let mut cli = demo();
        cli.session.use_department(Department::Research);
        cli.select(Some("HOSE"), "FPT").unwrap();
        cli.session.analyze().unwrap();
        cli.settle().unwrap();
        let paths: Vec<String> = cli.session.backend().calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["/data-analysis/ticker", "/data-analysis/svm-analysis"]);
    }

    #[test]
    fn research_job_has_its_own_receipt() {
        let mut cli = demo();
        cli.session.recalculate();
        cli.session.research_analyze();
        cli.settle().unwrap();
        let research = ready(cli.session.receipt_view(Slot::ResearchAnalysis)).unwrap();
        assert_eq!(research.message.as_deref(), Some("Research analysis complete"));
        let fund = ready(cli.session.receipt_view(Slot::Recalculate)).unwrap();
        assert_eq!(fund.message.as_deref(), Some("Recalculated betas and retrained model"));
    }

    #[test]
    fn failed_request_becomes_error() {
        let mut cli = demo();
        cli.session.backend().respond("/market-index-data", 500, r#"{"error": "index offline"}"#);
        cli.session.load_market_index();
        let err = cli.settle().unwrap_err().to_string();
        assert!(err.contains("index offline"), "{err}");
    }
}
