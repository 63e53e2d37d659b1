//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::{read_return_matrix, write_return_matrix, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::RebalancerError;
use crate::domain::metrics::{PerformanceSummary, MONTHS_PER_YEAR};
use crate::domain::rebalance::{simulate, MissingReturnPolicy, RebalanceParams, SimulationResult};
use crate::domain::returns::ReturnMatrix;
use crate::domain::universe::{load_universe, parse_codes};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PriceSource;
use crate::ports::report_port::ResultSink;

const DEFAULT_OUTPUT: &str = "portfolio_rebalance.csv";

#[derive(Parser, Debug)]
#[command(name = "rebalancer", about = "Periodic portfolio rotation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the rebalance simulation
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pre-computed wide return matrix, overriding the config
        #[arg(long)]
        returns: Option<PathBuf>,
        #[arg(long)]
        portfolio_size: Option<usize>,
        #[arg(long)]
        churn_count: Option<usize>,
    },
    /// Build the return matrix from price files and write it as CSV
    Returns {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments with price files in the configured directory
    ListInstruments {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub price_dir: Option<PathBuf>,
    pub returns_file: Option<PathBuf>,
    pub codes: Vec<String>,
    pub benchmark: Option<String>,
    pub drop_last_period: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub periods_per_year: u32,
    pub risk_free_rate: f64,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Simulate {
            config,
            output,
            returns,
            portfolio_size,
            churn_count,
        } => run_simulate(
            &config,
            output.as_deref(),
            returns.as_deref(),
            portfolio_size,
            churn_count,
        ),
        Command::Returns { config, output } => run_returns(&config, &output),
        Command::Validate { config } => run_validate(&config),
        Command::ListInstruments { config } => run_list_instruments(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RebalancerError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, RebalancerError> {
    let codes = match config.get_non_empty("data", "codes") {
        Some(list) => parse_codes(&list).map_err(|e| RebalancerError::ConfigInvalid {
            section: "data".into(),
            key: "codes".into(),
            reason: e.to_string(),
        })?,
        None => Vec::new(),
    };

    Ok(DataConfig {
        price_dir: config.get_non_empty("data", "price_dir").map(PathBuf::from),
        returns_file: config.get_non_empty("data", "returns_file").map(PathBuf::from),
        codes,
        benchmark: config
            .get_non_empty("data", "benchmark")
            .map(|b| b.to_uppercase()),
        drop_last_period: config.get_bool("data", "drop_last_period", false),
    })
}

pub fn build_rebalance_params(config: &dyn ConfigPort) -> Result<RebalanceParams, RebalancerError> {
    let read_count = |key: &str| -> Result<usize, RebalancerError> {
        let value = config.get_int("rebalance", key, -1);
        usize::try_from(value).map_err(|_| RebalancerError::ConfigInvalid {
            section: "rebalance".into(),
            key: key.into(),
            reason: format!("{key} must be a non-negative integer"),
        })
    };

    let missing_returns = match config.get_non_empty("rebalance", "missing_returns") {
        Some(s) => s
            .parse::<MissingReturnPolicy>()
            .map_err(|reason| RebalancerError::ConfigInvalid {
                section: "rebalance".into(),
                key: "missing_returns".into(),
                reason,
            })?,
        None => MissingReturnPolicy::default(),
    };

    Ok(RebalanceParams::new(read_count("portfolio_size")?, read_count("churn_count")?)
        .with_missing_returns(missing_returns))
}

pub fn build_metrics_config(config: &dyn ConfigPort) -> MetricsConfig {
    let periods = config.get_int("metrics", "periods_per_year", MONTHS_PER_YEAR as i64);
    MetricsConfig {
        periods_per_year: u32::try_from(periods).unwrap_or(MONTHS_PER_YEAR),
        risk_free_rate: config.get_double("metrics", "risk_free_rate", 0.0),
    }
}

pub fn output_path(config: &dyn ConfigPort, override_path: Option<&Path>) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_non_empty("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Builds the return matrix from a returns file when one is given, else from
/// the universe's price histories.
pub fn load_return_matrix(
    data: &DataConfig,
    source: Option<&dyn PriceSource>,
) -> Result<ReturnMatrix, RebalancerError> {
    let matrix = match (&data.returns_file, source) {
        (Some(path), _) => {
            info!(path = %path.display(), "reading return matrix");
            read_return_matrix(path)?
        }
        (None, Some(source)) => {
            info!(codes = data.codes.len(), "loading price histories");
            let universe = load_universe(source, &data.codes)?;
            info!(
                loaded = ?universe.codes(),
                skipped = universe.skipped.len(),
                "universe ready"
            );
            ReturnMatrix::from_price_series(&universe.series)?
        }
        (None, None) => {
            return Err(RebalancerError::ConfigMissing {
                section: "data".into(),
                key: "price_dir".into(),
            });
        }
    };

    let matrix = if data.drop_last_period {
        matrix.without_last_period()
    } else {
        matrix
    };

    info!(
        periods = matrix.period_count(),
        instruments = matrix.instrument_count(),
        "return matrix ready"
    );
    Ok(matrix)
}

/// Buy-and-hold returns of `code` over the periods where the strategy
/// realized a return.
pub fn benchmark_returns(
    source: &dyn PriceSource,
    code: &str,
    result: &SimulationResult,
) -> Result<Vec<f64>, RebalancerError> {
    let active: HashSet<_> = result
        .events
        .iter()
        .filter(|e| e.portfolio_return.is_some())
        .map(|e| e.period)
        .collect();

    let series = source.fetch_prices(code)?;
    Ok(series
        .returns()
        .into_iter()
        .filter(|(date, _)| active.contains(date))
        .filter_map(|(_, r)| r)
        .collect())
}

fn price_source(data: &DataConfig) -> Option<CsvAdapter> {
    data.price_dir.clone().map(CsvAdapter::new)
}

pub fn run_simulate(
    config_path: &Path,
    output_override: Option<&Path>,
    returns_override: Option<&Path>,
    portfolio_size: Option<usize>,
    churn_count: Option<usize>,
) -> Result<(), RebalancerError> {
    // Stage 1: load and validate config
    let adapter = load_config(config_path)?;

    // Stage 2: resolve parameters, CLI flags win over the file
    let mut data = build_data_config(&adapter)?;
    if let Some(path) = returns_override {
        data.returns_file = Some(path.to_path_buf());
    }
    let mut params = build_rebalance_params(&adapter)?;
    if let Some(m) = portfolio_size {
        params.portfolio_size = m;
    }
    if let Some(n) = churn_count {
        params.churn_count = n;
    }
    params.validate()?;
    let metrics = build_metrics_config(&adapter);
    let output = output_path(&adapter, output_override);

    // Stage 3: return matrix
    let source = price_source(&data);
    let matrix = load_return_matrix(&data, source.as_ref().map(|s| s as &dyn PriceSource))?;

    // Stage 4: simulate
    info!(
        portfolio_size = params.portfolio_size,
        churn_count = params.churn_count,
        missing_returns = %params.missing_returns,
        "running rebalance simulation"
    );
    let result = simulate(&matrix, &params)?;

    // Stage 5: metrics
    let strategy = PerformanceSummary::compute(
        &result.realized_returns(),
        metrics.periods_per_year,
        metrics.risk_free_rate,
    );
    print_summary("Strategy", &strategy);
    eprintln!("Final Portfolio:  {}", result.final_portfolio().join(", "));

    if let (Some(code), Some(source)) = (&data.benchmark, &source) {
        match benchmark_returns(source, code, &result) {
            Ok(returns) if !returns.is_empty() => {
                let summary = PerformanceSummary::compute(
                    &returns,
                    metrics.periods_per_year,
                    metrics.risk_free_rate,
                );
                print_summary(&format!("Benchmark ({code})"), &summary);
            }
            Ok(_) => warn!(benchmark = %code, "benchmark has no returns in the simulated periods"),
            Err(e) => warn!(benchmark = %code, error = %e, "skipping benchmark"),
        }
    }

    // Stage 6: export
    CsvReportAdapter::new().write(&result, &output)?;
    eprintln!("\nResults written to: {}", output.display());
    Ok(())
}

fn print_summary(title: &str, summary: &PerformanceSummary) {
    eprintln!("\n=== {} ===", title);
    eprintln!("Periods:          {}", summary.periods);
    eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
    eprintln!("CAGR:             {:.2}%", summary.cagr * 100.0);
    eprintln!("Volatility:       {:.2}%", summary.volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", summary.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
}

pub fn run_returns(config_path: &Path, output: &Path) -> Result<(), RebalancerError> {
    let adapter = load_config(config_path)?;
    let mut data = build_data_config(&adapter)?;
    // Always rebuild from prices; the returns file is what we are producing.
    data.returns_file = None;

    let source = price_source(&data);
    let matrix = load_return_matrix(&data, source.as_ref().map(|s| s as &dyn PriceSource))?;
    write_return_matrix(&matrix, output)?;
    eprintln!(
        "Return matrix ({} periods x {} instruments) written to: {}",
        matrix.period_count(),
        matrix.instrument_count(),
        output.display()
    );
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), RebalancerError> {
    let adapter = load_config(config_path)?;
    let data = build_data_config(&adapter)?;
    let params = build_rebalance_params(&adapter)?;
    let metrics = build_metrics_config(&adapter);

    eprintln!("Data:");
    match &data.returns_file {
        Some(path) => eprintln!("  returns_file: {}", path.display()),
        None => {
            if let Some(dir) = &data.price_dir {
                eprintln!("  price_dir:    {}", dir.display());
            }
            eprintln!("  codes:        {}", data.codes.join(", "));
        }
    }
    if let Some(b) = &data.benchmark {
        eprintln!("  benchmark:    {}", b);
    }
    eprintln!("  drop_last:    {}", data.drop_last_period);

    eprintln!("\nRebalance:");
    eprintln!("  portfolio_size:  {}", params.portfolio_size);
    eprintln!("  churn_count:     {}", params.churn_count);
    eprintln!("  missing_returns: {}", params.missing_returns);

    eprintln!("\nMetrics:");
    eprintln!("  periods_per_year: {}", metrics.periods_per_year);
    eprintln!("  risk_free_rate:   {}", metrics.risk_free_rate);

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

pub fn run_list_instruments(config_path: &Path) -> Result<(), RebalancerError> {
    let adapter = load_config(config_path)?;
    let data = build_data_config(&adapter)?;
    let source = price_source(&data).ok_or_else(|| RebalancerError::ConfigMissing {
        section: "data".into(),
        key: "price_dir".into(),
    })?;

    let instruments = source.list_instruments()?;
    if instruments.is_empty() {
        eprintln!("No instruments found");
    } else {
        for code in &instruments {
            println!("{}", code);
        }
        eprintln!("{} instruments found", instruments.len());
    }
    Ok(())
}
