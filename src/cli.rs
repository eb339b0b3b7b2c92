//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{load_backtest_config, validate_config};
use crate::domain::error::RegimeTraderError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "regimetrader", about = "Regime-gated leveraged backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar CSV, overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Report directory, overrides [report] output_dir
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the bar count and time range of a CSV file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output_dir,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, data.as_deref())
            } else {
                run_backtest_command(&config, data.as_deref(), output_dir.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

fn fail(err: RegimeTraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Command-line path first, then `[section] key` from the config.
pub fn resolve_path(
    cli_value: Option<&Path>,
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Option<PathBuf> {
    cli_value
        .map(Path::to_path_buf)
        .or_else(|| config.get_string(section, key).map(PathBuf::from))
}

/// Fetch, run and optionally report. Errors are returned, not printed.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    report: Option<(&dyn ReportPort, &Path)>,
) -> Result<BacktestResult, RegimeTraderError> {
    let bars = data_port.fetch_bars()?;
    eprintln!("Loaded {} bars", bars.len());

    let result = run_backtest(&bars, config)?;

    if let Some((port, dir)) = report {
        port.write(&result, dir)?;
    }
    Ok(result)
}

fn run_backtest_command(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let Some(data_path) = resolve_path(data_override, &adapter, "data", "path") else {
        return fail(RegimeTraderError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        });
    };
    let output_dir = resolve_path(output_override, &adapter, "report", "output_dir");

    eprintln!("Reading bars from {}", data_path.display());
    let data_port = CsvAdapter::new(data_path);
    let report_port = CsvReportAdapter::new();
    let report = output_dir
        .as_deref()
        .map(|dir| (&report_port as &dyn ReportPort, dir));

    match run_backtest_pipeline(&data_port, &bt_config, report) {
        Ok(result) => {
            print_summary(&result);
            if let Some(dir) = &output_dir {
                eprintln!("\nReports written to: {}", dir.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    let model = &result.model;

    eprintln!("\n=== Regime Model ===");
    eprintln!(
        "States:           {} (fitted on {} rows)",
        model.n_states, model.feature_rows
    );
    eprintln!(
        "Converged:        {} after {} iterations",
        if model.report.converged { "yes" } else { "no" },
        model.report.iterations
    );
    eprintln!("Bull state:       {}", result.bull_state);
    eprintln!("Bear state:       {}", result.bear_state);

    eprintln!("\n=== Results ===");
    eprintln!("Bars simulated:   {}", result.bars.len());
    eprintln!("Initial Capital:  {:.2}", m.initial_capital);
    eprintln!("Ending Capital:   {:.2}", m.ending_capital);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Buy & Hold:       {:.2}%", m.buy_hold_return * 100.0);
    eprintln!("Alpha:            {:.2}%", m.alpha * 100.0);
    eprintln!("Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);

    if !result.trades.is_empty() {
        eprintln!("\n=== Trades ===");
        for t in &result.trades {
            let sign = if t.pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {} -> {}  {:.2} -> {:.2}  {}{:.2} ({}{:.1}%)  {}",
                t.entry_time,
                t.exit_time,
                t.entry_price,
                t.exit_price,
                sign,
                t.pnl,
                sign,
                t.return_pct,
                t.exit_reason
            );
        }
    }
}

pub fn run_dry_run(config_path: &Path, data_override: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let c = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    eprintln!("\nBacktest:");
    eprintln!("  initial_capital: {}", c.simulation.initial_capital);
    eprintln!("  leverage:        {}", c.simulation.leverage);
    eprintln!("\nRegime model:");
    eprintln!("  n_components:    {}", c.regime.n_components);
    eprintln!("  random_state:    {}", c.regime.random_state);
    eprintln!("  n_iter:          {}", c.regime.n_iter);
    eprintln!("  tol:             {}", c.regime.tol);
    eprintln!("  min_covar:       {}", c.regime.min_covar);
    eprintln!("\nStrategy:");
    eprintln!("  min_entry_votes: {}", c.simulation.min_entry_votes);
    eprintln!("  cooldown_hours:  {}", c.simulation.cooldown_hours);

    match resolve_path(data_override, &adapter, "data", "path") {
        Some(p) => eprintln!("\nData: {}", p.display()),
        None => {
            return fail(RegimeTraderError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            });
        }
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match validate_config(&adapter) {
        Ok(()) => {
            eprintln!("Configuration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_info(data_path: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_path.to_path_buf());
    match adapter.data_range() {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", data_path.display(), count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("No bars found in {}", data_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
