//! Subcommand implementations behind the CLI

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{WrapErr, bail, eyre};
use flowplan_core::optimization::OptimizerMessage;
use flowplan_core::{Portfolio, run_chronometer};

use crate::example::example_portfolio;
use crate::report::{OutputFormat, RunReport, render_optimization};
use crate::storage::{DataDirectory, PortfolioFile, load_portfolio, save_portfolio};
use crate::worker::{OptimizerWorker, WorkerResponse};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub format: OutputFormat,
    pub backtest_from: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    pub format: OutputFormat,
    pub generations: Option<usize>,
    pub population: Option<usize>,
    pub seed: Option<u64>,
    /// Where to write the tuned portfolio; next to the input by default
    pub save: Option<PathBuf>,
}

fn load(data_dir: &DataDirectory, name_or_path: &str) -> color_eyre::Result<(PathBuf, PortfolioFile)> {
    let path = data_dir.resolve(name_or_path);
    let file = load_portfolio(&path).wrap_err_with(|| format!("could not load portfolio {name_or_path:?}"))?;
    if file.accounts.is_empty() {
        bail!("portfolio {} has no accounts", path.display());
    }
    Ok((path, file))
}

/// Run one portfolio and render the result.
pub fn run(data_dir: &DataDirectory, name_or_path: &str, options: &RunOptions) -> color_eyre::Result<String> {
    let (path, mut file) = load(data_dir, name_or_path)?;
    if options.backtest_from.is_some() {
        file.settings.backtest_from = options.backtest_from;
    }
    file.settings.capture_reports = true;

    let mut portfolio = Portfolio::new(file.settings, &file.accounts)
        .wrap_err_with(|| format!("invalid accounts in {}", path.display()))?;
    let summary = run_chronometer(&mut portfolio)?;
    let report = RunReport::from_portfolio(&portfolio, summary);
    Ok(report.render(options.format)?)
}

fn optimized_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("portfolio");
    input.with_file_name(format!("{stem}.optimized.yaml"))
}

/// Tune the portfolio's recurring transfer rules on the worker thread,
/// printing progress to stderr, and save the best accounts found.
pub fn optimize(
    data_dir: &DataDirectory,
    name_or_path: &str,
    options: &OptimizeOptions,
) -> color_eyre::Result<String> {
    let (path, file) = load(data_dir, name_or_path)?;

    let mut config = file.optimizer.clone().unwrap_or_default();
    if let Some(generations) = options.generations {
        config.generations = generations;
    }
    if let Some(population) = options.population {
        config.population = population;
    }
    // always seeded so a run can be repeated from the log
    let seed = options.seed.or(config.seed).unwrap_or_else(rand::random::<u64>);
    config.seed = Some(seed);
    tracing::info!(seed, generations = config.generations, "optimizing {}", path.display());

    let worker = OptimizerWorker::new();
    worker
        .start(&file.accounts, file.settings.clone(), config.clone())
        .map_err(|e| eyre!(e))?;

    let result = loop {
        let Some(response) = worker.recv_timeout(POLL_INTERVAL).map_err(|e| eyre!(e))? else {
            continue;
        };
        match response {
            WorkerResponse::Progress(OptimizerMessage::Iteration { generation_label }) => {
                eprint!("\rgeneration {generation_label}");
            }
            WorkerResponse::Progress(OptimizerMessage::FoundBetter { .. }) => {
                tracing::debug!("optimizer found a better chromosome");
            }
            WorkerResponse::Progress(OptimizerMessage::Complete { .. }) => eprintln!(),
            WorkerResponse::Finished(result) => break *result,
            WorkerResponse::Cancelled => bail!("optimizer was cancelled"),
            WorkerResponse::Error(e) => bail!("optimizer failed: {e}"),
        }
    };

    let save = options.save.clone().unwrap_or_else(|| optimized_path(&path));
    let tuned = PortfolioFile {
        settings: file.settings,
        accounts: result.best.clone(),
        optimizer: Some(config),
    };
    save_portfolio(&save, &tuned).wrap_err("could not save the optimized portfolio")?;
    tracing::info!(path = %save.display(), fitness = result.fitness, "optimized portfolio saved");

    let mut out = render_optimization(&result, options.format)?;
    if options.format == OutputFormat::Text {
        out.push_str(&format!("\nSaved to {}\n", save.display()));
    }
    Ok(out)
}

/// Write the starter portfolio and return where it went.
pub fn example(data_dir: &DataDirectory, output: Option<PathBuf>, force: bool) -> color_eyre::Result<PathBuf> {
    let path = output.unwrap_or_else(|| data_dir.portfolio_path("example"));
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let year = jiff::Zoned::now().year();
    save_portfolio(&path, &example_portfolio(year))?;
    Ok(path)
}

pub fn list(data_dir: &DataDirectory) -> color_eyre::Result<String> {
    let names = data_dir.list()?;
    if names.is_empty() {
        return Ok(format!(
            "No portfolios in {}; create one with `flowplan example`\n",
            data_dir.root().display()
        ));
    }
    Ok(names.iter().map(|name| format!("{name}\n")).collect())
}
