use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flowplan::commands::{self, OptimizeOptions, RunOptions};
use flowplan::{DataDirectory, LogTarget, OutputFormat, init_logging};

#[derive(Parser, Debug)]
#[command(name = "flowplan")]
#[command(about = "A month-by-month personal finance portfolio simulator")]
struct Args {
    /// Path to the data directory (default: ~/.flowplan/)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Log to stderr instead of the data directory's log file
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a portfolio and print the results
    Run {
        /// Portfolio file path, or the name of a portfolio in the data directory
        portfolio: String,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,

        /// Replay historical returns starting from this year
        #[arg(long)]
        backtest_from: Option<u16>,
    },
    /// Tune recurring transfer percentages to maximize terminal net worth
    Optimize {
        /// Portfolio file path, or the name of a portfolio in the data directory
        portfolio: String,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,

        #[arg(long)]
        generations: Option<usize>,

        #[arg(long)]
        population: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Output path for the tuned portfolio (default: <input>.optimized.yaml)
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Write a starter portfolio
    Example {
        /// Output path (default: <data-dir>/portfolios/example.yaml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List portfolios in the data directory
    List,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let data_dir = DataDirectory::new(args.data_dir.unwrap_or_else(DataDirectory::default_path));

    let target = if args.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::in_data_dir(data_dir.root())
    };
    init_logging(&target, &args.log_level)?;
    data_dir.init()?;

    match args.command {
        Command::Run {
            portfolio,
            format,
            backtest_from,
        } => {
            let options = RunOptions {
                format,
                backtest_from,
            };
            print!("{}", commands::run(&data_dir, &portfolio, &options)?);
        }
        Command::Optimize {
            portfolio,
            format,
            generations,
            population,
            seed,
            save,
        } => {
            let options = OptimizeOptions {
                format,
                generations,
                population,
                seed,
                save,
            };
            print!("{}", commands::optimize(&data_dir, &portfolio, &options)?);
        }
        Command::Example { output, force } => {
            let path = commands::example(&data_dir, output, force)?;
            println!("Wrote {}", path.display());
        }
        Command::List => print!("{}", commands::list(&data_dir)?),
    }

    tracing::debug!("flowplan exiting");
    Ok(())
}
