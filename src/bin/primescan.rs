use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use primescan::{
    run_parallel, run_serial, BlockPlan, ClaimStrategy, CsvReport, Matrix, ReportSink,
    SearchParams, Sweep, SweepConfig, TerminalReport,
};
use std::path::PathBuf;

/// Count primes in random matrices, serially and with a block work queue.
#[derive(Parser)]
#[command(name = "primescan", version, about)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full benchmark sweep and write a CSV report
    Sweep(SweepArgs),
    /// Compare one parallel configuration against the serial scan
    Run(RunArgs),
}

#[derive(Args)]
struct SweepArgs {
    /// TOML sweep configuration (defaults apply for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report path, overrides `output` from the config
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also print every record to stdout
    #[arg(long)]
    print: bool,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, default_value_t = 10_000)]
    rows: usize,

    #[arg(long, default_value_t = 10_000)]
    cols: usize,

    #[arg(long, default_value_t = 1000)]
    block_rows: usize,

    #[arg(long, default_value_t = 1000)]
    block_cols: usize,

    /// Worker threads [default: number of CPUs]
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = primescan::matrix::DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = primescan::matrix::DEFAULT_MAX_VALUE)]
    max_value: i32,

    #[arg(long, value_enum, default_value_t = ClaimArg::Locked)]
    claim: ClaimArg,

    #[arg(long, value_enum, default_value_t = PlanArg::Lazy)]
    plan: PlanArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClaimArg {
    Locked,
    Atomic,
}

impl From<ClaimArg> for ClaimStrategy {
    fn from(arg: ClaimArg) -> Self {
        match arg {
            ClaimArg::Locked => ClaimStrategy::Locked,
            ClaimArg::Atomic => ClaimStrategy::Atomic,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanArg {
    Lazy,
    Precomputed,
}

impl From<PlanArg> for BlockPlan {
    fn from(arg: PlanArg) -> Self {
        match arg {
            PlanArg::Lazy => BlockPlan::Lazy,
            PlanArg::Precomputed => BlockPlan::Precomputed,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

/// Config file (or defaults) with the `--output` override applied.
fn sweep_config(args: &SweepArgs) -> Result<SweepConfig> {
    let mut config = match &args.config {
        Some(path) => SweepConfig::load(path)
            .with_context(|| format!("loading sweep config {}", path.display()))?,
        None => SweepConfig::default(),
    };
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    Ok(config)
}

fn sweep(args: SweepArgs) -> Result<()> {
    let config = sweep_config(&args)?;

    // Open the report before any work so an unwritable path fails fast.
    let mut csv = CsvReport::create(&config.output)?;
    let sweep = Sweep::new(config)?;
    let output = sweep.config().output.clone();
    log::info!(
        "sweeping {} configurations into {}",
        sweep.config().record_count(),
        output.display()
    );

    let summary = if args.print {
        let mut sinks = Tee(csv, TerminalReport::stdout());
        sweep.run(&mut sinks)?
    } else {
        sweep.run(&mut csv)?
    };

    if summary.mismatches > 0 {
        anyhow::bail!(
            "{} configurations disagreed with the serial count, see {}",
            summary.mismatches,
            output.display()
        );
    }
    Ok(())
}

/// Writes every record to two sinks.
struct Tee<A, B>(A, B);

impl<A: ReportSink, B: ReportSink> ReportSink for Tee<A, B> {
    fn write_record(&mut self, record: &primescan::BenchRecord) -> primescan::Result<()> {
        self.0.write_record(record)?;
        self.1.write_record(record)
    }

    fn finish(&mut self) -> primescan::Result<()> {
        self.0.finish()?;
        self.1.finish()
    }
}

fn run(args: RunArgs) -> Result<()> {
    let threads = args.threads.unwrap_or_else(num_cpus::get);
    let params = SearchParams::new(args.block_rows, args.block_cols, threads)?
        .with_claim(args.claim.into())
        .with_plan(args.plan.into());

    log::info!("generating {}x{} matrix (seed {})", args.rows, args.cols, args.seed);
    let matrix = Matrix::random(args.rows, args.cols, args.seed, args.max_value)
        .context("building matrix")?;

    let serial = run_serial(&matrix);
    let parallel = run_parallel(&matrix, &params).context("parallel search")?;

    let serial_secs = serial.elapsed.as_secs_f64();
    let parallel_secs = parallel.elapsed.as_secs_f64();
    let speedup = serial_secs / parallel_secs;

    println!("{} {}", "Serial search:  ".bold(), serial.value);
    println!("{} {}", "Parallel search:".bold(), parallel.value.prime_count);
    println!();
    println!("Serial time:   {:.6}s", serial_secs);
    println!("Parallel time: {:.6}s", parallel_secs);
    println!();
    println!(
        "Speedup: {:.6} - Efficiency: {:.6}",
        speedup,
        speedup / threads as f64
    );
    println!(
        "Blocks: {} over {} threads ({} idle)",
        parallel.value.total_blocks,
        threads,
        parallel.value.idle_workers()
    );

    if serial.value != parallel.value.prime_count {
        anyhow::bail!(
            "serial and parallel counts differ ({} vs {})",
            serial.value,
            parallel.value.prime_count
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Sweep(args) => sweep(args),
        Command::Run(args) => run(args),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
