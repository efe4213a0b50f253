use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

use kernsim::{
    Sim, SimConfig,
    sim::{CommandReader, TextReport, Workload, workload::write_commands},
};

#[derive(Parser)]
#[command(name = "kernsim", version, about = "Process scheduler simulation")]
struct Cli {
    /// Log scheduling decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a command file through the simulator
    Run {
        input: PathBuf,
        /// Report destination (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the static round robin quantum
        #[arg(long)]
        quantum: Option<u64>,
    },
    /// Write a random command stream
    Generate {
        #[arg(long, default_value_t = 100)]
        ticks: u64,
        #[arg(long, default_value_t = 0.3)]
        p_arrival: f64,
        #[arg(long, default_value_t = 0.3)]
        p_short: f64,
        #[arg(long, default_value_t = 2)]
        short: u64,
        #[arg(long, default_value_t = 12)]
        long: u64,
        #[arg(long, default_value_t = 100)]
        memory: u64,
        #[arg(long, default_value_t = 4)]
        devices: u64,
        /// Select dynamic round robin in the configure command
        #[arg(long)]
        dynamic: bool,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Cmd::Run {
            input,
            output,
            config,
            quantum,
        } => {
            let mut config = match config {
                Some(path) => SimConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => SimConfig::default(),
            };
            if let Some(quantum) = quantum {
                config = config.with_static_quantum(quantum)?;
            }

            let file = File::open(&input)
                .with_context(|| format!("opening input {}", input.display()))?;
            let commands = CommandReader::new(BufReader::new(file));
            let report = TextReport::new(open_output(output.as_ref())?);
            Sim::new(commands, report, config).run()?;
        }
        Cmd::Generate {
            ticks,
            p_arrival,
            p_short,
            short,
            long,
            memory,
            devices,
            dynamic,
            seed,
            output,
        } => {
            let workload = Workload {
                ticks,
                p_arrival,
                p_short,
                short_ticks: short,
                long_ticks: long,
                memory,
                devices,
                dynamic,
                seed,
            };
            write_commands(open_output(output.as_ref())?, &workload.commands())?;
        }
    }

    Ok(())
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "kernsim=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
