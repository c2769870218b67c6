use clap::{Parser, ValueEnum};
use intersection_sim::{export, Config, Policy, Simulation};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Simulates traffic through signal-controlled intersections.
#[derive(Parser, Debug)]
#[command(name = "intersection-sim", version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in network to simulate
    #[arg(short, long, value_enum, default_value = "three-tee")]
    preset: Preset,

    /// Number of ticks to simulate
    #[arg(short, long)]
    steps: Option<usize>,

    /// Seed of the random source
    #[arg(long)]
    seed: Option<u64>,

    /// Signal timing policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Where to write the snapshot sequence
    #[arg(short, long, default_value = "three_t_intersection_data.json")]
    data: PathBuf,

    /// Where to write the run summary
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Stream the snapshots to a rendering host at this address instead of only
    /// writing them to a file
    #[arg(long)]
    host: Option<String>,

    /// Write the effective configuration to this path
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    ThreeTee,
    Crossroads,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Fixed,
    Adaptive,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Fixed => Policy::Fixed,
            PolicyArg::Adaptive => Policy::Adaptive,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => match args.preset {
            Preset::ThreeTee => Config::three_tee(),
            Preset::Crossroads => Config::crossroads(),
        },
    };
    if let Some(steps) = args.steps {
        config.params.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.params.seed = seed;
    }
    if let Some(policy) = args.policy {
        config.params.timing.policy = policy.into();
    }
    if let Some(path) = &args.dump_config {
        std::fs::write(path, config.to_json()?)?;
        info!("configuration written to {}", path.display());
    }

    let mut sim = Simulation::new(&config)?;
    sim.run()?;

    let summary = sim.summary();
    info!(
        "{} vehicles completed, mean wait {:.2} ticks",
        summary.completed, summary.mean_wait
    );
    for (origin, queue) in &summary.max_queues {
        info!("max queue on {}: {}", origin, queue);
    }

    let snapshots = sim.take_snapshots();
    match &args.host {
        Some(host) => export::deliver_or_save(
            host.as_str(),
            "Intersection simulation data ready",
            &snapshots,
            &args.data,
        )?,
        None => {
            export::write_snapshots(&args.data, &snapshots)?;
            info!("{} snapshots written to {}", snapshots.len(), args.data.display());
        }
    }
    if let Some(path) = &args.stats {
        export::write_summary(path, &summary)?;
    }
    Ok(())
}
